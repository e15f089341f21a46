mod deployment;
mod overrides;

pub use deployment::*;
pub use overrides::*;
