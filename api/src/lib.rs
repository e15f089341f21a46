pub mod clock;
pub mod consts;
pub mod error;
pub mod lifecycle;
pub mod settings;
pub mod state;

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::consts::*;
    pub use crate::error::*;
    pub use crate::lifecycle::*;
    pub use crate::settings::*;
    pub use crate::state::*;
}
