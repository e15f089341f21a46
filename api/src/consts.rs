/// Amount a single node earns over one full day of activity.
pub const DEFAULT_RATE_PER_DAY_PER_NODE: f64 = 119.72;

/// Hours between a deployment's start and the moment it begins earning.
pub const DEFAULT_ACTIVATION_DELAY_HOURS: i64 = 24;

/// Days a deployment keeps earning once it is active.
pub const DEFAULT_LIFECYCLE_DAYS: i64 = 30;

/// Milliseconds in one day. Elapsed time is converted to fractional days with this.
pub const MS_PER_DAY: i64 = 86_400_000;
