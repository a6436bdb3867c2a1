pub use crate::barrier::{parallel_map, parallel_map_with, wait_all, Barrier, Waitable};
pub use crate::cancel::{sleep, CancelReason, CancelToken, DropGuard};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
