//! waitall - run independent computations in parallel behind one barrier
//!
//! A wait-all barrier runs a set of deferred computations ("waitables") on
//! one thread each, waits for every one of them, and returns their results
//! and failures in call order. A shared [`CancelToken`] carries the deadline;
//! cancellation is cooperative, so tasks notice it at their own suspension
//! points, typically through [`cancel::sleep`].
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use waitall::prelude::*;
//!
//! let (results, errors) = parallel_map(vec![1, 2, 3], Duration::from_millis(50), |token, v| {
//!     if v == 3 && sleep(token, Duration::from_secs(5)) {
//!         return Err(token.error().unwrap_or(Error::Cancelled));
//!     }
//!     Ok(v * 10)
//! });
//!
//! assert_eq!(results, vec![10, 20, 0]);
//! assert_eq!(errors, vec![None, None, Some(Error::DeadlineExceeded)]);
//! ```
//!
//! # Features
//!
//! - **Index-aligned output**: slot `i` always reports `waitables[i]`
//! - **No short-circuiting**: a failed task never stops its siblings
//! - **Full join**: no spawned thread outlives the call, panics included
//! - **Child tokens**: derive deadlines from a caller's own token

#![warn(missing_debug_implementations)]

pub mod barrier;
pub mod cancel;
pub mod config;
pub mod error;
pub mod prelude;

pub use barrier::{parallel_map, parallel_map_with, wait_all, Barrier, Waitable};
pub use cancel::{CancelReason, CancelToken};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
