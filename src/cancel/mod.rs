//! Cooperative cancellation.
//!
//! A [`CancelToken`] is shared by reference across every task of one barrier
//! invocation. Tasks observe it at their own suspension points, typically
//! through [`sleep`].

pub mod sleep;
pub mod token;

pub use sleep::sleep;
pub use token::{CancelReason, CancelToken, DropGuard};
