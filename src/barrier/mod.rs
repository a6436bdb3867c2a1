//! The wait-all barrier and the parallel-map built on it.
//!
//! Every invocation fans out one scoped thread per waitable and fans back in
//! by joining all of them. Output slot `i` is owned by task `i` alone, so
//! results are placed by index without locking.

mod panic;
pub mod parallel_map;
pub mod wait_all;

pub use wait_all::{Barrier, Waitable};

use crate::cancel::CancelToken;
use std::time::Duration;

/// [`Barrier::wait_all`] with the default [`Config`](crate::Config).
pub fn wait_all<T, E, W, I>(
    signal: Option<&CancelToken>,
    waitables: I,
) -> (Vec<T>, Vec<Option<E>>)
where
    I: IntoIterator<Item = W>,
    W: FnOnce(&CancelToken) -> Result<T, E> + Send,
    T: Default + Send,
    E: Send,
{
    Barrier::default().wait_all(signal, waitables)
}

/// [`Barrier::parallel_map`] with the default [`Config`](crate::Config).
pub fn parallel_map<V, T, E, F, I>(
    values: I,
    max_wait: Duration,
    mapper: F,
) -> (Vec<T>, Vec<Option<E>>)
where
    I: IntoIterator<Item = V>,
    V: Send,
    T: Default + Send,
    E: Send,
    F: Fn(&CancelToken, V) -> Result<T, E> + Sync,
{
    Barrier::default().parallel_map(values, max_wait, mapper)
}

/// [`Barrier::parallel_map_with`] with the default [`Config`](crate::Config).
pub fn parallel_map_with<V, T, E, F, I>(
    parent: &CancelToken,
    values: I,
    max_wait: Duration,
    mapper: F,
) -> (Vec<T>, Vec<Option<E>>)
where
    I: IntoIterator<Item = V>,
    V: Send,
    T: Default + Send,
    E: Send,
    F: Fn(&CancelToken, V) -> Result<T, E> + Sync,
{
    Barrier::default().parallel_map_with(parent, values, max_wait, mapper)
}
