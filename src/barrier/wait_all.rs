use super::panic::PanicSlot;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::Result;
use crossbeam_channel::{bounded, SendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, Scope, ScopedJoinHandle};

/// A boxed waitable, for collections mixing different closures.
pub type Waitable<'a, T, E> =
    Box<dyn FnOnce(&CancelToken) -> std::result::Result<T, E> + Send + 'a>;

/// Runs independent waitables on one thread each and joins all of them.
///
/// The barrier holds no state besides its [`Config`]; one value can serve
/// any number of concurrent invocations.
#[derive(Debug, Clone, Default)]
pub struct Barrier {
    config: Config,
}

enum Running<'scope, T, E> {
    Spawned(ScopedJoinHandle<'scope, Option<std::result::Result<T, E>>>),
    Inline(thread::Result<std::result::Result<T, E>>),
}

impl<'scope, T, E> Running<'scope, T, E> {
    fn join(self) -> thread::Result<std::result::Result<T, E>> {
        match self {
            Running::Spawned(handle) => handle.join().map(|outcome| match outcome {
                Some(outcome) => outcome,
                None => unreachable!("task thread exited without receiving its waitable"),
            }),
            Running::Inline(outcome) => outcome,
        }
    }
}

impl Barrier {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every waitable concurrently and blocks until all have returned.
    ///
    /// Slot `i` of both returned vectors belongs to `waitables[i]`: an `Ok`
    /// value lands in `results[i]` with `errors[i] == None`, an `Err` lands in
    /// `errors[i]` with `results[i] == T::default()`. Failures never stop
    /// siblings.
    ///
    /// `signal` is shared by every task. When `None`, a token with
    /// [`Config::default_deadline`] is created and cancelled again before
    /// returning. Cancellation is cooperative: a task that ignores the token
    /// keeps the barrier waiting.
    ///
    /// If a task panics, the remaining tasks are still joined and the first
    /// panic is then resumed on the calling thread.
    pub fn wait_all<T, E, W, I>(
        &self,
        signal: Option<&CancelToken>,
        waitables: I,
    ) -> (Vec<T>, Vec<Option<E>>)
    where
        I: IntoIterator<Item = W>,
        W: FnOnce(&CancelToken) -> std::result::Result<T, E> + Send,
        T: Default + Send,
        E: Send,
    {
        let waitables: Vec<W> = waitables.into_iter().collect();
        if waitables.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let manufactured;
        let token = match signal {
            Some(token) => token,
            None => {
                tracing::debug!(
                    deadline_ms = self.config.default_deadline.as_millis() as u64,
                    "no token supplied, using default deadline"
                );
                manufactured =
                    CancelToken::with_timeout(self.config.default_deadline).drop_guard();
                manufactured.token()
            }
        };

        let tasks = waitables.len();
        let span = tracing::debug_span!(
            "wait_all",
            tasks,
            deadline_ms = token.remaining().map(|d| d.as_millis() as u64)
        );
        let _entered = span.enter();

        let outcomes = thread::scope(|scope| {
            let running: Vec<Running<'_, T, E>> = waitables
                .into_iter()
                .enumerate()
                .map(|(index, waitable)| self.spawn(scope, index, waitable, token, &span))
                .collect();

            running
                .into_iter()
                .map(Running::join)
                .collect::<Vec<_>>()
        });

        let mut panics = PanicSlot::new();
        let mut results = Vec::with_capacity(tasks);
        let mut errors = Vec::with_capacity(tasks);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match panics.absorb(index, outcome) {
                Some(Ok(value)) => {
                    results.push(value);
                    errors.push(None);
                }
                Some(Err(err)) => {
                    results.push(T::default());
                    errors.push(Some(err));
                }
                None => {
                    results.push(T::default());
                    errors.push(None);
                }
            }
        }
        panics.resume();

        tracing::debug!(
            tasks,
            failed = errors.iter().filter(|e| e.is_some()).count(),
            cancelled = token.is_cancelled(),
            "wait_all finished"
        );
        debug_assert_eq!(results.len(), tasks);
        debug_assert_eq!(errors.len(), tasks);

        (results, errors)
    }

    /// Starts one task. The waitable is handed over only once the thread
    /// exists, so a failed spawn still lets it run on the caller thread.
    fn spawn<'scope, 'env, T, E, W>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        index: usize,
        waitable: W,
        token: &'scope CancelToken,
        span: &'scope tracing::Span,
    ) -> Running<'scope, T, E>
    where
        W: FnOnce(&CancelToken) -> std::result::Result<T, E> + Send + 'scope,
        T: Send + 'scope,
        E: Send + 'scope,
    {
        let (tx, rx) = bounded::<W>(1);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.config.thread_name_prefix, index));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let spawned = builder.spawn_scoped(scope, move || {
            let _entered = span.enter();
            rx.recv().ok().map(|waitable| run_task(index, waitable, token))
        });

        let waitable = match spawned {
            Ok(handle) => match tx.send(waitable) {
                Ok(()) => return Running::Spawned(handle),
                Err(SendError(waitable)) => waitable,
            },
            Err(err) => {
                tracing::warn!(index, error = %err, "failed to spawn task thread, running inline");
                waitable
            }
        };

        Running::Inline(catch_unwind(AssertUnwindSafe(|| {
            run_task(index, waitable, token)
        })))
    }
}

fn run_task<T, E, W>(index: usize, waitable: W, token: &CancelToken) -> std::result::Result<T, E>
where
    W: FnOnce(&CancelToken) -> std::result::Result<T, E>,
{
    tracing::trace!(index, "task started");
    let outcome = waitable(token);
    tracing::trace!(index, ok = outcome.is_ok(), "task finished");
    outcome
}
