use std::any::Any;
use std::panic;
use std::thread;

/// Remembers the first panic raised by any task so it can be resumed on
/// the caller thread once every sibling has been joined.
#[derive(Default)]
pub(crate) struct PanicSlot {
    first: Option<(usize, Box<dyn Any + Send + 'static>)>,
    count: usize,
}

impl PanicSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Unwraps a task outcome, recording the panic if there was one.
    pub(crate) fn absorb<R>(&mut self, index: usize, outcome: thread::Result<R>) -> Option<R> {
        match outcome {
            Ok(value) => Some(value),
            Err(payload) => {
                self.count += 1;
                tracing::error!(index, message = %panic_message(&*payload), "task panicked");
                if self.first.is_none() {
                    self.first = Some((index, payload));
                }
                None
            }
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Re-raises the first recorded panic, if any.
    pub(crate) fn resume(self) {
        if let Some((index, payload)) = self.first {
            tracing::debug!(index, panicked = self.count, "resuming task panic");
            panic::resume_unwind(payload);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
