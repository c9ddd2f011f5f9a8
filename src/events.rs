//! Event system for payload lifecycle hooks.
//!
//! Payloads emit events when they start, when they produce text, and when
//! they finish. The console output of the story writer is an
//! [`EventHandler`] ([`ConsoleReporter`](crate::report::ConsoleReporter));
//! tests can attach their own to observe the pipeline.

use crate::backend::Provider;
use std::sync::Arc;

/// Events emitted during payload execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A payload has started executing.
    PayloadStart {
        /// Instance name of the payload.
        name: String,
        /// Stable type identifier (e.g. `"llm-call"`, `"chain"`).
        kind: &'static str,
    },
    /// A stage produced its final text.
    Output {
        /// Instance name of the payload.
        name: String,
        /// Provider that generated the text.
        provider: Provider,
        /// Cleaned response text.
        text: String,
    },
    /// A payload has finished executing.
    PayloadEnd {
        /// Instance name of the payload.
        name: String,
        /// Whether execution succeeded.
        ok: bool,
    },
    /// A transport-level retry due to HTTP error.
    TransportRetry {
        /// Instance name of the payload.
        name: String,
        /// The retry attempt number (1-indexed).
        attempt: u32,
        /// Delay before this retry attempt in milliseconds.
        delay_ms: u64,
        /// Reason for the retry (error description).
        reason: String,
    },
}

/// Handler for payload lifecycle events.
///
/// # Example
///
/// ```
/// use story_pipeline::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::Output { name, text, .. } = event {
///             println!("[{}] {}", name, text);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when a payload emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_without_handler_is_noop() {
        emit(
            &None,
            Event::PayloadEnd {
                name: "x".into(),
                ok: true,
            },
        );
    }

    #[test]
    fn test_fn_handler_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Arc<dyn EventHandler> = Arc::new(FnEventHandler(move |e: Event| {
            if let Event::PayloadStart { name, .. } = e {
                sink.lock().unwrap().push(name);
            }
        }));

        emit(
            &Some(handler),
            Event::PayloadStart {
                name: "outline".into(),
                kind: "llm-call",
            },
        );
        assert_eq!(*seen.lock().unwrap(), vec!["outline".to_string()]);
    }
}
