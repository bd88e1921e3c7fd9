//! The sink every runner level reports to.
//!
//! A bus accepts a message and answers whether the run should continue. Returning `false` is the only
//! way an external consumer can ask the engine to stop; the engine turns it into a tripped
//! [`CancellationSignal`](crate::CancellationSignal).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::message::Message;

/// Accept a lifecycle message; `false` requests cancellation.
///
/// Implementations are shared by the whole run tree and must be safe for whatever concurrency the host
/// chooses, hence `Send + Sync` and `&self`.
pub trait MessageBus: Send + Sync {
    fn queue_message(&self, message: Message) -> bool;
}

impl<B: MessageBus + ?Sized> MessageBus for Arc<B> {
    fn queue_message(&self, message: Message) -> bool {
        (**self).queue_message(message)
    }
}

impl<B: MessageBus + ?Sized> MessageBus for &B {
    fn queue_message(&self, message: Message) -> bool {
        (**self).queue_message(message)
    }
}

impl<B: MessageBus + ?Sized> MessageBus for Box<B> {
    fn queue_message(&self, message: Message) -> bool {
        (**self).queue_message(message)
    }
}

/// Accepts and drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBus;

impl MessageBus for NullBus {
    fn queue_message(&self, _message: Message) -> bool {
        true
    }
}

type RejectFn = dyn Fn(&Message) -> bool + Send + Sync;

/// Records every message it receives, in order.
///
/// An optional predicate makes the bus reject matching messages (the message is still recorded), which
/// is how tests and tools simulate a consumer that asks the run to stop.
#[derive(Default)]
pub struct CollectingBus {
    messages: Mutex<Vec<Message>>,
    reject: Option<Box<RejectFn>>,
}

impl CollectingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message for which `predicate` returns `true`.
    pub fn rejecting(predicate: impl Fn(&Message) -> bool + Send + Sync + 'static) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            reject: Some(Box::new(predicate)),
        }
    }

    /// Snapshot of the messages recorded so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl MessageBus for CollectingBus {
    fn queue_message(&self, message: Message) -> bool {
        let accepted = self.reject.as_ref().is_none_or(|reject| !reject(&message));
        self.messages.lock().push(message);
        accepted
    }
}

/// Forwards to an inner bus and asks the run to stop once a test has failed.
///
/// The failing test's own messages are forwarded normally; the rejection of its `Failed` message trips
/// cancellation, so no further sibling is started. Every later message is still forwarded (finishing
/// messages of enclosing levels matter to reporters) but answered with `false`.
pub struct StopOnFailBus<B> {
    inner: B,
    failed: AtomicBool,
}

impl<B: MessageBus> StopOnFailBus<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            failed: AtomicBool::new(false),
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: MessageBus> MessageBus for StopOnFailBus<B> {
    fn queue_message(&self, message: Message) -> bool {
        if matches!(message, Message::Failed { .. }) && !self.failed.swap(true, Ordering::AcqRel) {
            tracing::debug!("first test failure observed; requesting cancellation");
        }
        let accepted = self.inner.queue_message(message);
        accepted && !self.has_failed()
    }
}
