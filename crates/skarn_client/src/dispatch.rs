use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{trace, warn};

use skarn_shared::protocol::{MessageKind, S2C};

use crate::main_thread::HandoffClosed;
use crate::session::Session;

/// Failure surfaced by a handler. Caught at the dispatch boundary, logged,
/// and never allowed to abort processing of later messages.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed {context} payload: {source}")]
    Payload {
        context: &'static str,
        #[source]
        source: bincode::Error,
    },
    #[error("adapter for {0:?} received a different message variant")]
    UnexpectedVariant(MessageKind),
    #[error("outbound channel closed")]
    OutboundClosed,
    #[error(transparent)]
    Handoff(#[from] HandoffClosed),
}

pub type HandlerResult = Result<(), HandlerError>;

type BoxedHandler = Box<dyn Fn(&Session, S2C) -> HandlerResult + Send + Sync>;

/// Registry from message variant identity to handler. Built once at session
/// start by `handlers::register_defaults` and read-only afterwards; lookup
/// needs no locking.
#[derive(Default)]
pub struct Dispatcher {
    handlers: FxHashMap<MessageKind, BoxedHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for one variant. Registering the same variant twice
    /// deterministically keeps the later registration.
    pub fn register<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: Fn(&Session, S2C) -> HandlerResult + Send + Sync + 'static,
    {
        if self.handlers.insert(kind, Box::new(handler)).is_some() {
            warn!("replaced existing handler for {kind:?}");
        }
    }

    pub fn is_registered(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Routes one message to its handler on the calling thread. Variants
    /// with no registered handler are valid and ignored.
    pub fn dispatch(&self, session: &Session, msg: S2C) {
        let kind = msg.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            trace!("no handler registered for {kind:?}");
            return;
        };
        if let Err(err) = handler(session, msg) {
            warn!("handler for {kind:?} failed: {err}");
        }
    }
}
