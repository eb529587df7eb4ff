use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::ThreadPoolBuildError;

use skarn_core::events::{self, EventReceiver, EventSender};
use skarn_shared::protocol::C2S;

use crate::chat::ChatLog;
use crate::ingest::ChunkIngest;
use crate::main_thread::{self, HandoffQueue, HandoffSender};
use crate::world::{RenderEvent, WorldStore};

/// Everything one connection owns: the world store, the decode pipeline,
/// the channels handlers write to, and the join-sequence state. Created on
/// connect, dropped on disconnect; a respawn resets the world inside the
/// session rather than replacing it.
pub struct Session {
    pub world: Arc<WorldStore>,
    pub ingest: ChunkIngest,
    pub outbound: EventSender<C2S>,
    pub handoff: HandoffSender,
    pub chat: ChatLog,
    ready: AtomicBool,
    server_brand: Mutex<Option<String>>,
}

/// Consumer ends of the session's queues, drained by the run loop and the
/// external render layer.
pub struct SessionChannels {
    pub outbound: EventReceiver<C2S>,
    pub handoff: HandoffQueue,
    pub render: EventReceiver<RenderEvent>,
}

impl Session {
    pub fn create(
        decode_threads: Option<usize>,
    ) -> Result<(Self, SessionChannels), ThreadPoolBuildError> {
        let (outbound_tx, outbound_rx) = events::channel();
        let (handoff_tx, handoff_rx) = main_thread::channel();
        let (render_tx, render_rx) = events::channel();

        let session = Self {
            world: Arc::new(WorldStore::new(render_tx)),
            ingest: ChunkIngest::new(decode_threads)?,
            outbound: outbound_tx,
            handoff: handoff_tx,
            chat: ChatLog::new(),
            ready: AtomicBool::new(false),
            server_brand: Mutex::new(None),
        };
        let channels = SessionChannels {
            outbound: outbound_rx,
            handoff: handoff_rx,
            render: render_rx,
        };
        Ok((session, channels))
    }

    /// Set once when the join sequence completes; gameplay messages are
    /// invalid to send before this. Never cleared for the session's
    /// lifetime; a fresh connection gets a fresh session.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn set_server_brand(&self, brand: String) {
        *self
            .server_brand
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(brand);
    }

    pub fn server_brand(&self) -> Option<String> {
        self.server_brand
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn readiness_starts_false_and_latches_on() {
        let (session, _channels) = Session::create(Some(2)).expect("create session");
        assert!(!session.is_ready());
        session.mark_ready();
        session.mark_ready();
        assert!(session.is_ready());
    }

    #[test]
    fn server_brand_is_absent_until_reported() {
        let (session, _channels) = Session::create(Some(2)).expect("create session");
        assert_eq!(session.server_brand(), None);
        session.set_server_brand("ore".to_owned());
        assert_eq!(session.server_brand(), Some("ore".to_owned()));
    }
}
