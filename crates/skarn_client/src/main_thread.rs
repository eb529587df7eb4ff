use thiserror::Error;

use skarn_core::events::{self, EventReceiver, EventSender};

use crate::camera::Camera;

/// State owned by the thread that runs the render loop. Handlers never
/// touch it directly, whatever thread dispatch happens to run on; they
/// post commands instead.
#[derive(Debug, Default)]
pub struct MainThreadState {
    pub camera: Camera,
}

pub type Command = Box<dyn FnOnce(&mut MainThreadState) + Send>;

#[derive(Debug, Error)]
#[error("main-thread hand-off queue is closed")]
pub struct HandoffClosed;

/// Producer half of the hand-off: any thread may post work.
#[derive(Clone)]
pub struct HandoffSender {
    tx: EventSender<Command>,
}

impl HandoffSender {
    pub fn post<F>(&self, command: F) -> Result<(), HandoffClosed>
    where
        F: FnOnce(&mut MainThreadState) + Send + 'static,
    {
        self.tx.send(Box::new(command)).map_err(|_| HandoffClosed)
    }
}

/// Consumer half: drained once per tick, on the owning thread, executing
/// commands in enqueue order.
pub struct HandoffQueue {
    rx: EventReceiver<Command>,
}

impl HandoffQueue {
    pub fn drain(&self, state: &mut MainThreadState) -> usize {
        let commands = self.rx.drain();
        let executed = commands.len();
        for command in commands {
            command(state);
        }
        executed
    }
}

pub fn channel() -> (HandoffSender, HandoffQueue) {
    let (tx, rx) = events::channel();
    (HandoffSender { tx }, HandoffQueue { rx })
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::{channel, MainThreadState};

    #[test]
    fn commands_execute_in_enqueue_order() {
        let (sender, queue) = channel();
        for step in 1..=3 {
            sender
                .post(move |state| {
                    state.camera.position = DVec3::splat(f64::from(step));
                })
                .expect("post command");
        }

        let mut state = MainThreadState::default();
        assert_eq!(queue.drain(&mut state), 3);
        assert_eq!(state.camera.position, DVec3::splat(3.0));
    }

    #[test]
    fn drain_with_nothing_queued_executes_nothing() {
        let (_sender, queue) = channel();
        let mut state = MainThreadState::default();
        assert_eq!(queue.drain(&mut state), 0);
    }
}
