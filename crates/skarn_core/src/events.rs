use std::sync::mpsc;

/// Typed, ordered, multi-producer single-consumer event channel.
///
/// Used for the outbound command queue (handlers -> network writer) and as
/// the substrate of the main-thread hand-off queue. Delivery order matches
/// send order per producer, which is what the protocol contract requires.
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }
}

impl<T> EventReceiver<T> {
    pub fn recv(&self) -> Result<T, mpsc::RecvError> {
        self.rx.recv()
    }

    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    /// Takes everything currently queued without blocking. Consumers that
    /// run once per tick (outbound flush, hand-off execution) drain rather
    /// than poll one event at a time.
    pub fn drain(&self) -> Vec<T> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::channel;

    #[test]
    fn events_arrive_in_send_order() {
        let (tx, rx) = channel();
        for value in 0..5 {
            tx.send(value).expect("send event");
        }
        assert_eq!(rx.drain(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn drain_on_empty_channel_returns_nothing() {
        let (_tx, rx) = channel::<u32>();
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn cloned_senders_feed_the_same_receiver() {
        let (tx, rx) = channel();
        let tx2 = tx.clone();
        tx.send("a").expect("send from original");
        tx2.send("b").expect("send from clone");
        assert_eq!(rx.drain(), vec!["a", "b"]);
    }
}
