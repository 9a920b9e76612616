//! Outbound side of one `WebSocket` connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::fanout::DeliveryFailure;

/// Handle to a connected client: the sending half of its write queue.
///
/// The socket itself is owned by the connection's writer task.
#[derive(Debug)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl ConnectionHandle {
    /// Wrap the sending half of a connection's write queue.
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a text frame without waiting.
    pub fn send(&self, message: Arc<String>) -> Result<(), DeliveryFailure> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(match e {
                    TrySendError::Full(_) => DeliveryFailure::QueueFull,
                    TrySendError::Closed(_) => DeliveryFailure::Closed,
                })
            }
        }
    }

    /// Messages refused because the queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Time since the connection was registered.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_reaches_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);
        handle.send(Arc::new("hello".into())).unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
        assert_eq!(handle.drop_count(), 0);
    }

    #[test]
    fn full_queue_is_reported() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        handle.send(Arc::new("a".into())).unwrap();
        assert_eq!(
            handle.send(Arc::new("b".into())),
            Err(DeliveryFailure::QueueFull)
        );
        assert_eq!(handle.drop_count(), 1);
    }

    #[test]
    fn closed_queue_is_reported() {
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);
        drop(rx);
        assert_eq!(
            handle.send(Arc::new("a".into())),
            Err(DeliveryFailure::Closed)
        );
        assert_eq!(handle.drop_count(), 1);
    }

    #[test]
    fn age_starts_near_zero() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        assert!(handle.age() < Duration::from_secs(2));
    }
}
