//! Handoff over tokio mpsc channels

use super::traits::HandoffChannel;
use crate::error::Error;
use crate::types::Batch;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Create a bounded handoff channel holding at most `capacity` batches
///
/// Publishing waits while the channel is full. The scheduler holds the sender;
/// the receiver belongs to the downstream consumer.
///
/// # Panics
///
/// Panics if `capacity` is zero, like [`mpsc::channel`].
pub fn handoff_channel(capacity: usize) -> (mpsc::Sender<Batch>, mpsc::Receiver<Batch>) {
    mpsc::channel(capacity)
}

#[async_trait]
impl HandoffChannel for mpsc::Sender<Batch> {
    async fn publish(&self, batch: Batch) -> crate::Result<()> {
        self.send(batch).await.map_err(|_| Error::ChannelClosed)
    }
}

#[async_trait]
impl HandoffChannel for mpsc::UnboundedSender<Batch> {
    async fn publish(&self, batch: Batch) -> crate::Result<()> {
        self.send(batch).map_err(|_| Error::ChannelClosed)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackedAccount;
    use std::time::Duration;

    #[tokio::test]
    async fn bounded_publish_delivers_in_order() {
        let (tx, mut rx) = handoff_channel(4);

        tx.publish(vec![TrackedAccount::new(1, "a")]).await.unwrap();
        tx.publish(vec![TrackedAccount::new(2, "b")]).await.unwrap();

        assert_eq!(rx.recv().await.unwrap()[0].id, 1);
        assert_eq!(rx.recv().await.unwrap()[0].id, 2);
    }

    #[tokio::test]
    async fn bounded_publish_fails_when_receiver_dropped() {
        let (tx, rx) = handoff_channel(1);
        drop(rx);

        let result = tx.publish(Vec::new()).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn bounded_publish_waits_for_capacity() {
        let (tx, mut rx) = handoff_channel(1);
        tx.publish(Vec::new()).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.publish(Vec::new())).await;
        assert!(blocked.is_err(), "publish into a full channel must wait");

        rx.recv().await.unwrap();
        tx.publish(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn unbounded_publish_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<Batch>();
        tx.publish(Vec::new()).await.unwrap();
        drop(rx);

        let result = tx.publish(Vec::new()).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }
}
