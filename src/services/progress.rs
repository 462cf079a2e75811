use crate::services::transfer::percent_complete;
use futures::Stream;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// The "uploading_status" event stream.
///
/// Holds at most one subscriber. Attaching a new subscriber ends the previous
/// one, and every subscription gets its own channel, so events emitted
/// before a subscriber attached are never delivered to it.
#[derive(Default)]
pub struct ProgressStream {
    sink: Mutex<Option<mpsc::UnboundedSender<u8>>>,
}

/// Receiving end handed to a subscriber. Ends when the stream is closed.
pub struct ProgressSubscription {
    rx: mpsc::UnboundedReceiver<u8>,
}

impl ProgressSubscription {
    pub async fn recv(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ProgressSubscription {
    type Item = u8;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<u8>> {
        self.rx.poll_recv(cx)
    }
}

impl ProgressStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_listen(&self) -> ProgressSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(tx);
        if previous.is_some() {
            tracing::debug!("Replacing existing progress subscriber");
        }
        ProgressSubscription { rx }
    }

    pub fn on_cancel(&self) {
        self.invalidate();
    }

    /// Ends the current subscription, if any, and forgets it.
    pub fn invalidate(&self) {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
        if sink.is_some() {
            tracing::debug!("Progress stream closed");
        }
    }

    #[cfg(test)]
    fn is_attached(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Sends `percent` to the subscriber. Returns false when nobody is listening.
    pub fn emit(&self, percent: u8) -> bool {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match sink.as_ref() {
            Some(tx) => {
                if tx.send(percent).is_err() {
                    // Subscriber dropped its receiver without cancelling.
                    *sink = None;
                    return false;
                }
                true
            }
            None => false,
        }
    }

    pub fn on_progress(&self, bytes_current: u64, bytes_total: u64) -> bool {
        self.emit(percent_complete(bytes_current, bytes_total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_emit_without_subscriber_is_dropped() {
        let stream = ProgressStream::new();
        assert!(!stream.on_progress(5, 10));
        assert!(!stream.is_attached());
    }

    #[tokio::test]
    async fn test_subscriber_receives_percentages() {
        let stream = ProgressStream::new();
        let mut sub = stream.on_listen();
        assert!(stream.on_progress(1, 4));
        assert!(stream.on_progress(4, 4));
        stream.on_cancel();

        let events: Vec<u8> = sub.by_ref().collect().await;
        assert_eq!(events, vec![25, 100]);
        assert!(!stream.is_attached());
    }

    #[tokio::test]
    async fn test_reattach_does_not_replay_stale_events() {
        let stream = ProgressStream::new();
        let mut first = stream.on_listen();
        stream.emit(10);
        stream.on_cancel();
        stream.emit(20);

        let mut second = stream.on_listen();
        stream.emit(30);

        assert_eq!(first.recv().await, Some(10));
        assert_eq!(first.recv().await, None);
        assert_eq!(second.try_recv(), Some(30));
        assert_eq!(second.try_recv(), None);
    }

    #[tokio::test]
    async fn test_new_listen_ends_previous_subscription() {
        let stream = ProgressStream::new();
        let mut first = stream.on_listen();
        let _second = stream.on_listen();
        assert_eq!(first.recv().await, None);
    }

    #[test]
    fn test_dropped_receiver_clears_sink() {
        let stream = ProgressStream::new();
        drop(stream.on_listen());
        assert!(!stream.emit(50));
        assert!(!stream.is_attached());
    }

    #[test]
    fn test_repeated_cancel_is_harmless() {
        let stream = ProgressStream::new();
        stream.on_cancel();
        stream.on_cancel();
        let _sub = stream.on_listen();
        stream.on_cancel();
        stream.on_cancel();
        assert!(!stream.is_attached());
    }
}
