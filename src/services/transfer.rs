use crate::models::TransferState;
use tokio::sync::{mpsc, oneshot};

/// Bytes sent so far for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_current: u64,
    pub bytes_total: u64,
}

impl TransferProgress {
    pub fn percent(&self) -> u8 {
        percent_complete(self.bytes_current, self.bytes_total)
    }
}

/// `floor(100 * current / total)`, clamped to 0..=100.
///
/// A zero `bytes_total` yields 100, not 0: a zero-byte file reports 100% on
/// its first progress event and every one after it.
pub fn percent_complete(bytes_current: u64, bytes_total: u64) -> u8 {
    if bytes_total == 0 {
        return 100;
    }
    let current = bytes_current.min(bytes_total) as u128;
    (current * 100 / bytes_total as u128) as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Failed(String),
}

/// Producer side of a transfer, owned by the task doing the upload.
///
/// `complete` and `fail` consume the reporter, so nothing can be reported
/// after the terminal state. Dropping it without either resolves the
/// transfer as failed.
pub struct TransferReporter {
    progress_tx: Option<mpsc::UnboundedSender<TransferProgress>>,
    outcome_tx: Option<oneshot::Sender<TransferOutcome>>,
    state: TransferState,
    last_bytes: u64,
}

impl TransferReporter {
    #[cfg(test)]
    fn state(&self) -> TransferState {
        self.state
    }

    pub fn state_changed(&mut self, state: TransferState) {
        if state.is_terminal() {
            tracing::warn!("Terminal state {:?} must be reported through complete/fail", state);
            return;
        }
        tracing::debug!("Transfer state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Reports progress. Counts lower than the last reported one are dropped.
    pub fn progress(&mut self, bytes_current: u64, bytes_total: u64) {
        if bytes_current < self.last_bytes {
            tracing::debug!(
                "Ignoring out-of-order progress: {} < {}",
                bytes_current,
                self.last_bytes
            );
            return;
        }
        self.last_bytes = bytes_current;

        let progress = TransferProgress {
            bytes_current,
            bytes_total,
        };
        tracing::debug!(
            "Progress {}/{} bytes ({}%)",
            bytes_current,
            bytes_total,
            progress.percent()
        );

        if let Some(tx) = &self.progress_tx {
            // Receiver gone means nobody is waiting on this transfer any more.
            let _ = tx.send(progress);
        }
    }

    pub fn complete(mut self) {
        self.finish(TransferOutcome::Completed);
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.finish(TransferOutcome::Failed(reason.into()));
    }

    fn finish(&mut self, outcome: TransferOutcome) {
        // Close the progress channel first so the consumer sees the end of
        // progress before the outcome.
        self.progress_tx.take();
        self.state = match outcome {
            TransferOutcome::Completed => TransferState::Completed,
            TransferOutcome::Failed(_) => TransferState::Failed,
        };
        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for TransferReporter {
    fn drop(&mut self) {
        if self.outcome_tx.is_some() {
            self.finish(TransferOutcome::Failed(
                "transfer ended without a result".to_string(),
            ));
        }
    }
}

/// Consumer side of a transfer: progress first, then exactly one outcome.
pub struct TransferHandle {
    progress_rx: mpsc::UnboundedReceiver<TransferProgress>,
    outcome_rx: oneshot::Receiver<TransferOutcome>,
}

impl TransferHandle {
    pub fn channel() -> (TransferReporter, TransferHandle) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let reporter = TransferReporter {
            progress_tx: Some(progress_tx),
            outcome_tx: Some(outcome_tx),
            state: TransferState::Waiting,
            last_bytes: 0,
        };
        let handle = TransferHandle {
            progress_rx,
            outcome_rx,
        };
        (reporter, handle)
    }

    /// Next progress report, or `None` once the transfer reached a terminal state.
    pub async fn next_progress(&mut self) -> Option<TransferProgress> {
        self.progress_rx.recv().await
    }

    /// Waits for the terminal outcome, discarding any unread progress.
    pub async fn outcome(mut self) -> TransferOutcome {
        while self.progress_rx.recv().await.is_some() {}
        self.outcome_rx
            .await
            .unwrap_or_else(|_| TransferOutcome::Failed("transfer dropped".to_string()))
    }
}
