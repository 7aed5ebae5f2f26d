//! Completion handles for operations that finish on a later tick.

use tokio::sync::watch;

/// Progress of a pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// Not yet complete.
    Pending,
    /// Completed successfully.
    Success,
    /// Completed with an error message.
    Failed(String),
}

/// Future-like handle for an operation that completes once later
/// control-channel replies arrive.
///
/// Snapshots ([`is_finished`], [`error_message`]) are usable from the tick
/// driver; [`wait`] is for host tasks that want to park on the outcome.
///
/// [`is_finished`]: PendingOperation::is_finished
/// [`error_message`]: PendingOperation::error_message
/// [`wait`]: PendingOperation::wait
#[derive(Debug, Clone)]
pub struct PendingOperation {
    rx: watch::Receiver<OperationState>,
}

/// Completion side held by the orchestrator.
#[derive(Debug)]
pub(crate) struct OperationHandle {
    tx: watch::Sender<OperationState>,
}

pub(crate) fn pending_pair() -> (OperationHandle, PendingOperation) {
    let (tx, rx) = watch::channel(OperationState::Pending);
    (OperationHandle { tx }, PendingOperation { rx })
}

impl PendingOperation {
    /// Current state snapshot.
    pub fn state(&self) -> OperationState {
        self.rx.borrow().clone()
    }

    /// Whether the operation has completed, either way.
    pub fn is_finished(&self) -> bool {
        self.state() != OperationState::Pending
    }

    /// Whether the operation completed successfully.
    pub fn is_success(&self) -> bool {
        self.state() == OperationState::Success
    }

    /// The error message, when the operation failed.
    pub fn error_message(&self) -> Option<String> {
        match self.state() {
            OperationState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Wait for completion.
    pub async fn wait(mut self) -> std::result::Result<(), String> {
        loop {
            match self.rx.borrow_and_update().clone() {
                OperationState::Pending => {}
                OperationState::Success => return Ok(()),
                OperationState::Failed(message) => return Err(message),
            }
            if self.rx.changed().await.is_err() {
                return Err("operation abandoned".to_string());
            }
        }
    }
}

impl OperationHandle {
    pub(crate) fn finish_with_success(self) {
        self.complete(OperationState::Success);
    }

    pub(crate) fn finish_with_error(self, message: impl Into<String>) {
        let mut message = message.into();
        if message.is_empty() {
            message = "Unknown Error".to_string();
        }
        self.complete(OperationState::Failed(message));
    }

    fn complete(self, state: OperationState) {
        assert!(
            *self.tx.borrow() == OperationState::Pending,
            "operation completed twice"
        );
        let _ = self.tx.send(state);
    }
}
