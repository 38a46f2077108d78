//! Observable lifecycle of a downloader's current (or last) transfer.

use std::sync::atomic::{AtomicU8, Ordering};

use super::error::ErrorKind;

/// Where a downloader is in its transfer state machine.
///
/// `Idle → Requesting → Streaming → {Completed | Failed(kind) | Cancelled}`.
/// A new `download` call starts again from `Requesting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// No transfer has run yet.
    Idle,
    /// The range request is in flight; headers not yet processed.
    Requesting,
    /// The body is being copied into the sink.
    Streaming,
    /// The last transfer was committed.
    Completed,
    /// The last transfer failed with a non-cancellation error.
    Failed(ErrorKind),
    /// The last transfer observed a pause.
    Cancelled,
}

impl TransferState {
    /// True once the transfer has reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }

    /// Final state for a classified failure.
    pub(crate) fn from_failure(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::TaskCancelled => Self::Cancelled,
            other => Self::Failed(other),
        }
    }

    fn encode(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Requesting => 1,
            Self::Streaming => 2,
            Self::Completed => 3,
            Self::Cancelled => 4,
            Self::Failed(ErrorKind::NetworkError) => 5,
            Self::Failed(ErrorKind::FullDiskError) => 6,
            Self::Failed(ErrorKind::FileVerifyError) => 7,
            Self::Failed(ErrorKind::TaskCancelled) => 8,
        }
    }

    fn decode(raw: u8) -> Self {
        match raw {
            1 => Self::Requesting,
            2 => Self::Streaming,
            3 => Self::Completed,
            4 => Self::Cancelled,
            5 => Self::Failed(ErrorKind::NetworkError),
            6 => Self::Failed(ErrorKind::FullDiskError),
            7 => Self::Failed(ErrorKind::FileVerifyError),
            8 => Self::Failed(ErrorKind::TaskCancelled),
            _ => Self::Idle,
        }
    }
}

/// Lock-free cell holding a [`TransferState`].
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> TransferState {
        TransferState::decode(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: TransferState) {
        self.0.store(state.encode(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_starts_idle() {
        assert_eq!(StateCell::default().get(), TransferState::Idle);
    }

    #[test]
    fn test_state_cell_round_trips_failures() {
        let cell = StateCell::default();
        for kind in [
            ErrorKind::NetworkError,
            ErrorKind::FullDiskError,
            ErrorKind::FileVerifyError,
        ] {
            cell.set(TransferState::Failed(kind));
            assert_eq!(cell.get(), TransferState::Failed(kind));
        }
    }

    #[test]
    fn test_cancellation_maps_to_cancelled_state() {
        assert_eq!(
            TransferState::from_failure(ErrorKind::TaskCancelled),
            TransferState::Cancelled
        );
        assert_eq!(
            TransferState::from_failure(ErrorKind::FullDiskError),
            TransferState::Failed(ErrorKind::FullDiskError)
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TransferState::Idle.is_terminal());
        assert!(!TransferState::Requesting.is_terminal());
        assert!(!TransferState::Streaming.is_terminal());
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Cancelled.is_terminal());
        assert!(TransferState::Failed(ErrorKind::NetworkError).is_terminal());
    }
}
