//! Book lifecycle status
//!
//! `BookStatus` is the single value the rest of the application observes for
//! a book. Steady-state variants are derived from the stored record (see
//! [`derive_status`]); transient variants are produced by running tasks.
//!
//! Updates for the same book can race, for example a late progress tick
//! arriving after the download finished. [`StatusKind::importance`] gives a
//! total order over kinds, and [`BookStatus::supersedes`] applies it: the
//! incoming value wins unless the cached kind is strictly more important.

mod derive;

pub use derive::derive_status;

use crate::types::BookId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookStatus {
    Loanable {
        id: BookId,
    },
    Holdable {
        id: BookId,
    },
    Held {
        id: BookId,
        queue_position: Option<u32>,
        start_date: Option<DateTime<Utc>>,
    },
    HeldReady {
        id: BookId,
        end_date: Option<DateTime<Utc>>,
        revocable: bool,
    },
    RequestingLoan {
        id: BookId,
    },
    Loaned {
        id: BookId,
        loan_end_date: Option<DateTime<Utc>>,
    },
    RequestingDownload {
        id: BookId,
    },
    DownloadInProgress {
        id: BookId,
        bytes_so_far: u64,
        bytes_expected: Option<u64>,
    },
    DownloadFailed {
        id: BookId,
        cause: String,
    },
    Downloaded {
        id: BookId,
        loan_end_date: Option<DateTime<Utc>>,
    },
    Cancelled {
        id: BookId,
    },
    RevokeFailed {
        id: BookId,
        cause: String,
    },
    Revoked {
        id: BookId,
        revoke_uri: String,
    },
}

impl BookStatus {
    /// Returns the book this status describes
    pub fn id(&self) -> &BookId {
        match self {
            BookStatus::Loanable { id }
            | BookStatus::Holdable { id }
            | BookStatus::Held { id, .. }
            | BookStatus::HeldReady { id, .. }
            | BookStatus::RequestingLoan { id }
            | BookStatus::Loaned { id, .. }
            | BookStatus::RequestingDownload { id }
            | BookStatus::DownloadInProgress { id, .. }
            | BookStatus::DownloadFailed { id, .. }
            | BookStatus::Downloaded { id, .. }
            | BookStatus::Cancelled { id }
            | BookStatus::RevokeFailed { id, .. }
            | BookStatus::Revoked { id, .. } => id,
        }
    }

    /// Returns the data-free kind of this status
    pub fn kind(&self) -> StatusKind {
        match self {
            BookStatus::Loanable { .. } => StatusKind::Loanable,
            BookStatus::Holdable { .. } => StatusKind::Holdable,
            BookStatus::Held { .. } => StatusKind::Held,
            BookStatus::HeldReady { .. } => StatusKind::HeldReady,
            BookStatus::RequestingLoan { .. } => StatusKind::RequestingLoan,
            BookStatus::Loaned { .. } => StatusKind::Loaned,
            BookStatus::RequestingDownload { .. } => StatusKind::RequestingDownload,
            BookStatus::DownloadInProgress { .. } => StatusKind::DownloadInProgress,
            BookStatus::DownloadFailed { .. } => StatusKind::DownloadFailed,
            BookStatus::Downloaded { .. } => StatusKind::Downloaded,
            BookStatus::Cancelled { .. } => StatusKind::Cancelled,
            BookStatus::RevokeFailed { .. } => StatusKind::RevokeFailed,
            BookStatus::Revoked { .. } => StatusKind::Revoked,
        }
    }

    /// Returns true if `self`, arriving now, should replace `cached`
    pub fn supersedes(&self, cached: &BookStatus) -> bool {
        cached.kind().importance() <= self.kind().importance()
    }

    /// Returns true if `self`, derived from the stored record, should replace `cached`
    ///
    /// A status read back from disk describes the book at rest. It replaces
    /// anything except the progress of a task that is still running.
    pub fn refreshes(&self, cached: &BookStatus) -> bool {
        !cached.kind().is_in_flight()
    }

    /// Fraction of the download completed, when known
    pub fn download_fraction(&self) -> Option<f64> {
        match self {
            BookStatus::DownloadInProgress {
                bytes_so_far,
                bytes_expected: Some(expected),
                ..
            } if *expected > 0 => Some((*bytes_so_far as f64 / *expected as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Status variants without their data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Loanable,
    Holdable,
    Held,
    HeldReady,
    RequestingLoan,
    Loaned,
    RequestingDownload,
    DownloadInProgress,
    DownloadFailed,
    Downloaded,
    Cancelled,
    RevokeFailed,
    Revoked,
}

impl StatusKind {
    /// Every kind, in declaration order
    pub const ALL: [StatusKind; 13] = [
        StatusKind::Loanable,
        StatusKind::Holdable,
        StatusKind::Held,
        StatusKind::HeldReady,
        StatusKind::RequestingLoan,
        StatusKind::Loaned,
        StatusKind::RequestingDownload,
        StatusKind::DownloadInProgress,
        StatusKind::DownloadFailed,
        StatusKind::Downloaded,
        StatusKind::Cancelled,
        StatusKind::RevokeFailed,
        StatusKind::Revoked,
    ];

    /// Weight used to reject stale updates
    ///
    /// Steady-state kinds share the lowest weight so a sync never blocks a
    /// later task update. Download milestones climb monotonically, terminal
    /// task outcomes sit above progress, and `Downloaded` is highest.
    pub fn importance(self) -> u8 {
        match self {
            StatusKind::Loanable
            | StatusKind::Holdable
            | StatusKind::Held
            | StatusKind::HeldReady
            | StatusKind::Loaned
            | StatusKind::Revoked => 0,
            StatusKind::RequestingLoan => 1,
            StatusKind::RequestingDownload => 2,
            StatusKind::DownloadInProgress => 3,
            StatusKind::Cancelled | StatusKind::DownloadFailed | StatusKind::RevokeFailed => 4,
            StatusKind::Downloaded => 5,
        }
    }

    /// Returns true for kinds only a running task produces
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            StatusKind::RequestingLoan
                | StatusKind::RequestingDownload
                | StatusKind::DownloadInProgress
                | StatusKind::DownloadFailed
        )
    }

    /// Returns true for kinds a task publishes while it is still running
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            StatusKind::RequestingLoan
                | StatusKind::RequestingDownload
                | StatusKind::DownloadInProgress
        )
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Loanable => "available",
            StatusKind::Holdable => "holdable",
            StatusKind::Held => "on hold",
            StatusKind::HeldReady => "hold ready",
            StatusKind::RequestingLoan => "borrowing",
            StatusKind::Loaned => "on loan",
            StatusKind::RequestingDownload => "starting download",
            StatusKind::DownloadInProgress => "downloading",
            StatusKind::DownloadFailed => "download failed",
            StatusKind::Downloaded => "downloaded",
            StatusKind::Cancelled => "cancelled",
            StatusKind::RevokeFailed => "return failed",
            StatusKind::Revoked => "returned",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
