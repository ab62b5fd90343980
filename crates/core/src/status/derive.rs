use crate::status::BookStatus;
use crate::types::{Availability, BookSnapshot};

/// Maps a stored record to its steady-state status
///
/// Only the availability of the latest metadata and the presence of the
/// content blob matter. Downloaded content wins for anything the patron is
/// allowed to read; holds ignore content entirely.
pub fn derive_status(snapshot: &BookSnapshot) -> BookStatus {
    let id = snapshot.id.clone();

    match &snapshot.entry.availability {
        Availability::OpenAccess { .. } | Availability::Loaned { .. }
            if snapshot.content_present =>
        {
            BookStatus::Downloaded {
                id,
                loan_end_date: snapshot.entry.availability.loan_end(),
            }
        }
        Availability::OpenAccess { .. } => BookStatus::Loaned {
            id,
            loan_end_date: None,
        },
        Availability::Loaned { until, .. } => BookStatus::Loaned {
            id,
            loan_end_date: *until,
        },
        Availability::Loanable { .. } if snapshot.content_present => BookStatus::Downloaded {
            id,
            loan_end_date: None,
        },
        Availability::Loanable { .. } => BookStatus::Loanable { id },
        Availability::Holdable { .. } => BookStatus::Holdable { id },
        Availability::Held {
            position, since, ..
        } => BookStatus::Held {
            id,
            queue_position: *position,
            start_date: *since,
        },
        Availability::HeldReady { until, revoke_uri } => BookStatus::HeldReady {
            id,
            end_date: *until,
            revocable: revoke_uri.is_some(),
        },
    }
}
