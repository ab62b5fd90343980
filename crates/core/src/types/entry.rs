//! Catalog entry model
//!
//! A `FeedEntry` is the latest description of a book as published by the
//! remote catalog: who wrote it, how it can be obtained, and the patron's
//! current lending state for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The patron's lending state for a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    /// Copies are available to borrow
    Loanable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
    /// No copies available, a hold can be placed
    Holdable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
    /// A hold is placed and waiting in the queue
    Held {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
    /// A held copy is reserved for the patron
    HeldReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
    /// The patron has the book on loan
    Loaned {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
    /// Freely available, no loan required
    OpenAccess {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revoke_uri: Option<String>,
    },
}

impl Availability {
    /// Loanable with no revoke link
    pub fn loanable() -> Self {
        Availability::Loanable { revoke_uri: None }
    }

    /// Holdable with no revoke link
    pub fn holdable() -> Self {
        Availability::Holdable { revoke_uri: None }
    }

    /// Open access with no revoke link
    pub fn open_access() -> Self {
        Availability::OpenAccess { revoke_uri: None }
    }

    /// Loaned with an optional end date and revoke link
    pub fn loaned(until: Option<DateTime<Utc>>, revoke_uri: Option<String>) -> Self {
        Availability::Loaned {
            since: None,
            until,
            revoke_uri,
        }
    }

    /// Returns the revoke link, if the server published one
    pub fn revoke_uri(&self) -> Option<&str> {
        match self {
            Availability::Loanable { revoke_uri }
            | Availability::Holdable { revoke_uri }
            | Availability::Held { revoke_uri, .. }
            | Availability::HeldReady { revoke_uri, .. }
            | Availability::Loaned { revoke_uri, .. }
            | Availability::OpenAccess { revoke_uri } => revoke_uri.as_deref(),
        }
    }

    /// Returns true if this availability describes a hold
    pub fn is_hold(&self) -> bool {
        matches!(self, Availability::Held { .. } | Availability::HeldReady { .. })
    }

    /// Returns true if the patron may download the content right now
    pub fn is_downloadable(&self) -> bool {
        matches!(
            self,
            Availability::Loaned { .. } | Availability::OpenAccess { .. }
        )
    }

    /// Returns the loan end date, if this is a loan with a known end
    pub fn loan_end(&self) -> Option<DateTime<Utc>> {
        match self {
            Availability::Loaned { until, .. } => *until,
            _ => None,
        }
    }

    /// Short name used in logs and listings
    pub fn name(&self) -> &'static str {
        match self {
            Availability::Loanable { .. } => "loanable",
            Availability::Holdable { .. } => "holdable",
            Availability::Held { .. } => "held",
            Availability::HeldReady { .. } => "held-ready",
            Availability::Loaned { .. } => "loaned",
            Availability::OpenAccess { .. } => "open-access",
        }
    }
}

/// How an acquisition link obtains the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionKind {
    Borrow,
    Buy,
    Generic,
    OpenAccess,
    Sample,
    Subscribe,
}

impl std::fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionKind::Borrow => write!(f, "borrow"),
            AcquisitionKind::Buy => write!(f, "buy"),
            AcquisitionKind::Generic => write!(f, "generic"),
            AcquisitionKind::OpenAccess => write!(f, "open-access"),
            AcquisitionKind::Sample => write!(f, "sample"),
            AcquisitionKind::Subscribe => write!(f, "subscribe"),
        }
    }
}

/// A typed acquisition link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub kind: AcquisitionKind,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Acquisition {
    /// Creates a new acquisition link
    pub fn new(kind: AcquisitionKind, href: impl Into<String>) -> Self {
        Self {
            kind,
            href: href.into(),
            mime_type: None,
        }
    }

    /// Sets the MIME type of the acquired resource
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Catalog-unique identifier (usually a URN)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub availability: Availability,
    #[serde(default)]
    pub acquisitions: Vec<Acquisition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<String>,
    /// Link to the standalone entry document, used to refresh metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Creates an entry with no links
    pub fn new(id: impl Into<String>, title: impl Into<String>, availability: Availability) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            availability,
            acquisitions: Vec::new(),
            cover_uri: None,
            thumbnail_uri: None,
            alternate_uri: None,
            updated: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_acquisition(mut self, acquisition: Acquisition) -> Self {
        self.acquisitions.push(acquisition);
        self
    }

    pub fn with_cover(mut self, uri: impl Into<String>) -> Self {
        self.cover_uri = Some(uri.into());
        self
    }

    pub fn with_alternate(mut self, uri: impl Into<String>) -> Self {
        self.alternate_uri = Some(uri.into());
        self
    }

    /// Returns the first acquisition link of the given kind
    pub fn acquisition(&self, kind: AcquisitionKind) -> Option<&Acquisition> {
        self.acquisitions.iter().find(|a| a.kind == kind)
    }

    /// Returns the best cover image link (full cover, then thumbnail)
    pub fn image_uri(&self) -> Option<&str> {
        self.cover_uri
            .as_deref()
            .or(self.thumbnail_uri.as_deref())
    }
}
