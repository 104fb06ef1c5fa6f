//! Parsed view of one oplog entry.
//!
//! A raw entry is a semi-structured BSON document. [`OplogEvent::parse`]
//! turns it into a typed value exposing the source namespace and operation
//! kind, which is all the watch matcher needs to classify the entry. The
//! operation documents themselves (`o`, `o2`) stay in the raw entry and are
//! read through the [`fields`](crate::fields) accessors at dispatch time.
//!
//! # Examples
//!
//! ```rust
//! use bucatini_core::event::{OpKind, OplogEvent};
//! use bson::doc;
//!
//! let raw = doc! {
//!     "ns": "shop.orders",
//!     "op": "i",
//!     "o": { "_id": 1, "total": 25 },
//! };
//!
//! let event = OplogEvent::parse(&raw).unwrap();
//! assert_eq!(event.namespace.database, "shop");
//! assert_eq!(event.namespace.collection, "orders");
//! assert_eq!(event.kind, OpKind::Insert);
//! ```

use crate::fields;
use bson::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when a raw oplog entry cannot be classified.
///
/// Both variants mean the entry is malformed; the tail loop logs and drops
/// the entry without aborting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The `ns` field is absent, mistyped, or empty.
    #[error("oplog entry has no namespace")]
    MissingNamespace,

    /// The `ns` field does not contain a `.` separating database from collection.
    #[error("invalid namespace {ns:?}: expected \"database.collection\"")]
    InvalidNamespace {
        /// The offending namespace string.
        ns: String,
    },
}

/// A fully qualified namespace (database + collection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name.
    pub database: String,

    /// Collection name. May itself contain dots; only the first separator
    /// in `ns` is significant.
    pub collection: String,
}

impl Namespace {
    /// Creates a namespace from database and collection names.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Returns the fully qualified name as `"database.collection"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Operation kind of one oplog entry.
///
/// The known set is closed; every other code ends up in `Unknown`, which the
/// dispatcher treats as unsupported rather than silently misrouting it. The
/// original one-letter code is preserved for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// A document was inserted (`op = "i"`).
    Insert,

    /// A document was updated in place (`op = "u"`).
    Update,

    /// A document was deleted (`op = "d"`).
    Delete,

    /// An administrative command (`op = "c"`). Never dispatched.
    Command,

    /// Any other code, including an absent or mistyped `op` field.
    Unknown(String),
}

impl OpKind {
    /// Maps a one-letter oplog operation code to its kind.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "i" => Self::Insert,
            "u" => Self::Update,
            "d" => Self::Delete,
            "c" => Self::Command,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the oplog code this kind was parsed from.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Insert => "i",
            Self::Update => "u",
            Self::Delete => "d",
            Self::Command => "c",
            Self::Unknown(code) => code,
        }
    }

    /// Returns true if the dispatcher has a handler path for this kind.
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// A parsed oplog entry: where it happened and what kind of operation it was.
///
/// Derived from, and cheaper than, the raw entry; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OplogEvent {
    /// Source namespace of the operation.
    pub namespace: Namespace,

    /// Operation kind.
    pub kind: OpKind,
}

impl OplogEvent {
    /// Parses a raw oplog entry.
    ///
    /// The namespace is split at the first `.` only, so `"db.a.b"` yields
    /// collection `"a.b"`. An absent or non-string `op` field is not an
    /// error: parsing succeeds with [`OpKind::Unknown`] and the
    /// unsupported-kind handling happens at dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when `ns` is absent, empty, or has no dot.
    pub fn parse(raw: &Document) -> Result<Self, ParseError> {
        let ns = fields::str_field(raw, "ns").ok_or(ParseError::MissingNamespace)?;
        if ns.is_empty() {
            return Err(ParseError::MissingNamespace);
        }

        let (database, collection) = ns.split_once('.').ok_or_else(|| ParseError::InvalidNamespace {
            ns: ns.to_string(),
        })?;

        let kind = match fields::str_field(raw, "op") {
            Some(code) => OpKind::from_code(code),
            None => OpKind::Unknown(String::new()),
        };

        Ok(Self {
            namespace: Namespace::new(database, collection),
            kind,
        })
    }
}
