// Domain records, request payloads and the response envelope

pub mod artisan;
pub mod catalog;
pub mod errors;
pub mod event;
pub mod forum;
pub mod response;
pub mod user;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

use errors::AppError;

/// Identifier assigned by a storage backend.
///
/// Backends hand these out sequentially per entity and never reuse one.
/// Callers should treat the value as opaque and only compare or echo it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Ids start at 1; zero and negative values never name a record.
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }

    /// Parses a path segment, naming `resource` in the 400 on failure.
    pub fn parse(raw: &str, resource: &str) -> Result<Self, AppError> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .map(Self)
            .filter(|id| id.is_valid())
            .ok_or_else(|| AppError::invalid_id(resource))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored entity with a backend-assigned id.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;
}

/// A partial update; `Some` fields overwrite the stored values.
pub trait Patch<T> {
    fn apply_to(self, target: &mut T);
}

/// Overwrites `slot` when the patch carries a value.
pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Overwrites an optional column when the patch carries a value.
pub(crate) fn merge_optional<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
