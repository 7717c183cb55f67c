//! Lookups from legacy integer ids to object UUIDs.
//!
//! The resolver only ever reads through this seam; nothing here creates or
//! modifies repository objects.

mod sqlite;

pub use sqlite::SqliteLookup;

use crate::error::Result;
use crate::models::{LegacyId, ObjectKind};
use uuid::Uuid;

/// Find repository objects by the integer id they carried before UUIDs.
pub trait LegacyLookup {
    /// The UUID of the `kind` object whose legacy id is `legacy_id`, if any.
    fn find_by_legacy_id(&self, kind: ObjectKind, legacy_id: LegacyId) -> Result<Option<Uuid>>;

    /// Release whatever per-session state the lookup has accumulated.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Name of the store behind the lookup, for operator messages.
    fn describe(&self) -> String {
        "repository database".to_string()
    }
}

impl<T: LegacyLookup + ?Sized> LegacyLookup for &T {
    fn find_by_legacy_id(&self, kind: ObjectKind, legacy_id: LegacyId) -> Result<Option<Uuid>> {
        (**self).find_by_legacy_id(kind, legacy_id)
    }

    fn refresh(&self) -> Result<()> {
        (**self).refresh()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
