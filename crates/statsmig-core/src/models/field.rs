//! Statistics fields that may carry legacy ids.

use super::object::ObjectKind;
use std::fmt;

/// How the object kind of a field's values is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The kind is the type code held in a sibling field of the same record.
    SiblingType(&'static str),
    /// Every value of the field refers to the same kind.
    Fixed(ObjectKind),
    /// Values carry a one-character kind prefix (`e` person, `g` group).
    OwnerPrefix,
}

/// A tracked statistics field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Id,
    ScopeId,
    OwningComm,
    OwningColl,
    OwningItem,
    EPersonId,
    Owner,
    Submitter,
    Actor,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Id,
        FieldKind::ScopeId,
        FieldKind::OwningComm,
        FieldKind::OwningColl,
        FieldKind::OwningItem,
        FieldKind::EPersonId,
        FieldKind::Owner,
        FieldKind::Submitter,
        FieldKind::Actor,
    ];

    /// Field name as stored in the index.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Id => "id",
            FieldKind::ScopeId => "scopeId",
            FieldKind::OwningComm => "owningComm",
            FieldKind::OwningColl => "owningColl",
            FieldKind::OwningItem => "owningItem",
            FieldKind::EPersonId => "epersonid",
            FieldKind::Owner => "owner",
            FieldKind::Submitter => "submitter",
            FieldKind::Actor => "actor",
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            FieldKind::Id => Resolution::SiblingType("type"),
            FieldKind::ScopeId => Resolution::SiblingType("scopeType"),
            FieldKind::OwningComm => Resolution::Fixed(ObjectKind::Community),
            FieldKind::OwningColl => Resolution::Fixed(ObjectKind::Collection),
            FieldKind::OwningItem => Resolution::Fixed(ObjectKind::Item),
            FieldKind::EPersonId | FieldKind::Submitter | FieldKind::Actor => {
                Resolution::Fixed(ObjectKind::EPerson)
            }
            FieldKind::Owner => Resolution::OwnerPrefix,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
