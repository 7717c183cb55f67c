//! Repository object kinds and the legacy keys that identify them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pre-UUID integer primary key of a repository object.
pub type LegacyId = u32;

/// Kinds of repository objects that carried legacy integer ids.
///
/// The numeric codes match the object-type constants stored in the `type`
/// and `scopeType` fields of statistics records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Bitstream,
    Item,
    Collection,
    Community,
    Group,
    EPerson,
}

impl ObjectKind {
    /// Order in which the driver processes subject/scope types.
    ///
    /// Items first, then bitstreams, keeps the last item and bitstream warm in
    /// the resolver cache; containers are few and stay cached throughout.
    pub const PROCESSING_ORDER: [ObjectKind; 4] = [
        ObjectKind::Item,
        ObjectKind::Bitstream,
        ObjectKind::Collection,
        ObjectKind::Community,
    ];

    pub fn type_code(&self) -> i32 {
        match self {
            ObjectKind::Bitstream => 0,
            ObjectKind::Item => 2,
            ObjectKind::Collection => 3,
            ObjectKind::Community => 4,
            ObjectKind::Group => 6,
            ObjectKind::EPerson => 7,
        }
    }

    pub fn from_type_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ObjectKind::Bitstream),
            2 => Some(ObjectKind::Item),
            3 => Some(ObjectKind::Collection),
            4 => Some(ObjectKind::Community),
            6 => Some(ObjectKind::Group),
            7 => Some(ObjectKind::EPerson),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Bitstream => "bitstream",
            ObjectKind::Item => "item",
            ObjectKind::Collection => "collection",
            ObjectKind::Community => "community",
            ObjectKind::Group => "group",
            ObjectKind::EPerson => "eperson",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bitstream" => Some(ObjectKind::Bitstream),
            "item" => Some(ObjectKind::Item),
            "collection" => Some(ObjectKind::Collection),
            "community" => Some(ObjectKind::Community),
            "group" => Some(ObjectKind::Group),
            "eperson" => Some(ObjectKind::EPerson),
            _ => None,
        }
    }

    /// Label used in the legacy-id report.
    pub fn report_label(&self) -> &'static str {
        match self {
            ObjectKind::Bitstream => "Bitstream",
            ObjectKind::Item => "Item",
            ObjectKind::Collection => "Collection",
            ObjectKind::Community => "Community",
            ObjectKind::Group => "Group",
            ObjectKind::EPerson => "EPerson",
        }
    }

    /// Statistics field that records ownership by an object of this kind.
    pub fn owning_field(&self) -> Option<&'static str> {
        match self {
            ObjectKind::Item => Some("owningItem"),
            ObjectKind::Collection => Some("owningColl"),
            ObjectKind::Community => Some("owningComm"),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A legacy id together with the kind it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub legacy_id: LegacyId,
}

impl ObjectKey {
    pub fn new(kind: ObjectKind, legacy_id: LegacyId) -> Self {
        Self { kind, legacy_id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.legacy_id)
    }
}

/// A legacy `owner` value: kind prefix packed in front of the integer.
///
/// `e15` is person 15, `g3` is group 3. Any other prefix parses but has no
/// kind and never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerRef {
    pub prefix: char,
    pub legacy_id: LegacyId,
}

impl OwnerRef {
    /// Split the prefix off an owner value. `None` if it is not `<char><digits>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let prefix = chars.next()?;
        let legacy_id = chars.as_str().parse::<LegacyId>().ok()?;
        Some(Self { prefix, legacy_id })
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        match self.prefix {
            'e' => Some(ObjectKind::EPerson),
            'g' => Some(ObjectKind::Group),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<ObjectKey> {
        self.kind().map(|kind| ObjectKey::new(kind, self.legacy_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_roundtrip() {
        for kind in [
            ObjectKind::Bitstream,
            ObjectKind::Item,
            ObjectKind::Collection,
            ObjectKind::Community,
            ObjectKind::Group,
            ObjectKind::EPerson,
        ] {
            assert_eq!(ObjectKind::from_type_code(kind.type_code()), Some(kind));
            assert_eq!(ObjectKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ObjectKind::from_type_code(1), None);
        assert_eq!(ObjectKind::from_type_code(5), None);
    }

    #[test]
    fn test_owner_ref_parse() {
        let owner = OwnerRef::parse("e15").unwrap();
        assert_eq!(owner.prefix, 'e');
        assert_eq!(owner.legacy_id, 15);
        assert_eq!(owner.kind(), Some(ObjectKind::EPerson));

        let group = OwnerRef::parse("g3").unwrap();
        assert_eq!(group.key(), Some(ObjectKey::new(ObjectKind::Group, 3)));

        let unknown = OwnerRef::parse("x9").unwrap();
        assert_eq!(unknown.kind(), None);

        assert!(OwnerRef::parse("e").is_none());
        assert!(OwnerRef::parse("").is_none());
        assert!(OwnerRef::parse("eabc").is_none());
    }

    #[test]
    fn test_owning_fields() {
        assert_eq!(ObjectKind::Item.owning_field(), Some("owningItem"));
        assert_eq!(ObjectKind::Bitstream.owning_field(), None);
    }
}
