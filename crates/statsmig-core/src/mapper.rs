//! Rewrites legacy ids in statistics records to UUID strings.
//!
//! Values that resolve are replaced by the object's UUID. Values that do not
//! are marked with [`UNMIGRATED_SUFFIX`], which takes them out of every
//! legacy query so a later run does not try them again. Anything that is not
//! an integer (UUIDs, marked values, garbage) is left as it is.

use crate::error::Result;
use crate::models::{
    is_legacy_value, value_to_string, FieldKind, LegacyId, ObjectKey, ObjectKind, OwnerRef,
    Resolution, StatsRecord, VERSION_FIELD,
};
use crate::persistence::LegacyLookup;
use crate::resolver::Resolver;
use serde_json::Value;
use tracing::warn;

/// Appended to legacy values that could not be resolved.
pub const UNMIGRATED_SUFFIX: &str = "-unmigrated";

/// What mapping one field did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOutcome {
    /// Values replaced by a UUID.
    pub rewritten: usize,
    /// Values marked as unmigrated.
    pub unresolved: usize,
    /// Keys that resolved, in the order they were seen.
    pub resolved: Vec<ObjectKey>,
}

impl FieldOutcome {
    pub fn changed(&self) -> bool {
        self.rewritten > 0 || self.unresolved > 0
    }

    fn absorb(&mut self, other: FieldOutcome) {
        self.rewritten += other.rewritten;
        self.unresolved += other.unresolved;
        self.resolved.extend(other.resolved);
    }
}

/// Split one stored value into the legacy entries it holds.
///
/// Corrupted shards (DS-3436) stored multi-values as a single comma-joined
/// string and left stray backslashes behind, e.g. `3,7\`.
pub fn split_legacy_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.replace('\\', ""))
        .filter(|part| !part.is_empty())
        .collect()
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !out.contains(&value) {
        out.push(value);
    }
}

/// Kind named by a sibling type field, if present and known.
fn sibling_kind(record: &StatsRecord, sibling: &str) -> Option<ObjectKind> {
    record
        .first_str(sibling)
        .and_then(|code| code.trim().parse::<i32>().ok())
        .and_then(ObjectKind::from_type_code)
}

/// Rewrite the legacy values of one field in place.
pub fn map_field<L: LegacyLookup>(
    record: &mut StatsRecord,
    field: FieldKind,
    resolver: &Resolver<L>,
) -> Result<FieldOutcome> {
    let mut outcome = FieldOutcome::default();
    let Some(values) = record.get(field.name()) else {
        return Ok(outcome);
    };

    let rule = field.resolution();
    let sibling = match rule {
        Resolution::SiblingType(name) => sibling_kind(record, name),
        _ => None,
    };

    let mut out: Vec<String> = Vec::new();
    for value in values {
        for entry in split_legacy_values(&value_to_string(value)) {
            let (key, uuid) = match rule {
                Resolution::OwnerPrefix => {
                    let Some(owner) = OwnerRef::parse(&entry) else {
                        if is_legacy_value(&entry) {
                            warn!("Non numeric legacy id {}:{}", field, entry);
                        }
                        push_unique(&mut out, entry);
                        continue;
                    };
                    (owner.key(), resolver.resolve_owner_ref(owner)?)
                }
                Resolution::Fixed(_) | Resolution::SiblingType(_) => {
                    let Ok(legacy_id) = entry.parse::<LegacyId>() else {
                        if is_legacy_value(&entry) {
                            warn!("Non numeric legacy id {}:{}", field, entry);
                        }
                        push_unique(&mut out, entry);
                        continue;
                    };
                    let kind = match rule {
                        Resolution::Fixed(kind) => Some(kind),
                        _ => sibling,
                    };
                    match kind {
                        Some(kind) => {
                            let key = ObjectKey::new(kind, legacy_id);
                            (Some(key), resolver.resolve_key(key)?)
                        }
                        None => (None, None),
                    }
                }
            };

            match (key, uuid) {
                (Some(key), Some(uuid)) => {
                    push_unique(&mut out, uuid.to_string());
                    outcome.rewritten += 1;
                    outcome.resolved.push(key);
                }
                _ => {
                    push_unique(&mut out, format!("{}{}", entry, UNMIGRATED_SUFFIX));
                    outcome.unresolved += 1;
                }
            }
        }
    }

    if outcome.changed() {
        record.set_values(field.name(), out.into_iter().map(Value::String).collect());
    }
    Ok(outcome)
}

/// Map every tracked field and prepare the record for re-submission.
pub fn map_record<L: LegacyLookup>(
    record: &mut StatsRecord,
    resolver: &Resolver<L>,
) -> Result<FieldOutcome> {
    record.remove(VERSION_FIELD);
    let mut total = FieldOutcome::default();
    for field in FieldKind::ALL {
        total.absorb(map_field(record, field, resolver)?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Default)]
    struct MapLookup {
        objects: HashMap<ObjectKey, Uuid>,
        calls: Cell<usize>,
    }

    impl MapLookup {
        fn with(mut self, kind: ObjectKind, legacy_id: LegacyId) -> Self {
            self.objects
                .insert(ObjectKey::new(kind, legacy_id), Uuid::new_v4());
            self
        }

        fn uuid(&self, kind: ObjectKind, legacy_id: LegacyId) -> String {
            self.objects[&ObjectKey::new(kind, legacy_id)].to_string()
        }
    }

    impl LegacyLookup for MapLookup {
        fn find_by_legacy_id(&self, kind: ObjectKind, legacy_id: LegacyId) -> Result<Option<Uuid>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.objects.get(&ObjectKey::new(kind, legacy_id)).copied())
        }
    }

    #[test]
    fn test_split_corrupted_multi_value() {
        assert_eq!(split_legacy_values("3,7\\"), vec!["3", "7"]);
        assert_eq!(split_legacy_values("12"), vec!["12"]);
        assert_eq!(split_legacy_values(",\\,5"), vec!["5"]);
    }

    #[test]
    fn test_id_uses_type_sibling() {
        let resolver = Resolver::new(MapLookup::default().with(ObjectKind::Item, 42));
        let mut record = StatsRecord::new().with("type", 2).with("id", "42");

        let outcome = map_field(&mut record, FieldKind::Id, &resolver).unwrap();

        assert_eq!(outcome.rewritten, 1);
        assert_eq!(
            record.strings("id"),
            vec![resolver.lookup().uuid(ObjectKind::Item, 42)]
        );
    }

    #[test]
    fn test_unresolved_id_is_marked_and_skipped_later() {
        let resolver = Resolver::new(MapLookup::default());
        let mut record = StatsRecord::new().with("type", 2).with("id", "999999");

        map_field(&mut record, FieldKind::Id, &resolver).unwrap();
        assert_eq!(record.strings("id"), vec!["999999-unmigrated"]);
        assert_eq!(resolver.lookup().calls.get(), 1);

        let second = map_field(&mut record, FieldKind::Id, &resolver).unwrap();
        assert!(!second.changed());
        assert_eq!(record.strings("id"), vec!["999999-unmigrated"]);
        assert_eq!(resolver.lookup().calls.get(), 1);
    }

    #[test]
    fn test_scope_id_uses_scope_type() {
        let resolver = Resolver::new(MapLookup::default().with(ObjectKind::Collection, 8));
        let mut record = StatsRecord::new()
            .with("type", 2)
            .with("scopeType", 3)
            .with("scopeId", 8);

        map_field(&mut record, FieldKind::ScopeId, &resolver).unwrap();
        assert_eq!(
            record.strings("scopeId"),
            vec![resolver.lookup().uuid(ObjectKind::Collection, 8)]
        );
    }

    #[test]
    fn test_missing_type_marks_id() {
        let resolver = Resolver::new(MapLookup::default().with(ObjectKind::Item, 4));
        let mut record = StatsRecord::new().with("id", "4");

        let outcome = map_field(&mut record, FieldKind::Id, &resolver).unwrap();
        assert_eq!(outcome.unresolved, 1);
        assert_eq!(record.strings("id"), vec!["4-unmigrated"]);
        assert_eq!(resolver.lookup().calls.get(), 0);
    }

    #[test]
    fn test_comma_corrupted_field_maps_each_entry() {
        let lookup = MapLookup::default()
            .with(ObjectKind::Community, 3)
            .with(ObjectKind::Community, 7);
        let resolver = Resolver::new(lookup);
        let mut record = StatsRecord::new().with("owningComm", "3,7\\");

        let outcome = map_field(&mut record, FieldKind::OwningComm, &resolver).unwrap();

        assert_eq!(outcome.rewritten, 2);
        assert_eq!(
            record.strings("owningComm"),
            vec![
                resolver.lookup().uuid(ObjectKind::Community, 3),
                resolver.lookup().uuid(ObjectKind::Community, 7),
            ]
        );
    }

    #[test]
    fn test_duplicate_values_collapse() {
        let resolver = Resolver::new(MapLookup::default().with(ObjectKind::Collection, 1));
        let mut record = StatsRecord::new().with_values("owningColl", ["1", "1", "2", "2"]);

        map_field(&mut record, FieldKind::OwningColl, &resolver).unwrap();
        assert_eq!(
            record.strings("owningColl"),
            vec![
                resolver.lookup().uuid(ObjectKind::Collection, 1),
                "2-unmigrated".to_string(),
            ]
        );
    }

    #[test]
    fn test_owner_prefix() {
        let lookup = MapLookup::default()
            .with(ObjectKind::EPerson, 15)
            .with(ObjectKind::Group, 15);
        let resolver = Resolver::new(lookup);
        let mut record = StatsRecord::new().with_values("owner", ["e15", "q2", "?"]);

        map_field(&mut record, FieldKind::Owner, &resolver).unwrap();
        assert_eq!(
            record.strings("owner"),
            vec![
                resolver.lookup().uuid(ObjectKind::EPerson, 15),
                "q2-unmigrated".to_string(),
                "?".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_numeric_values_untouched() {
        let resolver = Resolver::new(MapLookup::default());
        let existing = Uuid::new_v4().to_string();
        let mut record = StatsRecord::new()
            .with("epersonid", existing.clone())
            .with("actor", "anonymous");

        map_field(&mut record, FieldKind::EPersonId, &resolver).unwrap();
        map_field(&mut record, FieldKind::Actor, &resolver).unwrap();
        assert_eq!(record.strings("epersonid"), vec![existing]);
        assert_eq!(record.strings("actor"), vec!["anonymous"]);
        assert_eq!(resolver.lookup().calls.get(), 0);
    }

    #[test]
    fn test_map_record_is_idempotent() {
        let lookup = MapLookup::default()
            .with(ObjectKind::Bitstream, 11)
            .with(ObjectKind::Item, 7)
            .with(ObjectKind::EPerson, 2);
        let resolver = Resolver::new(lookup);
        let mut record = StatsRecord::new()
            .with("uid", "u1")
            .with("type", 0)
            .with("id", "11")
            .with("owningItem", "7")
            .with_values("owningColl", ["4", "5"])
            .with("epersonid", "2")
            .with("_version_", 99);

        let first = map_record(&mut record, &resolver).unwrap();
        assert_eq!(first.rewritten, 3);
        assert_eq!(first.unresolved, 2);
        assert!(!record.contains(VERSION_FIELD));

        let snapshot = record.clone();
        let second = map_record(&mut record, &resolver).unwrap();
        assert!(!second.changed());
        assert_eq!(record, snapshot);
    }
}
