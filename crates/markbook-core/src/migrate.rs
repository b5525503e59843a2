//! Record schema migration.
//!
//! This module provides version-specific transforms to upgrade project
//! records parsed from older storage formats into the current schema shape.
//! Migration runs on every load and on every imported record, and is
//! idempotent: re-running it on an already-migrated record is a no-op.

use serde_json::{Map, Value};

/// The schema version stamped on every record this build writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Upgrade a raw storage-format record to the current schema version.
///
/// The one concrete transformation is normalizing the `results` field from
/// its legacy positional/array representation to a keyed mapping, so that
/// `results[student]` is unambiguous regardless of how roster entries were
/// added or removed over the record's history. Records at or above the
/// current version pass through unchanged apart from version-tag
/// normalization; records from a newer build are left untouched.
#[must_use]
pub fn migrate_record(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };

    let from_version = record_version(&map);
    if from_version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            version = from_version,
            "record is from a newer schema; leaving untouched"
        );
        return Value::Object(map);
    }

    if from_version < CURRENT_SCHEMA_VERSION {
        migrate_v1_to_v2(&mut map);
    }

    map.insert(
        "version".into(),
        Value::Number(CURRENT_SCHEMA_VERSION.into()),
    );
    Value::Object(map)
}

/// Read the record's schema version tag.
///
/// Accepts the current numeric form as well as the legacy string tags
/// (`"1.0"`, `"2.0"`). Absent or unparseable tags count as version 1.
fn record_version(map: &Map<String, Value>) -> u32 {
    match map.get("version") {
        Some(Value::Number(n)) => u32::try_from(n.as_u64().unwrap_or(1)).unwrap_or(1),
        Some(Value::String(s)) => s
            .split('.')
            .next()
            .and_then(|major| major.parse().ok())
            .unwrap_or(1),
        _ => 1,
    }
}

/// V1 -> v2: keyed results plus guaranteed payload containers.
fn migrate_v1_to_v2(map: &mut Map<String, Value>) {
    if let Some(Value::Array(entries)) = map.get("results") {
        let mut keyed = Map::new();
        for (index, entry) in entries.iter().enumerate() {
            let Value::Object(scores) = entry else {
                continue;
            };
            if let Some(Value::String(student_id)) = scores.get("studentId") {
                let mut rest = scores.clone();
                let key = student_id.clone();
                rest.remove("studentId");
                keyed.insert(key, Value::Object(rest));
            } else {
                keyed.insert(index.to_string(), Value::Object(scores.clone()));
            }
        }
        map.insert("results".into(), Value::Object(keyed));
    }

    for key in ["errors", "stats"] {
        if !map.get(key).is_some_and(Value::is_object) {
            map.insert(key.into(), Value::Object(Map::new()));
        }
    }
    if !map.get("psychologyFeatures").is_some_and(Value::is_array) {
        map.insert("psychologyFeatures".into(), Value::Array(Vec::new()));
    }
}
