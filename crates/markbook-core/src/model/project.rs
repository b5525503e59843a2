//! The project entity: one assessment's configuration, roster, and results.
//!
//! A [`Project`] is a validated, defaulted container with no behavior beyond
//! read-only derived accessors and serialization to/from the storage format.
//! Construction from arbitrary input ([`Project::from_value`]) applies the
//! same defaulting as regular creation, after running the record through the
//! schema migration in [`crate::migrate`].

use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::migrate::{self, CURRENT_SCHEMA_VERSION};

/// The closed set of work categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Current,
    Exam,
    Diagnostic,
    Literacy,
    Psychology,
}

impl Kind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Exam => "exam",
            Self::Diagnostic => "diagnostic",
            Self::Literacy => "literacy",
            Self::Psychology => "psychology",
        }
    }
}

/// Lifecycle status. Any value may follow any other; there is no enforced
/// transition graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Kind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "current" => Ok(Self::Current),
            "exam" => Ok(Self::Exam),
            "diagnostic" => Ok(Self::Diagnostic),
            "literacy" => Ok(Self::Literacy),
            "psychology" => Ok(Self::Psychology),
            _ => Err(ParseEnumError {
                expected: "kind",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// One grade band in the criteria table. `min` is the deciding lower bound;
/// `max` is kept for display and legacy compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min: f64,
    pub max: f64,
}

/// Grade criteria table: discrete grade (as its wire-format string key) ->
/// percentage band.
pub type GradeCriteria = BTreeMap<String, GradeBand>;

/// The stock criteria table used when a project does not configure its own.
#[must_use]
pub fn standard_criteria() -> GradeCriteria {
    BTreeMap::from([
        ("5".into(), GradeBand { min: 85.0, max: 100.0 }),
        ("4".into(), GradeBand { min: 70.0, max: 84.0 }),
        ("3".into(), GradeBand { min: 50.0, max: 69.0 }),
        ("2".into(), GradeBand { min: 0.0, max: 49.0 }),
    ])
}

/// Assessment configuration. Unknown keys written by the surrounding
/// application are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub work_type: String,
    #[serde(default = "standard_criteria")]
    pub criteria: GradeCriteria,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subject: String::new(),
            class: String::new(),
            work_type: String::new(),
            criteria: standard_criteria(),
            extra: BTreeMap::new(),
        }
    }
}

/// One task definition. Only the fields the core consumes are typed; the
/// rest of the task document rides in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TaskDef {
    fn default() -> Self {
        Self {
            id: None,
            max_score: default_max_score(),
            level: default_level(),
            extra: BTreeMap::new(),
        }
    }
}

impl TaskDef {
    /// The key this task contributes to the results mapping: the explicit
    /// id when present, else the positional `task_{index}` convention.
    #[must_use]
    pub fn result_key(&self, index: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("task_{index}"))
    }
}

/// One roster entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Student {
    /// The key this roster entry contributes to the results mapping.
    #[must_use]
    pub fn result_key(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| index.to_string())
    }
}

/// Cached aggregate statistics. Recomputed on save, never authoritative;
/// always safe to discard and rebuild from the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectStats {
    pub total_students: usize,
    pub total_tasks: usize,
    pub avg_grade: f64,
    pub completion_percent: f64,
    /// Discrete grade (wire-format string key) -> number of students.
    pub grades_distribution: BTreeMap<String, usize>,
}

/// Keyed results mapping: student key -> task key -> score.
pub type Results = BTreeMap<String, BTreeMap<String, f64>>;

/// One assessment/work record with lifecycle metadata and cached stats.
///
/// Field names follow the storage format of the persisted record schema
/// (camelCase; `type` and `class` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Kind,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_opened: Option<DateTime<Utc>>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub tasks: Vec<TaskDef>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub results: Results,
    #[serde(default)]
    pub errors: BTreeMap<String, Value>,
    #[serde(default)]
    pub psychology_features: Vec<Value>,
    #[serde(default)]
    pub stats: ProjectStats,
    #[serde(default)]
    pub reports: Vec<Value>,
    #[serde(default)]
    pub view_settings: serde_json::Map<String, Value>,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Beyond-schema keys written by older builds or the surrounding
    /// application; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Error for records that cannot be turned into a [`Project`].
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// The record has neither a usable name nor an id.
    #[error("record has no usable name or id")]
    NoIdentity,

    /// A present field has the wrong type and cannot be defaulted away.
    #[error("record field has wrong type: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Project {
    /// Create a fresh project with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = generate_id();
        let color = default_color(&id);
        Self {
            id,
            name: name.into(),
            kind: Kind::default(),
            subject: String::new(),
            class: String::new(),
            theme: String::new(),
            description: String::new(),
            icon: default_icon(),
            color,
            tags: Vec::new(),
            status: Status::default(),
            created_at: now,
            updated_at: now,
            last_opened: None,
            settings: Settings::default(),
            tasks: Vec::new(),
            students: Vec::new(),
            results: Results::new(),
            errors: BTreeMap::new(),
            psychology_features: Vec::new(),
            stats: ProjectStats::default(),
            reports: Vec::new(),
            view_settings: serde_json::Map::new(),
            version: CURRENT_SCHEMA_VERSION,
            extra: BTreeMap::new(),
        }
    }

    /// Build a project from an arbitrary storage-format record.
    ///
    /// The record is migrated to the current schema version, missing fields
    /// are defaulted (`id` generated, timestamps set to `now`, collections
    /// to empty containers), and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the record is not an object, has
    /// neither name nor id, or carries a field of an unusable type.
    pub fn from_value(value: Value, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::NotAnObject);
        }

        let migrated = migrate::migrate_record(value);
        let Value::Object(mut map) = migrated else {
            return Err(ValidationError::NotAnObject);
        };

        let name_present = map
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        let id_present = map
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !name_present && !id_present {
            return Err(ValidationError::NoIdentity);
        }

        if !id_present {
            map.insert("id".into(), Value::String(generate_id()));
        }
        if !name_present {
            map.insert("name".into(), Value::String("New work".into()));
        }

        let now_str = Value::String(now.to_rfc3339());
        if !map.contains_key("createdAt") {
            map.insert("createdAt".into(), now_str.clone());
        }
        if !map.contains_key("updatedAt") {
            let created = map.get("createdAt").cloned().unwrap_or(now_str);
            map.insert("updatedAt".into(), created);
        }

        let mut project: Self = serde_json::from_value(Value::Object(map))?;
        if project.color.is_empty() {
            project.color = default_color(&project.id);
        }
        Ok(project)
    }

    /// Serialize to the storage-format record.
    ///
    /// # Errors
    ///
    /// Returns an error if an opaque payload value cannot be serialized
    /// (not expected for well-formed projects).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Icon-prefixed name for list views.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }

    #[must_use]
    pub const fn is_archived(&self) -> bool {
        matches!(self.status, Status::Archived)
    }

    /// Last-modified timestamp formatted for display.
    #[must_use]
    pub fn last_modified(&self) -> String {
        self.updated_at.format("%d.%m.%Y %H:%M").to_string()
    }
}

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fixed palette for defaulted project colors.
const PALETTE: [&str; 10] = [
    "#3498db", "#2ecc71", "#e74c3c", "#f39c12", "#9b59b6", "#1abc9c", "#34495e", "#e67e22",
    "#27ae60", "#2980b9",
];

/// Pick a palette color deterministically from the project id (FNV-1a).
#[must_use]
pub fn default_color(id: &str) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    #[allow(clippy::cast_possible_truncation)]
    let index = (hash % PALETTE.len() as u64) as usize;
    PALETTE[index].to_string()
}

fn default_icon() -> String {
    "📊".to_string()
}

const fn default_max_score() -> f64 {
    1.0
}

const fn default_level() -> u8 {
    1
}

const fn default_version() -> u32 {
    1
}
