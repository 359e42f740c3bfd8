//! Folio Document Aggregation
//!
//! Aggregation pipelines over collection documents: match, unwind, group,
//! sort, skip, limit and project stages.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::query::{compare_by_keys, Filter, Sort};
use crate::types::{Document, DocumentId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Field holding the group key in grouped rows.
pub const GROUP_KEY: &str = "_id";

// =============================================================================
// Accumulator
// =============================================================================

/// Per-group reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
    First(String),
    Last(String),
}

impl Accumulator {
    fn field(&self) -> Option<&str> {
        match self {
            Self::Count => None,
            Self::Sum(f) | Self::Avg(f) | Self::Min(f) | Self::Max(f) | Self::First(f)
            | Self::Last(f) => Some(f),
        }
    }

    /// Reduce the rows of one group.
    pub fn apply(&self, rows: &[&Document]) -> Value {
        let values = || {
            let field = self.field().unwrap_or_default();
            rows.iter().filter_map(move |row| row.get(field))
        };

        match self {
            Self::Count => Value::Int(rows.len() as i64),
            Self::Sum(_) => sum(values().filter(|v| v.is_number())),
            Self::Avg(_) => {
                let numbers: Vec<f64> = values().filter_map(Value::as_f64).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            Self::Min(_) => values()
                .filter(|v| !v.is_null())
                .min_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null),
            Self::Max(_) => values()
                .filter(|v| !v.is_null())
                .max_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null),
            Self::First(field) => rows
                .first()
                .and_then(|row| row.get(field))
                .cloned()
                .unwrap_or(Value::Null),
            Self::Last(field) => rows
                .last()
                .and_then(|row| row.get(field))
                .cloned()
                .unwrap_or(Value::Null),
        }
    }
}

/// Integer sum while every input is an integer and it fits; float otherwise.
fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;

    for value in values {
        float_total += value.as_f64().unwrap_or_default();
        int_total = match (int_total, value) {
            (Some(total), Value::Int(n)) => total.checked_add(*n),
            _ => None,
        };
    }

    match int_total {
        Some(total) => Value::Int(total),
        None => Value::Float(float_total),
    }
}

// =============================================================================
// Group
// =============================================================================

/// Group rows by a key field and reduce each group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Key field; `None` puts every row in one group keyed `null`.
    pub key: Option<String>,
    pub outputs: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            key: Some(field.into()),
            outputs: Vec::new(),
        }
    }

    pub fn all() -> Self {
        Self {
            key: None,
            outputs: Vec::new(),
        }
    }

    pub fn output(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.outputs.push((name.into(), accumulator));
        self
    }

    pub fn count(self, name: impl Into<String>) -> Self {
        self.output(name, Accumulator::Count)
    }

    pub fn sum(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::Sum(field.into()))
    }

    pub fn avg(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::Avg(field.into()))
    }

    pub fn min(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::Min(field.into()))
    }

    pub fn max(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::Max(field.into()))
    }

    pub fn first(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::First(field.into()))
    }

    pub fn last(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.output(name, Accumulator::Last(field.into()))
    }

    /// Groups come out in the order their key was first seen.
    fn apply(&self, rows: Vec<Document>) -> Vec<Document> {
        let mut groups: Vec<(Value, Vec<&Document>)> = Vec::new();

        for row in &rows {
            let key = match self.key {
                Some(ref field) => row.get(field).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            };
            match groups.iter_mut().find(|(k, _)| k.loosely_equals(&key)) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        groups
            .into_iter()
            .map(|(key, members)| {
                let mut data = HashMap::with_capacity(self.outputs.len() + 1);
                for (name, accumulator) in &self.outputs {
                    data.insert(name.clone(), accumulator.apply(&members));
                }
                let id = DocumentId::new(key.to_json().to_string());
                data.insert(GROUP_KEY.to_string(), key);
                row(id, data)
            })
            .collect()
    }
}

// =============================================================================
// Stage
// =============================================================================

/// One pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stage {
    /// Keep rows matching every filter.
    Match(Vec<Filter>),
    /// One row per element of an array field. Rows where the field is
    /// missing or an empty array are dropped; scalars pass through.
    Unwind(String),
    Group(Group),
    Sort(Vec<Sort>),
    Skip(usize),
    Limit(usize),
    /// Keep the listed fields, plus `_id`.
    Project(Vec<String>),
}

impl Stage {
    fn apply(&self, rows: Vec<Document>) -> Vec<Document> {
        match self {
            Self::Match(filters) => rows
                .into_iter()
                .filter(|row| filters.iter().all(|f| f.matches(row)))
                .collect(),
            Self::Unwind(field) => rows.into_iter().flat_map(|r| unwind(r, field)).collect(),
            Self::Group(group) => group.apply(rows),
            Self::Sort(keys) => {
                let mut rows = rows;
                rows.sort_by(|a, b| compare_by_keys(a, b, keys));
                rows
            }
            Self::Skip(n) => rows.into_iter().skip(*n).collect(),
            Self::Limit(n) => rows.into_iter().take(*n).collect(),
            Self::Project(fields) => rows
                .into_iter()
                .map(|r| {
                    let mut data = HashMap::new();
                    for field in fields.iter().map(String::as_str).chain([GROUP_KEY]) {
                        if let Some(v) = r.get(field) {
                            data.insert(field.to_string(), v.clone());
                        }
                    }
                    Document { data, ..r }
                })
                .collect(),
        }
    }
}

fn unwind(row: Document, field: &str) -> Vec<Document> {
    match row.get(field).cloned() {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| {
                let mut copy = row.clone();
                copy.set_path(field, item).ok().map(|_| copy)
            })
            .collect(),
        Some(_) => vec![row],
    }
}

fn row(id: DocumentId, data: HashMap<String, Value>) -> Document {
    Document {
        id,
        data,
        created_at: None,
        updated_at: None,
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// An ordered list of stages run over a collection's documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, filter: Filter) -> Self {
        self.stage(Stage::Match(vec![filter]))
    }

    pub fn unwind(self, field: impl Into<String>) -> Self {
        self.stage(Stage::Unwind(field.into()))
    }

    pub fn group(self, group: Group) -> Self {
        self.stage(Stage::Group(group))
    }

    pub fn sort(self, field: impl Into<String>, ascending: bool) -> Self {
        self.stage(Stage::Sort(vec![Sort {
            field: field.into(),
            ascending,
        }]))
    }

    pub fn skip(self, n: usize) -> Self {
        self.stage(Stage::Skip(n))
    }

    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn project(self, fields: Vec<String>) -> Self {
        self.stage(Stage::Project(fields))
    }

    /// Check stage definitions before running.
    pub fn check(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            match stage {
                Stage::Group(group) => {
                    let mut seen = HashSet::new();
                    for (name, _) in &group.outputs {
                        if name.is_empty() || name == GROUP_KEY || name.contains('.') {
                            errors.push(format!("stage {}: invalid output name '{}'", i, name));
                        } else if !seen.insert(name.as_str()) {
                            errors.push(format!("stage {}: duplicate output '{}'", i, name));
                        }
                    }
                }
                Stage::Unwind(field) if field.is_empty() => {
                    errors.push(format!("stage {}: unwind needs a field", i));
                }
                Stage::Sort(keys) if keys.is_empty() => {
                    errors.push(format!("stage {}: sort needs at least one key", i));
                }
                _ => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Run the pipeline over documents given in insertion order. Input rows
    /// expose the document id as `_id`.
    pub fn run(&self, docs: Vec<Document>) -> Vec<Value> {
        let mut rows: Vec<Document> = docs
            .into_iter()
            .map(|mut doc| {
                doc.data
                    .insert(GROUP_KEY.to_string(), Value::String(doc.id.0.clone()));
                doc
            })
            .collect();

        for stage in &self.stages {
            rows = stage.apply(rows);
        }

        rows.into_iter().map(|r| Value::Object(r.data)).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
