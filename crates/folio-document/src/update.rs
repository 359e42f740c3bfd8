//! Folio Document Update
//!
//! Field-level update operators applied to stored documents.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::types::{Document, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// Update Operation
// =============================================================================

/// A single field-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateOp {
    /// Replace the value at `path`. Applying it twice is the same as once.
    Set { path: String, value: Value },
    /// Remove the value at `path`; a missing path is not an error.
    Unset { path: String },
    /// Add `by` to the number at `path`, or set it when the path is missing.
    Inc { path: String, by: Value },
}

impl UpdateOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Unset { path } | Self::Inc { path, .. } => path,
        }
    }
}

// =============================================================================
// Update
// =============================================================================

/// An ordered list of update operations applied to each matched document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset { path: path.into() });
        self
    }

    pub fn inc(mut self, path: impl Into<String>, by: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Inc {
            path: path.into(),
            by: by.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Paths touched by this update.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().map(UpdateOp::path)
    }

    /// Check the update itself before touching any document.
    pub fn check(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.ops.is_empty() {
            errors.push("Update has no operations".to_string());
        }

        for op in &self.ops {
            let path = op.path();
            if path.is_empty() || path.split('.').any(str::is_empty) {
                errors.push(format!("Invalid field path: '{}'", path));
            } else if path == "_id" || path.starts_with("_id.") {
                errors.push("Field '_id' cannot be updated".to_string());
            }
            if let UpdateOp::Inc { path, by } = op {
                if !by.is_number() {
                    errors.push(format!(
                        "Cannot increment '{}' by non-numeric {}",
                        path,
                        by.type_name()
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Apply every operation to `doc` in order.
    ///
    /// On error `doc` may be partially modified; callers apply updates to a
    /// copy and keep it only on success.
    pub fn apply(&self, doc: &mut Document) -> Result<(), String> {
        for op in &self.ops {
            match op {
                UpdateOp::Set { path, value } => {
                    doc.set_path(path, value.clone())
                        .map_err(|e| format!("Cannot set '{}': {}", path, e))?;
                }
                UpdateOp::Unset { path } => {
                    doc.remove_path(path);
                }
                UpdateOp::Inc { path, by } => {
                    let next = match doc.get(path) {
                        None => by.clone(),
                        Some(current) => add_numbers(current, by).ok_or_else(|| {
                            format!(
                                "Cannot increment '{}': field is {}",
                                path,
                                current.type_name()
                            )
                        })?,
                    };
                    doc.set_path(path, next)
                        .map_err(|e| format!("Cannot increment '{}': {}", path, e))?;
                }
            }
        }
        Ok(())
    }
}

fn add_numbers(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(
            x.checked_add(*y)
                .map(Value::Int)
                .unwrap_or(Value::Float(*x as f64 + *y as f64)),
        ),
        _ if a.is_number() && b.is_number() => Some(Value::Float(a.as_f64()? + b.as_f64()?)),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
