//! Construction-time invariant checks.
//!
//! Checks accumulate every violation before failing so that a caller sees all
//! problems with an entity at once instead of fixing them one at a time.

use std::fmt;

use uuid::Uuid;

/// One broken invariant on an entity under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The file extension is not one the entity accepts.
    Extension { expected: String, found: String },
    /// A required text field is empty.
    EmptyField { field: &'static str },
    /// A field disagrees with the same field on the entity it was derived from.
    Mismatch {
        field: &'static str,
        entity_id: Uuid,
        entity_value: String,
        source_id: Uuid,
        source_value: String,
    },
    /// A required field is absent.
    MissingField { field: &'static str },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Extension { expected, found } => {
                write!(f, "extension must be {} but was `{}`", expected, found)
            }
            Violation::EmptyField { field } => write!(f, "{} must not be empty", field),
            Violation::Mismatch {
                field,
                entity_id,
                entity_value,
                source_id,
                source_value,
            } => write!(
                f,
                "{} `{}` of {} does not match {} `{}` of source {}",
                field, entity_value, entity_id, field, source_value, source_id
            ),
            Violation::MissingField { field } => write!(f, "{} is required", field),
        }
    }
}

/// Accumulator for violations found while validating one entity.
#[derive(Debug, Default)]
pub struct Violations {
    found: Vec<Violation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.found.push(violation);
    }

    /// Record `violation` when `ok` is false.
    pub fn check(&mut self, ok: bool, violation: impl FnOnce() -> Violation) {
        if !ok {
            self.push(violation());
        }
    }

    pub fn require_non_empty(&mut self, field: &'static str, value: &str) {
        self.check(!value.is_empty(), || Violation::EmptyField { field });
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.found
    }

    /// Finish validation: the value if nothing was recorded, every violation otherwise.
    pub fn finish<T>(self, value: T) -> Result<T, Vec<Violation>> {
        if self.found.is_empty() {
            Ok(value)
        } else {
            Err(self.found)
        }
    }
}

/// Render a violation list as one line for errors and logs.
pub fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
