//! Recoverable problems found while building or reconciling column trees.
//!
//! Nothing here aborts processing. Configuration warnings mean a fragment
//! was skipped; a structural diagnostic means the caller handed the engine
//! something inconsistent and the affected leaf was left out.

use crate::store::ColumnRef;
use std::fmt;

/// Tracing target used for every diagnostic.
pub const TARGET: &str = "fgrid::columns";

/// A single recoverable problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A definition references a column type that is not configured.
    UnknownColumnType { name: String },
    /// The `type` field is neither a string nor an array of strings.
    InvalidColumnType { value: String },
    /// A configured column type tries to replace a built-in one.
    BuiltinColumnTypeOverride { name: String },
    /// A deprecated definition key was found.
    DeprecatedField {
        field: &'static str,
        replacement: Option<&'static str>,
    },
    /// An explicit column id was already taken and a suffixed one was used.
    DuplicateColumnId { requested: String, assigned: String },
    /// An explicit group id was already taken and a suffixed one was used.
    DuplicateGroupId { requested: String, assigned: String },
    /// A leaf could not be found in the original tree.
    ColumnNotInTree { column: ColumnRef },
}

impl Diagnostic {
    /// Whether this signals a bug in the caller rather than bad configuration.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::ColumnNotInTree { .. })
    }

    /// Short machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownColumnType { .. } => "unknown_column_type",
            Self::InvalidColumnType { .. } => "invalid_column_type",
            Self::BuiltinColumnTypeOverride { .. } => "builtin_column_type_override",
            Self::DeprecatedField { .. } => "deprecated_field",
            Self::DuplicateColumnId { .. } => "duplicate_column_id",
            Self::DuplicateGroupId { .. } => "duplicate_group_id",
            Self::ColumnNotInTree { .. } => "column_not_in_tree",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumnType { name } => {
                write!(f, "column type '{name}' is not defined in the column types")
            }
            Self::InvalidColumnType { value } => {
                write!(f, "column type should be a string or an array of strings, got {value}")
            }
            Self::BuiltinColumnTypeOverride { name } => {
                write!(f, "column type '{name}' is built in and cannot be overridden")
            }
            Self::DeprecatedField {
                field,
                replacement: Some(replacement),
            } => write!(f, "'{field}' is deprecated, use '{replacement}' instead"),
            Self::DeprecatedField {
                field,
                replacement: None,
            } => write!(f, "'{field}' is no longer supported and is ignored"),
            Self::DuplicateColumnId {
                requested,
                assigned,
            } => write!(f, "column id '{requested}' is already in use, assigned '{assigned}'"),
            Self::DuplicateGroupId {
                requested,
                assigned,
            } => write!(f, "group id '{requested}' is already in use, assigned '{assigned}'"),
            Self::ColumnNotInTree { column } => {
                write!(f, "column {column} is not reachable from the column tree")
            }
        }
    }
}

/// Receives diagnostics as they are produced.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        emit(&diagnostic);
    }
}

/// Keeps diagnostics for later inspection, logging each one too.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics in the order they were reported.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Remove and return everything collected so far.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Whether any diagnostic of `kind` was reported.
    #[must_use]
    pub fn has_kind(&self, kind: &str) -> bool {
        self.diagnostics.iter().any(|d| d.kind() == kind)
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        emit(&diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

fn emit(diagnostic: &Diagnostic) {
    if diagnostic.is_structural() {
        tracing::warn!(
            target: TARGET,
            kind = diagnostic.kind(),
            structural = true,
            "{diagnostic}"
        );
    } else {
        tracing::warn!(target: TARGET, kind = diagnostic.kind(), "{diagnostic}");
    }
}
