//! Definition merge policy.
//!
//! Effective leaf definition, lowest to highest precedence:
//!
//! 1. the grid-wide default leaf definition
//! 2. named column types referenced by `type`, in listed order
//! 3. the definition as the caller wrote it
//!
//! Unknown or malformed type references are reported and skipped. A few
//! deprecated keys are remapped or reported on the merged result; none of
//! this ever aborts the build.

use crate::config::ColumnConfig;
use crate::def::{ColDef, ColGroupDef, ColumnTypeRef};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Column types every grid knows about.
pub const NUMERIC_COLUMN: &str = "numericColumn";
pub const RIGHT_ALIGNED: &str = "rightAligned";

/// Keys that are only reported, with no replacement.
const UNSUPPORTED_KEYS: [&str; 3] = ["headerGroup", "headerGroupShow", "group"];

fn builtin_types() -> BTreeMap<String, ColDef> {
    let mut types = BTreeMap::new();
    types.insert(
        NUMERIC_COLUMN.to_owned(),
        ColDef::new()
            .with_extra("headerClass", json!("fgrid-numeric-header"))
            .with_extra("cellClass", json!("fgrid-numeric-cell")),
    );
    types.insert(
        RIGHT_ALIGNED.to_owned(),
        ColDef::new()
            .with_extra("headerClass", json!("fgrid-right-aligned-header"))
            .with_extra("cellClass", json!("fgrid-right-aligned-cell")),
    );
    types
}

/// Merges definitions against one configuration snapshot.
///
/// Column types are resolved once at construction (built-ins plus the
/// configured ones), so a conflicting type name is reported once per
/// build rather than once per column.
#[derive(Debug, Clone)]
pub struct DefinitionMerger<'a> {
    default_leaf: Option<&'a ColDef>,
    default_group: Option<&'a ColGroupDef>,
    types: BTreeMap<String, ColDef>,
}

impl<'a> DefinitionMerger<'a> {
    pub fn new(config: &'a dyn ColumnConfig, sink: &mut dyn DiagnosticSink) -> Self {
        let mut types = builtin_types();
        for (name, def) in config.column_types() {
            if types.contains_key(name) {
                sink.report(Diagnostic::BuiltinColumnTypeOverride { name: name.clone() });
            } else {
                types.insert(name.clone(), def.clone());
            }
        }
        Self {
            default_leaf: config.default_leaf_definition(),
            default_group: config.default_group_definition(),
            types,
        }
    }

    /// Effective definition of a leaf.
    pub fn merge_leaf(&self, user: &ColDef, sink: &mut dyn DiagnosticSink) -> ColDef {
        let mut merged = self.default_leaf.cloned().unwrap_or_default();

        let type_ref = user
            .col_type
            .as_ref()
            .or_else(|| self.default_leaf.and_then(|d| d.col_type.as_ref()));
        if let Some(type_ref) = type_ref {
            self.apply_types(type_ref, &mut merged, sink);
        }

        merged.overlay(user);
        check_deprecated(&mut merged, sink);
        merged
    }

    /// Effective definition of a real group.
    #[must_use]
    pub fn merge_group(&self, user: &ColGroupDef) -> ColGroupDef {
        let mut merged = self.default_group.cloned().unwrap_or_default();
        merged.overlay(user);
        merged
    }

    fn apply_types(&self, type_ref: &ColumnTypeRef, merged: &mut ColDef, sink: &mut dyn DiagnosticSink) {
        let names = match type_ref {
            ColumnTypeRef::Names(names) => names,
            ColumnTypeRef::Invalid(value) => {
                sink.report(Diagnostic::InvalidColumnType {
                    value: value.to_string(),
                });
                return;
            }
        };
        for name in names {
            let key = name.trim();
            if key.is_empty() {
                continue;
            }
            match self.types.get(key) {
                Some(fragment) => merged.overlay(fragment),
                None => sink.report(Diagnostic::UnknownColumnType {
                    name: key.to_owned(),
                }),
            }
        }
    }
}

/// Remap or report deprecated keys on a merged leaf definition.
pub fn check_deprecated(def: &mut ColDef, sink: &mut dyn DiagnosticSink) {
    if let Some(value) = def.extra.remove("displayName") {
        sink.report(Diagnostic::DeprecatedField {
            field: "displayName",
            replacement: Some("headerName"),
        });
        if let Value::String(name) = value {
            def.header_name = Some(name);
        }
    }
    for key in UNSUPPORTED_KEYS {
        if def.extra.contains_key(key) {
            sink.report(Diagnostic::DeprecatedField {
                field: key,
                replacement: None,
            });
        }
    }
}
