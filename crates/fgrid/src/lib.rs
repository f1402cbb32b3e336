#![forbid(unsafe_code)]

//! FrankenGrid public facade crate.
//!
//! [`ColumnModel`] is the entry point: hand it column definitions (typed or
//! JSON), then mutate visibility, pinning, width, order and group expansion.
//! After every change the model holds an up to date displayed tree for each
//! pinned section.
//!
//! ```
//! use fgrid::prelude::*;
//!
//! let mut model = ColumnModel::new(ColumnOptions::new());
//! model
//!     .set_column_defs_json(
//!         r#"[
//!             {"headerName": "Athlete", "groupId": "athlete", "children": [
//!                 {"field": "name"},
//!                 {"field": "age", "columnGroupShow": "open"}
//!             ]},
//!             {"field": "total", "pinned": "right"}
//!         ]"#,
//!     )
//!     .unwrap();
//! assert_eq!(model.displayed(PinnedSide::Right).leaves().len(), 1);
//!
//! model.set_group_expanded("athlete", true).unwrap();
//! assert_eq!(model.displayed_columns().len(), 3);
//! ```

pub mod error;
pub mod model;

pub use error::{GridError, Result};
pub use model::ColumnModel;

// --- Column re-exports -----------------------------------------------------

pub use fgrid_columns::{
    CollectingSink, ColDef, ColGroupDef, Column, ColumnDefinition, ColumnGroupShow, ColumnOptions,
    ColumnRef, ColumnSizing, ColumnTree, Diagnostic, DiagnosticSink, DisplayedGroup, DisplayedNode,
    DisplayedRef, DisplayedTree, EntityRef, EntityRegistry, GroupRef, NoopRegistry, PinnedSide,
    ProvidedGroup, RecordingRegistry, TracingSink, TreeNode,
};

/// Lower-level building blocks.
pub use fgrid_columns as columns;

pub mod prelude {
    pub use crate::{
        ColDef, ColGroupDef, ColumnDefinition, ColumnModel, ColumnOptions, GridError, PinnedSide,
    };
}
