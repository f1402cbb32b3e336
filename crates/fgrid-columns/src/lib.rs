#![forbid(unsafe_code)]

//! Column tree construction and displayed-group reconciliation.
//!
//! Column definitions go through two trees:
//!
//! - [`ColumnTree`]: the balanced original tree, built once per definitions
//!   update by [`ColumnTreeFactory`]. Every leaf sits at the same depth;
//!   padding groups fill the gaps. Leaves live in a [`ColumnStore`] and keep
//!   their [`ColumnRef`] across rebuilds when they match.
//! - [`DisplayedTree`]: one per pinned section, rebuilt by [`Reconciler`]
//!   whenever visibility or order changes. Displayed groups from the
//!   previous pass are reused when they still describe the same group
//!   instance.
//!
//! Configuration problems never abort a build. They are reported as
//! [`Diagnostic`]s to a [`DiagnosticSink`]; [`TracingSink`] forwards them
//! to `tracing`.

pub mod config;
pub mod def;
pub mod diagnostics;
pub mod displayed;
pub mod factory;
pub mod instance;
pub mod key;
pub mod lifecycle;
pub mod merge;
pub mod store;
pub mod tree;

pub use config::{ColumnConfig, ColumnOptions, ColumnSizing};
pub use def::{ColDef, ColGroupDef, ColumnDefinition, ColumnGroupShow, ColumnTypeRef, PinnedSide};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use displayed::{
    DisplayedGroup, DisplayedNode, DisplayedRef, DisplayedTree, GroupInstanceUid, Reconciler,
    reconcile,
};
pub use factory::{ColumnTreeFactory, build_tree};
pub use instance::GroupInstanceAllocator;
pub use key::ColumnKeyCreator;
pub use lifecycle::{EntityRef, EntityRegistry, NoopRegistry, RecordingRegistry};
pub use merge::DefinitionMerger;
pub use store::{Column, ColumnRef, ColumnStore};
pub use tree::{AncestorIndex, AncestorPath, ColumnTree, GroupRef, ProvidedGroup, TreeNode, TreeStamp};
