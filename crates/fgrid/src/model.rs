//! Column model: owns the leaf arena, the original tree and the three
//! displayed section trees, and keeps them in sync.
//!
//! Every state change ends in [`ColumnModel::refresh`]: one instance
//! allocator is shared by the left, center and right sections, in that
//! order, and each section is reconciled against its previous displayed
//! tree so unchanged groups keep their identity.

use crate::error::{GridError, Result};
use fgrid_columns::{
    Column, ColumnDefinition, ColumnOptions, ColumnRef, ColumnStore, ColumnTree, ColumnTreeFactory,
    DiagnosticSink, DisplayedTree, EntityRegistry, GroupInstanceAllocator, NoopRegistry,
    PinnedSide, Reconciler, TracingSink,
};

fn section(side: PinnedSide) -> usize {
    match side {
        PinnedSide::Left => 0,
        PinnedSide::Center => 1,
        PinnedSide::Right => 2,
    }
}

/// Column state of one grid.
pub struct ColumnModel<S = TracingSink, R = NoopRegistry> {
    options: ColumnOptions,
    sink: S,
    registry: R,
    store: ColumnStore,
    tree: ColumnTree,
    order: Vec<ColumnRef>,
    displayed: [DisplayedTree; 3],
}

impl ColumnModel {
    /// An empty model. Diagnostics go to `tracing`.
    #[must_use]
    pub fn new(options: ColumnOptions) -> Self {
        let mut sink = TracingSink;
        let mut registry = NoopRegistry;
        let mut store = ColumnStore::new();
        let tree = ColumnTreeFactory::new(&options, &mut sink, &mut registry)
            .build_tree(&mut store, &[], true, None);
        let stamp = tree.stamp();
        Self {
            options,
            sink,
            registry,
            store,
            tree,
            order: Vec::new(),
            displayed: PinnedSide::ALL.map(|side| DisplayedTree::new(side, stamp)),
        }
    }

    /// An empty model whose sizing comes from `FGRID_COLUMN_*`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ColumnOptions::from_env())
    }

    /// Parse [`ColumnOptions`] from JSON and build an empty model.
    pub fn from_options_json(json: &str) -> Result<Self> {
        let options =
            ColumnOptions::from_json(json).map_err(|source| GridError::InvalidOptions { source })?;
        Ok(Self::new(options))
    }
}

impl<S: DiagnosticSink, R: EntityRegistry> ColumnModel<S, R> {
    /// Send diagnostics to `sink` instead.
    #[must_use]
    pub fn with_diagnostics<T: DiagnosticSink>(self, sink: T) -> ColumnModel<T, R> {
        ColumnModel {
            options: self.options,
            sink,
            registry: self.registry,
            store: self.store,
            tree: self.tree,
            order: self.order,
            displayed: self.displayed,
        }
    }

    /// Register new columns and groups with `registry`.
    #[must_use]
    pub fn with_registry<T: EntityRegistry>(self, registry: T) -> ColumnModel<S, T> {
        ColumnModel {
            options: self.options,
            sink: self.sink,
            registry,
            store: self.store,
            tree: self.tree,
            order: self.order,
            displayed: self.displayed,
        }
    }

    /// Replace the column definitions.
    ///
    /// Current leaves are offered for reuse and groups keep their expanded
    /// state by `groupId`. Leaves that no definition matched are released.
    /// The column order is reset to the order of the definitions.
    pub fn set_column_defs(&mut self, defs: &[ColumnDefinition]) {
        let existing = self.tree.leaves();
        let tree = ColumnTreeFactory::new(&self.options, &mut self.sink, &mut self.registry)
            .carry_expanded_from(&self.tree)
            .build_tree(&mut self.store, defs, true, Some(existing.as_slice()));

        let released = self.store.retain_in(&tree);
        for column in &released {
            self.registry.release(column);
        }
        tracing::debug!(
            message = "columns.defs_applied",
            columns = tree.leaves().len(),
            released = released.len()
        );

        self.tree = tree;
        self.order = self.tree.leaves();
        self.refresh();
    }

    /// [`Self::set_column_defs`] from a JSON array of definitions.
    pub fn set_column_defs_json(&mut self, json: &str) -> Result<()> {
        let defs: Vec<ColumnDefinition> = serde_json::from_str(json)?;
        self.set_column_defs(&defs);
        Ok(())
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        self.column_mut(id)?.set_visible(visible);
        self.refresh();
        Ok(())
    }

    pub fn set_column_pinned(&mut self, id: &str, side: PinnedSide) -> Result<()> {
        self.column_mut(id)?.set_pinned(side);
        self.refresh();
        Ok(())
    }

    /// Resize a column. Returns the width after clamping.
    pub fn set_column_width(&mut self, id: &str, width: u32) -> Result<u32> {
        let sizing = self.options.sizing;
        let column = self.column_mut(id)?;
        column.set_width(width, &sizing);
        let applied = column.width();
        self.refresh();
        Ok(applied)
    }

    /// Move a column to `index` in the column order (clamped to the end).
    pub fn move_column(&mut self, id: &str, index: usize) -> Result<()> {
        let handle = self.column_ref(id)?;
        self.order.retain(|c| *c != handle);
        let index = index.min(self.order.len());
        self.order.insert(index, handle);
        self.refresh();
        Ok(())
    }

    pub fn set_group_expanded(&mut self, group_id: &str, expanded: bool) -> Result<()> {
        let handle = self
            .tree
            .find_group(group_id)
            .ok_or_else(|| GridError::group_not_found(group_id))?;
        if let Some(group) = self.tree.group_mut(handle) {
            group.set_expanded(expanded);
        }
        self.refresh();
        Ok(())
    }

    /// Rebuild the displayed trees of all three sections.
    pub fn refresh(&mut self) {
        self.tree.refresh_expandable(&self.store);

        let mut allocator = GroupInstanceAllocator::new();
        let mut reconciler = Reconciler::new(&self.tree, &mut allocator, &mut self.sink);
        for side in PinnedSide::ALL {
            let visible: Vec<ColumnRef> = self
                .order
                .iter()
                .copied()
                .filter(|c| self.store.get(*c).is_some_and(|col| col.pinned() == side))
                .filter(|c| self.tree.is_column_displayable(&self.store, *c))
                .collect();
            let slot = &mut self.displayed[section(side)];
            let previous = std::mem::replace(slot, DisplayedTree::new(side, self.tree.stamp()));
            *slot = reconciler.reconcile(&visible, side, Some(previous));
        }

        tracing::debug!(
            message = "columns.refreshed",
            left = self.displayed[0].leaves().len(),
            center = self.displayed[1].leaves().len(),
            right = self.displayed[2].leaves().len()
        );
    }

    fn column_ref(&self, id: &str) -> Result<ColumnRef> {
        self.store
            .find_by_id(id)
            .ok_or_else(|| GridError::column_not_found(id))
    }

    fn column_mut(&mut self, id: &str) -> Result<&mut Column> {
        let handle = self.column_ref(id)?;
        self.store
            .get_mut(handle)
            .ok_or_else(|| GridError::column_not_found(id))
    }

    #[must_use]
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.store.find_by_id(id).and_then(|handle| self.store.get(handle))
    }

    /// Handle of the column with `id`.
    #[must_use]
    pub fn column_handle(&self, id: &str) -> Option<ColumnRef> {
        self.store.find_by_id(id)
    }

    /// All columns in column order, hidden ones included.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.order.iter().filter_map(|handle| self.store.get(*handle))
    }

    #[must_use]
    pub fn order(&self) -> &[ColumnRef] {
        &self.order
    }

    #[must_use]
    pub fn tree(&self) -> &ColumnTree {
        &self.tree
    }

    #[must_use]
    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    #[must_use]
    pub fn displayed(&self, side: PinnedSide) -> &DisplayedTree {
        &self.displayed[section(side)]
    }

    /// Mutable access for layout, which owns the `left` slot of groups.
    pub fn displayed_mut(&mut self, side: PinnedSide) -> &mut DisplayedTree {
        &mut self.displayed[section(side)]
    }

    /// Displayed leaves of the left, center and right sections, in order.
    #[must_use]
    pub fn displayed_columns(&self) -> Vec<ColumnRef> {
        self.displayed.iter().flat_map(DisplayedTree::leaves).collect()
    }

    #[must_use]
    pub fn options(&self) -> &ColumnOptions {
        &self.options
    }

    #[must_use]
    pub fn diagnostics(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }
}
