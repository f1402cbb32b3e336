//! The balanced "original" column tree and its traversal utilities.
//!
//! Groups live in the tree's own arena and are addressed by [`GroupRef`];
//! leaves live in the [`ColumnStore`] and are addressed by [`ColumnRef`].
//! Every tree carries a process-unique [`TreeStamp`], so a
//! `(TreeStamp, GroupRef)` pair names one original group even after the
//! definitions are rebuilt and group indices are reused.
//!
//! # Traversal
//!
//! [`ColumnTree::depth_first`] visits the children of a group before the
//! group itself (post-order), passing each node together with its parent.
//! [`ColumnTree::ancestor_path`] walks the tree once and returns the chain
//! of enclosing groups for a leaf, or `None` (with a structural diagnostic)
//! if the leaf is not in the tree.

use crate::def::{ColGroupDef, ColumnGroupShow};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::store::{ColumnRef, ColumnStore};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TREE_STAMP: AtomicU64 = AtomicU64::new(1);

/// Identity of one built tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeStamp(u64);

impl TreeStamp {
    fn next() -> Self {
        Self(NEXT_TREE_STAMP.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a [`ProvidedGroup`] inside one [`ColumnTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupRef(u32);

impl GroupRef {
    #[must_use]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// A child slot of the original tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeNode {
    Column(ColumnRef),
    Group(GroupRef),
}

/// Enclosing groups of a leaf, outermost first.
pub type AncestorPath = SmallVec<[GroupRef; 4]>;

/// One level of grouping in the original tree, real or padding.
#[derive(Debug, Clone)]
pub struct ProvidedGroup {
    id: String,
    def: ColGroupDef,
    children: Vec<TreeNode>,
    level: usize,
    padding: bool,
    original_parent: Option<GroupRef>,
    expanded: bool,
    expandable: bool,
}

impl ProvidedGroup {
    pub(crate) fn real(id: String, def: ColGroupDef, level: usize) -> Self {
        let expanded = def.open_by_default.unwrap_or(false);
        Self {
            id,
            def,
            children: Vec::new(),
            level,
            padding: false,
            original_parent: None,
            expanded,
            expandable: false,
        }
    }

    pub(crate) fn padding(id: String, level: usize) -> Self {
        Self {
            id,
            def: ColGroupDef::default(),
            children: Vec::new(),
            level,
            padding: true,
            original_parent: None,
            expanded: false,
            expandable: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merged group definition; empty for padding groups.
    #[must_use]
    pub fn def(&self) -> &ColGroupDef {
        &self.def
    }

    #[must_use]
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Depth of this group, 0 for groups at the root.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.padding
    }

    #[must_use]
    pub fn original_parent(&self) -> Option<GroupRef> {
        self.original_parent
    }

    #[must_use]
    pub fn header_name(&self) -> Option<&str> {
        self.def.header_name.as_deref()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Expand or collapse. Padding groups stay collapsed.
    pub fn set_expanded(&mut self, expanded: bool) {
        if !self.padding {
            self.expanded = expanded;
        }
    }

    /// Whether expanding or collapsing changes which children show.
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    pub(crate) fn set_children(&mut self, children: Vec<TreeNode>) {
        self.children = children;
    }

    pub(crate) fn push_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    pub(crate) fn take_children(&mut self) -> Vec<TreeNode> {
        std::mem::take(&mut self.children)
    }
}

/// The balanced original tree built from one definitions list.
#[derive(Debug, Clone)]
pub struct ColumnTree {
    stamp: TreeStamp,
    groups: Vec<ProvidedGroup>,
    roots: Vec<TreeNode>,
    leaf_parents: FxHashMap<ColumnRef, Option<GroupRef>>,
    max_depth: usize,
    primary: bool,
}

impl ColumnTree {
    pub(crate) fn new(primary: bool) -> Self {
        Self {
            stamp: TreeStamp::next(),
            groups: Vec::new(),
            roots: Vec::new(),
            leaf_parents: FxHashMap::default(),
            max_depth: 0,
            primary,
        }
    }

    pub(crate) fn push_group(&mut self, group: ProvidedGroup) -> GroupRef {
        let handle = GroupRef(self.groups.len() as u32);
        self.groups.push(group);
        handle
    }

    pub(crate) fn group_slot(&mut self, handle: GroupRef) -> &mut ProvidedGroup {
        &mut self.groups[handle.0 as usize]
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<TreeNode>) {
        self.roots = roots;
    }

    pub(crate) fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    #[must_use]
    pub fn stamp(&self) -> TreeStamp {
        self.stamp
    }

    /// Top level of the tree.
    #[must_use]
    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    /// Number of group levels; every leaf sits at this depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    #[must_use]
    pub fn group(&self, handle: GroupRef) -> Option<&ProvidedGroup> {
        self.groups.get(handle.0 as usize)
    }

    pub fn group_mut(&mut self, handle: GroupRef) -> Option<&mut ProvidedGroup> {
        self.groups.get_mut(handle.0 as usize)
    }

    /// Every group with its handle, in creation order.
    pub fn groups(&self) -> impl Iterator<Item = (GroupRef, &ProvidedGroup)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, group)| (GroupRef(index as u32), group))
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Find a group by its allocated id.
    #[must_use]
    pub fn find_group(&self, id: &str) -> Option<GroupRef> {
        self.groups()
            .find(|(_, group)| group.id() == id)
            .map(|(handle, _)| handle)
    }

    #[must_use]
    pub fn contains_column(&self, column: ColumnRef) -> bool {
        self.leaf_parents.contains_key(&column)
    }

    /// Direct parent of a leaf, `Some(None)` for a leaf at the root.
    #[must_use]
    pub fn column_parent(&self, column: ColumnRef) -> Option<Option<GroupRef>> {
        self.leaf_parents.get(&column).copied()
    }

    /// Leaves in left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<ColumnRef> {
        let mut out = Vec::with_capacity(self.leaf_parents.len());
        self.collect_leaves(&self.roots, &mut out);
        out
    }

    fn collect_leaves(&self, nodes: &[TreeNode], out: &mut Vec<ColumnRef>) {
        for node in nodes {
            match *node {
                TreeNode::Column(column) => out.push(column),
                TreeNode::Group(group) => self.collect_leaves(&self.groups[group.0 as usize].children, out),
            }
        }
    }

    /// Post-order depth-first walk: a group's subtree is visited before
    /// the group itself. `visit` receives each node and its parent.
    pub fn depth_first(&self, mut visit: impl FnMut(TreeNode, Option<GroupRef>)) {
        self.walk(&self.roots, None, &mut visit);
    }

    fn walk(
        &self,
        nodes: &[TreeNode],
        parent: Option<GroupRef>,
        visit: &mut impl FnMut(TreeNode, Option<GroupRef>),
    ) {
        for &node in nodes {
            if let TreeNode::Group(group) = node {
                self.walk(&self.groups[group.0 as usize].children, Some(group), visit);
            }
            visit(node, parent);
        }
    }

    /// Chain of groups from the root down to `column`.
    ///
    /// Returns `None` and reports [`Diagnostic::ColumnNotInTree`] when the
    /// leaf is not part of this tree. A correctly built tree reaches every
    /// one of its leaves, so `None` means the caller passed a foreign leaf.
    pub fn ancestor_path(
        &self,
        column: ColumnRef,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<AncestorPath> {
        let mut path = AncestorPath::new();
        if self.find_path(&self.roots, column, &mut path) {
            Some(path)
        } else {
            sink.report(Diagnostic::ColumnNotInTree { column });
            None
        }
    }

    fn find_path(&self, nodes: &[TreeNode], target: ColumnRef, path: &mut AncestorPath) -> bool {
        for node in nodes {
            match *node {
                TreeNode::Column(column) if column == target => return true,
                TreeNode::Column(_) => {}
                TreeNode::Group(group) => {
                    path.push(group);
                    if self.find_path(&self.groups[group.0 as usize].children, target, path) {
                        return true;
                    }
                    path.pop();
                }
            }
        }
        false
    }

    /// Ancestor paths of every leaf, computed in a single walk.
    #[must_use]
    pub fn ancestor_index(&self) -> AncestorIndex {
        let mut index = AncestorIndex {
            paths: FxHashMap::default(),
        };
        let mut path = AncestorPath::new();
        self.index_paths(&self.roots, &mut path, &mut index);
        index
    }

    fn index_paths(&self, nodes: &[TreeNode], path: &mut AncestorPath, index: &mut AncestorIndex) {
        for node in nodes {
            match *node {
                TreeNode::Column(column) => {
                    index.paths.insert(column, path.clone());
                }
                TreeNode::Group(group) => {
                    path.push(group);
                    self.index_paths(&self.groups[group.0 as usize].children, path, index);
                    path.pop();
                }
            }
        }
    }

    /// Record parent links on every group and leaf. Must run after
    /// balancing, which rewires parent/child relationships.
    pub(crate) fn assign_parents(&mut self, store: &mut ColumnStore) {
        let mut links = Vec::new();
        self.depth_first(|node, parent| links.push((node, parent)));
        self.leaf_parents.clear();
        for (node, parent) in links {
            match node {
                TreeNode::Group(group) => self.groups[group.0 as usize].original_parent = parent,
                TreeNode::Column(column) => {
                    self.leaf_parents.insert(column, parent);
                    if let Some(col) = store.get_mut(column) {
                        col.set_original_parent(parent);
                    }
                }
            }
        }
    }

    /// Recompute `expandable` for every group from current leaf visibility.
    pub fn refresh_expandable(&mut self, store: &ColumnStore) {
        let mut order = Vec::with_capacity(self.groups.len());
        self.depth_first(|node, _| {
            if let TreeNode::Group(group) = node {
                order.push(group);
            }
        });

        // Post-order guarantees child groups are resolved before parents.
        let mut visible = vec![false; self.groups.len()];
        for &group in &order {
            let idx = group.0 as usize;
            let any_visible = self.groups[idx].children.iter().any(|child| match *child {
                TreeNode::Column(column) => store.get(column).is_some_and(|c| c.is_visible()),
                TreeNode::Group(g) => visible[g.0 as usize],
            });
            visible[idx] = any_visible;
        }

        for &group in &order {
            let idx = group.0 as usize;
            if self.groups[idx].padding {
                self.groups[idx].expandable = false;
                continue;
            }
            let mut shows_when_open = false;
            let mut shows_when_closed = false;
            let mut changeable = false;
            for child in self.children_removing_padding(group) {
                let (child_visible, show) = match child {
                    TreeNode::Column(column) => match store.get(column) {
                        Some(c) => (c.is_visible(), c.column_group_show()),
                        None => (false, None),
                    },
                    TreeNode::Group(g) => (
                        visible[g.0 as usize],
                        self.groups[g.0 as usize].def.column_group_show,
                    ),
                };
                if !child_visible {
                    continue;
                }
                match show {
                    Some(ColumnGroupShow::Open) => {
                        shows_when_open = true;
                        changeable = true;
                    }
                    Some(ColumnGroupShow::Closed) => {
                        shows_when_closed = true;
                        changeable = true;
                    }
                    None => {
                        shows_when_open = true;
                        shows_when_closed = true;
                    }
                }
            }
            self.groups[idx].expandable = shows_when_open && shows_when_closed && changeable;
        }
    }

    /// Children of `group`, looking through nested padding groups.
    #[must_use]
    pub fn children_removing_padding(&self, group: GroupRef) -> Vec<TreeNode> {
        let mut out = Vec::new();
        if let Some(g) = self.group(group) {
            self.push_unpadded(&g.children, &mut out);
        }
        out
    }

    fn push_unpadded(&self, nodes: &[TreeNode], out: &mut Vec<TreeNode>) {
        for &node in nodes {
            match node {
                TreeNode::Group(g) if self.groups[g.0 as usize].padding => {
                    self.push_unpadded(&self.groups[g.0 as usize].children, out);
                }
                other => out.push(other),
            }
        }
    }

    /// Whether a visible leaf survives the expand/collapse state of its
    /// real ancestors. Padding groups are transparent.
    #[must_use]
    pub fn is_column_displayable(&self, store: &ColumnStore, column: ColumnRef) -> bool {
        let Some(col) = store.get(column) else {
            return false;
        };
        if !col.is_visible() {
            return false;
        }
        let Some(mut parent) = self.column_parent(column) else {
            return false;
        };
        let mut show = col.column_group_show();
        loop {
            while let Some(g) = parent {
                let group = &self.groups[g.0 as usize];
                if !group.padding {
                    break;
                }
                parent = group.original_parent;
            }
            let Some(g) = parent else {
                return true;
            };
            let group = &self.groups[g.0 as usize];
            if group.expandable {
                match show {
                    Some(ColumnGroupShow::Open) if !group.expanded => return false,
                    Some(ColumnGroupShow::Closed) if group.expanded => return false,
                    _ => {}
                }
            }
            show = group.def.column_group_show;
            parent = group.original_parent;
        }
    }
}

/// Precomputed ancestor paths, keyed by leaf.
#[derive(Debug, Clone, Default)]
pub struct AncestorIndex {
    paths: FxHashMap<ColumnRef, AncestorPath>,
}

impl AncestorIndex {
    /// Path of `column`, reporting a structural diagnostic when missing.
    pub fn path(&self, column: ColumnRef, sink: &mut dyn DiagnosticSink) -> Option<&AncestorPath> {
        let path = self.paths.get(&column);
        if path.is_none() {
            sink.report(Diagnostic::ColumnNotInTree { column });
        }
        path
    }
}
