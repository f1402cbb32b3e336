//! Displayed group reconciler.
//!
//! A displayed tree is rebuilt for one pinned section every time the
//! visible set or the column order changes. The visible leaves are walked
//! once, left to right. Each leaf's ancestor path is compared with the path
//! of the previously placed leaf: groups above the first differing depth
//! are shared, groups from that depth down are opened fresh, each with the
//! next instance number for its original group id.
//!
//! A freshly opened group reuses the matching group of the previous pass
//! when group id, instance number and original group all agree. A reused
//! group keeps its [`GroupInstanceUid`] and its `left` slot; only its
//! children and parent are rebuilt.
//!
//! ```text
//! original            visible [x1, y1, x2]       displayed
//!  X─x1,x2             y1 pinned center           X#0─x1
//!  P─y1                                           P#0─y1
//!                                                 X#1─x2
//! ```

use crate::def::PinnedSide;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::instance::GroupInstanceAllocator;
use crate::store::ColumnRef;
use crate::tree::{AncestorPath, ColumnTree, GroupRef, TreeStamp};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GROUP_UID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one displayed group object. Survives reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupInstanceUid(u64);

impl GroupInstanceUid {
    fn next() -> Self {
        Self(NEXT_GROUP_UID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a [`DisplayedGroup`] inside one [`DisplayedTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayedRef(u32);

impl DisplayedRef {
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DisplayedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayedNode {
    Column(ColumnRef),
    Group(DisplayedRef),
}

/// One visible occurrence of an original group.
#[derive(Debug, Clone)]
pub struct DisplayedGroup {
    tree: TreeStamp,
    original: GroupRef,
    group_id: String,
    instance: u32,
    padding: bool,
    children: Vec<DisplayedNode>,
    parent: Option<DisplayedRef>,
    pinned: PinnedSide,
    uid: GroupInstanceUid,
    left: Option<u32>,
}

impl DisplayedGroup {
    /// Original group this instance displays.
    #[must_use]
    pub fn original(&self) -> GroupRef {
        self.original
    }

    /// Stamp of the tree [`Self::original`] belongs to.
    #[must_use]
    pub fn original_tree(&self) -> TreeStamp {
        self.tree
    }

    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    #[must_use]
    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// `"{group_id}_{instance}"`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.group_id, self.instance)
    }

    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.padding
    }

    #[must_use]
    pub fn children(&self) -> &[DisplayedNode] {
        &self.children
    }

    #[must_use]
    pub fn parent(&self) -> Option<DisplayedRef> {
        self.parent
    }

    #[must_use]
    pub fn pinned(&self) -> PinnedSide {
        self.pinned
    }

    #[must_use]
    pub fn uid(&self) -> GroupInstanceUid {
        self.uid
    }

    /// Horizontal position, owned by layout.
    #[must_use]
    pub fn left(&self) -> Option<u32> {
        self.left
    }

    pub fn set_left(&mut self, left: Option<u32>) {
        self.left = left;
    }
}

/// Displayed groups and leaves of one pinned section.
#[derive(Debug, Clone)]
pub struct DisplayedTree {
    side: PinnedSide,
    tree: TreeStamp,
    groups: Vec<DisplayedGroup>,
    roots: Vec<DisplayedNode>,
    column_parents: FxHashMap<ColumnRef, Option<DisplayedRef>>,
}

impl DisplayedTree {
    /// An empty section tree for `side`, tied to the tree with `stamp`.
    #[must_use]
    pub fn new(side: PinnedSide, tree: TreeStamp) -> Self {
        Self {
            side,
            tree,
            groups: Vec::new(),
            roots: Vec::new(),
            column_parents: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn side(&self) -> PinnedSide {
        self.side
    }

    /// Stamp of the original tree this was reconciled against.
    #[must_use]
    pub fn tree_stamp(&self) -> TreeStamp {
        self.tree
    }

    #[must_use]
    pub fn roots(&self) -> &[DisplayedNode] {
        &self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[must_use]
    pub fn group(&self, handle: DisplayedRef) -> Option<&DisplayedGroup> {
        self.groups.get(handle.0 as usize)
    }

    pub fn group_mut(&mut self, handle: DisplayedRef) -> Option<&mut DisplayedGroup> {
        self.groups.get_mut(handle.0 as usize)
    }

    pub fn groups(&self) -> impl Iterator<Item = (DisplayedRef, &DisplayedGroup)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, group)| (DisplayedRef(index as u32), group))
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Displayed group with this original id and instance number.
    #[must_use]
    pub fn find(&self, group_id: &str, instance: u32) -> Option<DisplayedRef> {
        self.groups()
            .find(|(_, g)| g.instance == instance && g.group_id == group_id)
            .map(|(handle, _)| handle)
    }

    /// Enclosing displayed group of a leaf. `Some(None)` for a root leaf,
    /// `None` if the leaf is not displayed in this section.
    #[must_use]
    pub fn parent_of_column(&self, column: ColumnRef) -> Option<Option<DisplayedRef>> {
        self.column_parents.get(&column).copied()
    }

    /// Displayed leaves, left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<ColumnRef> {
        let mut out = Vec::with_capacity(self.column_parents.len());
        self.depth_first(|node, _| {
            if let DisplayedNode::Column(column) = node {
                out.push(column);
            }
        });
        out
    }

    /// Post-order walk, children before their group.
    pub fn depth_first(&self, mut visit: impl FnMut(DisplayedNode, Option<DisplayedRef>)) {
        self.walk(&self.roots, None, &mut visit);
    }

    fn walk(
        &self,
        nodes: &[DisplayedNode],
        parent: Option<DisplayedRef>,
        visit: &mut impl FnMut(DisplayedNode, Option<DisplayedRef>),
    ) {
        for &node in nodes {
            if let DisplayedNode::Group(group) = node {
                self.walk(&self.groups[group.0 as usize].children, Some(group), visit);
            }
            visit(node, parent);
        }
    }

    fn push(&mut self, group: DisplayedGroup) -> DisplayedRef {
        let handle = DisplayedRef(self.groups.len() as u32);
        self.groups.push(group);
        handle
    }

    fn attach(&mut self, parent: Option<DisplayedRef>, node: DisplayedNode) {
        match parent {
            Some(parent) => self.groups[parent.0 as usize].children.push(node),
            None => self.roots.push(node),
        }
    }

    fn assign_parents(&mut self) {
        let mut links = Vec::new();
        self.depth_first(|node, parent| links.push((node, parent)));
        self.column_parents.clear();
        for (node, parent) in links {
            match node {
                DisplayedNode::Group(group) => self.groups[group.0 as usize].parent = parent,
                DisplayedNode::Column(column) => {
                    self.column_parents.insert(column, parent);
                }
            }
        }
    }
}

/// Reconciles visible leaves against one original tree.
///
/// The allocator is borrowed so one pass over several sections shares a
/// single instance counter.
pub struct Reconciler<'a> {
    tree: &'a ColumnTree,
    allocator: &'a mut GroupInstanceAllocator,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        tree: &'a ColumnTree,
        allocator: &'a mut GroupInstanceAllocator,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            tree,
            allocator,
            sink,
        }
    }

    /// Build the displayed tree of `side` from `visible`, which must be in
    /// final left-to-right order. Groups of `previous` are moved into the
    /// result when they can be reused.
    pub fn reconcile(
        &mut self,
        visible: &[ColumnRef],
        side: PinnedSide,
        previous: Option<DisplayedTree>,
    ) -> DisplayedTree {
        let _span = tracing::debug_span!(
            "columns.reconcile",
            side = side.as_str(),
            visible = visible.len()
        )
        .entered();

        let stamp = self.tree.stamp();
        let mut lookup: FxHashMap<(String, u32), DisplayedGroup> = previous
            .into_iter()
            .flat_map(|tree| tree.groups)
            .map(|group| ((group.group_id.clone(), group.instance), group))
            .collect();

        let index = self.tree.ancestor_index();
        let mut out = DisplayedTree::new(side, stamp);
        let mut last_path: Option<&AncestorPath> = None;
        let mut open: SmallVec<[DisplayedRef; 4]> = SmallVec::new();
        let (mut reused, mut created, mut skipped) = (0usize, 0usize, 0usize);

        for &column in visible {
            let Some(path) = index.path(column, &mut *self.sink) else {
                skipped += 1;
                continue;
            };
            let diverge = last_path.map_or(0, |last| {
                last.iter()
                    .zip(path.iter())
                    .take_while(|(a, b)| a == b)
                    .count()
            });
            open.truncate(diverge);

            for &original in &path[diverge..] {
                let Some(group) = self.tree.group(original) else {
                    continue;
                };
                let instance = self.allocator.instance_for(group.id());
                let displayed = match lookup.remove(&(group.id().to_owned(), instance)) {
                    Some(mut prev) if prev.original == original && prev.tree == stamp => {
                        prev.children.clear();
                        prev.parent = None;
                        prev.pinned = side;
                        reused += 1;
                        prev
                    }
                    _ => {
                        created += 1;
                        DisplayedGroup {
                            tree: stamp,
                            original,
                            group_id: group.id().to_owned(),
                            instance,
                            padding: group.is_padding(),
                            children: Vec::new(),
                            parent: None,
                            pinned: side,
                            uid: GroupInstanceUid::next(),
                            left: None,
                        }
                    }
                };
                let handle = out.push(displayed);
                out.attach(open.last().copied(), DisplayedNode::Group(handle));
                open.push(handle);
            }

            out.attach(open.last().copied(), DisplayedNode::Column(column));
            last_path = Some(path);
        }

        out.assign_parents();
        tracing::debug!(
            message = "columns.reconciled",
            groups = out.group_count(),
            reused,
            created,
            skipped
        );
        out
    }
}

/// Reconcile with a fresh allocator and the tracing sink.
pub fn reconcile(
    visible: &[ColumnRef],
    tree: &ColumnTree,
    side: PinnedSide,
    previous: Option<DisplayedTree>,
) -> DisplayedTree {
    let mut allocator = GroupInstanceAllocator::new();
    let mut sink = TracingSink;
    Reconciler::new(tree, &mut allocator, &mut sink).reconcile(visible, side, previous)
}
