//! Column tree factory: definitions in, balanced original tree out.
//!
//! # Phases
//!
//! 1. Seed the key allocator with the ids of the leaves offered for reuse.
//! 2. Walk the definitions, merging each one and either reusing a matching
//!    leaf (mutated in place, removed from the reuse pool) or creating a new
//!    one. Groups get fresh ids. The result is unbalanced.
//! 3. `max_depth` is the number of group levels on the deepest branch.
//! 4. Balance: wrap leaves in padding groups until every leaf sits at
//!    `max_depth`.
//! 5. Assign parent links and expand/collapse bookkeeping. This runs after
//!    balancing on purpose, since padding changes who parents whom.
//!
//! # Padding rule
//!
//! When a level holds at least one real group, every bare leaf on that
//! level gets its own padding chain. When the level holds only leaves, one
//! chain is created and all of them become children of its innermost group.
//!
//! ```text
//! [A, B{b1, b2}]        [A, B, C]         [X{x1}, Y]
//!  pad─A   B─b1,b2       (depth 0,          X─x1   pad─Y
//!                         untouched)
//! ```

use crate::config::{ColumnConfig, ColumnSizing};
use crate::def::{ColDef, ColGroupDef, ColumnDefinition};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::key::ColumnKeyCreator;
use crate::lifecycle::{EntityRef, EntityRegistry, NoopRegistry};
use crate::merge::DefinitionMerger;
use crate::store::{Column, ColumnRef, ColumnStore};
use crate::tree::{ColumnTree, GroupRef, ProvidedGroup, TreeNode};
use rustc_hash::FxHashMap;

/// Builds original trees against one configuration source.
pub struct ColumnTreeFactory<'a> {
    config: &'a dyn ColumnConfig,
    sink: &'a mut dyn DiagnosticSink,
    registry: &'a mut dyn EntityRegistry,
    previous: Option<&'a ColumnTree>,
}

impl<'a> ColumnTreeFactory<'a> {
    pub fn new(
        config: &'a dyn ColumnConfig,
        sink: &'a mut dyn DiagnosticSink,
        registry: &'a mut dyn EntityRegistry,
    ) -> Self {
        Self {
            config,
            sink,
            registry,
            previous: None,
        }
    }

    /// Keep the expanded state of groups whose explicit `groupId` also
    /// appears in `previous`.
    #[must_use]
    pub fn carry_expanded_from(mut self, previous: &'a ColumnTree) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Build and balance a tree from `defs`.
    ///
    /// Leaves listed in `existing` are candidates for reuse; a reused leaf
    /// keeps its handle and id. Unmatched leaves stay in `store` until the
    /// caller drops them (see [`ColumnStore::retain_in`]).
    pub fn build_tree(
        &mut self,
        store: &mut ColumnStore,
        defs: &[ColumnDefinition],
        is_primary: bool,
        existing: Option<&[ColumnRef]>,
    ) -> ColumnTree {
        let _span = tracing::debug_span!(
            "columns.build_tree",
            defs = defs.len(),
            primary = is_primary,
            existing = existing.map_or(0, <[ColumnRef]>::len)
        )
        .entered();

        let pool: Vec<ColumnRef> = existing
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|handle| store.contains(*handle))
            .collect();
        let keys = ColumnKeyCreator::seeded(
            pool.iter()
                .filter_map(|handle| store.get(*handle))
                .map(|column| column.id().to_owned()),
        );
        let previous_expanded: FxHashMap<String, bool> = self
            .previous
            .map(|tree| {
                tree.groups()
                    .filter(|(_, group)| !group.is_padding())
                    .filter_map(|(_, group)| {
                        group
                            .def()
                            .group_id
                            .clone()
                            .map(|id| (id, group.is_expanded()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let merger = DefinitionMerger::new(self.config, &mut *self.sink);
        let mut tree = ColumnTree::new(is_primary);
        let mut build = Build {
            merger,
            keys,
            pool,
            sizing: self.config.sizing(),
            primary: is_primary,
            previous_expanded,
            store,
            tree: &mut tree,
            sink: &mut *self.sink,
            registry: &mut *self.registry,
            reused: 0,
            created: 0,
        };

        let unbalanced = build.create_nodes(defs, 0);
        let max_depth = build.find_max_depth(&unbalanced, 0);
        let balanced = build.balance(unbalanced, 0, max_depth);
        let (reused, created) = (build.reused, build.created);

        tree.set_roots(balanced);
        tree.set_max_depth(max_depth);
        tree.assign_parents(store);
        tree.refresh_expandable(store);

        tracing::debug!(
            message = "columns.tree_built",
            max_depth,
            groups = tree.group_count(),
            reused,
            created
        );
        tree
    }
}

/// Build a tree with the tracing sink and no lifecycle registry.
pub fn build_tree(
    config: &dyn ColumnConfig,
    store: &mut ColumnStore,
    defs: &[ColumnDefinition],
    is_primary: bool,
    existing: Option<&[ColumnRef]>,
) -> ColumnTree {
    let mut sink = TracingSink;
    let mut registry = NoopRegistry;
    ColumnTreeFactory::new(config, &mut sink, &mut registry).build_tree(store, defs, is_primary, existing)
}

struct Build<'b, 'c> {
    merger: DefinitionMerger<'c>,
    keys: ColumnKeyCreator,
    pool: Vec<ColumnRef>,
    sizing: ColumnSizing,
    primary: bool,
    previous_expanded: FxHashMap<String, bool>,
    store: &'b mut ColumnStore,
    tree: &'b mut ColumnTree,
    sink: &'b mut dyn DiagnosticSink,
    registry: &'b mut dyn EntityRegistry,
    reused: usize,
    created: usize,
}

impl Build<'_, '_> {
    fn create_nodes(&mut self, defs: &[ColumnDefinition], level: usize) -> Vec<TreeNode> {
        defs.iter()
            .map(|def| match def {
                ColumnDefinition::Leaf(def) => TreeNode::Column(self.create_column(def)),
                ColumnDefinition::Group { def, children } => {
                    TreeNode::Group(self.create_group(def, children, level))
                }
            })
            .collect()
    }

    fn create_column(&mut self, user: &ColDef) -> ColumnRef {
        let merged = self.merger.merge_leaf(user, &mut *self.sink);

        if let Some(pos) = self.find_existing(user) {
            let handle = self.pool.remove(pos);
            if let Some(column) = self.store.get_mut(handle) {
                column.redefine(merged, user.clone(), self.primary, &self.sizing);
            }
            self.reused += 1;
            return handle;
        }

        let id = self
            .keys
            .allocate(merged.col_id.as_deref(), merged.field.as_deref());
        if let Some(requested) = merged.col_id.as_deref()
            && !requested.is_empty()
            && requested != id
        {
            self.sink.report(Diagnostic::DuplicateColumnId {
                requested: requested.to_owned(),
                assigned: id.clone(),
            });
        }

        let handle = self.store.insert(Column::new(
            id,
            merged,
            user.clone(),
            self.primary,
            &self.sizing,
        ));
        if let Some(column) = self.store.get(handle) {
            self.registry.register(EntityRef::Column { handle, column });
        }
        self.created += 1;
        handle
    }

    /// Match by explicit id, else by field, else by definition equality.
    fn find_existing(&self, user: &ColDef) -> Option<usize> {
        self.pool.iter().position(|handle| {
            let Some(existing) = self.store.get(*handle) else {
                return false;
            };
            if let Some(id) = user.col_id.as_deref() {
                return existing.id() == id;
            }
            if let Some(field) = user.field.as_deref() {
                return existing.user_def().field.as_deref() == Some(field);
            }
            existing.user_def() == user
        })
    }

    fn create_group(
        &mut self,
        user: &ColGroupDef,
        children: &[ColumnDefinition],
        level: usize,
    ) -> GroupRef {
        let merged = self.merger.merge_group(user);
        let id = self.keys.allocate(user.group_id.as_deref(), None);
        if let Some(requested) = user.group_id.as_deref()
            && !requested.is_empty()
            && requested != id
        {
            self.sink.report(Diagnostic::DuplicateGroupId {
                requested: requested.to_owned(),
                assigned: id.clone(),
            });
        }

        let mut group = ProvidedGroup::real(id, merged, level);
        if let Some(requested) = user.group_id.as_deref()
            && let Some(&expanded) = self.previous_expanded.get(requested)
        {
            group.set_expanded(expanded);
        }
        let handle = self.push_group(group);

        let nodes = self.create_nodes(children, level + 1);
        self.tree.group_slot(handle).set_children(nodes);
        handle
    }

    fn push_group(&mut self, group: ProvidedGroup) -> GroupRef {
        let handle = self.tree.push_group(group);
        if let Some(group) = self.tree.group(handle) {
            self.registry.register(EntityRef::Group { handle, group });
        }
        self.created += 1;
        handle
    }

    fn find_max_depth(&self, nodes: &[TreeNode], depth: usize) -> usize {
        nodes
            .iter()
            .filter_map(|node| match *node {
                TreeNode::Group(group) => self.tree.group(group),
                TreeNode::Column(_) => None,
            })
            .map(|group| self.find_max_depth(group.children(), depth + 1))
            .fold(depth, usize::max)
    }

    fn balance(&mut self, nodes: Vec<TreeNode>, current: usize, target: usize) -> Vec<TreeNode> {
        let missing = target.saturating_sub(current);
        let has_groups = nodes.iter().any(|node| matches!(node, TreeNode::Group(_)));

        if missing > 0 && !has_groups && !nodes.is_empty() {
            let (outer, inner) = self.padding_chain(current, missing);
            self.tree.group_slot(inner).set_children(nodes);
            return vec![TreeNode::Group(outer)];
        }

        let mut result = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                TreeNode::Group(group) => {
                    let children = self.tree.group_slot(group).take_children();
                    let children = self.balance(children, current + 1, target);
                    self.tree.group_slot(group).set_children(children);
                    result.push(node);
                }
                TreeNode::Column(_) if missing > 0 => {
                    let (outer, inner) = self.padding_chain(current, missing);
                    self.tree.group_slot(inner).push_child(node);
                    result.push(TreeNode::Group(outer));
                }
                TreeNode::Column(_) => result.push(node),
            }
        }
        result
    }

    /// Create `count` nested padding groups starting at `level`.
    /// Returns the outermost and innermost group.
    fn padding_chain(&mut self, level: usize, count: usize) -> (GroupRef, GroupRef) {
        let outer = self.new_padding(level);
        let mut inner = outer;
        for depth in level + 1..level + count {
            let group = self.new_padding(depth);
            self.tree.group_slot(inner).push_child(TreeNode::Group(group));
            inner = group;
        }
        (outer, inner)
    }

    fn new_padding(&mut self, level: usize) -> GroupRef {
        let id = self.keys.allocate(None, None);
        self.push_group(ProvidedGroup::padding(id, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnOptions;
    use crate::def::ColumnGroupShow;
    use crate::diagnostics::CollectingSink;
    use crate::lifecycle::RecordingRegistry;

    fn leaf(id: &str) -> ColumnDefinition {
        ColumnDefinition::leaf(ColDef::new().with_id(id))
    }

    fn group(id: &str, children: Vec<ColumnDefinition>) -> ColumnDefinition {
        ColumnDefinition::group(ColGroupDef::new().with_group_id(id), children)
    }

    fn ids(tree: &ColumnTree, store: &ColumnStore, nodes: &[TreeNode]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| match *node {
                TreeNode::Column(c) => store.get(c).unwrap().id().to_owned(),
                TreeNode::Group(g) => tree.group(g).unwrap().id().to_owned(),
            })
            .collect()
    }

    fn group_of(tree: &ColumnTree, node: TreeNode) -> &ProvidedGroup {
        match node {
            TreeNode::Group(g) => tree.group(g).unwrap(),
            TreeNode::Column(_) => panic!("expected group"),
        }
    }

    #[test]
    fn leaf_beside_group_gets_one_padding_group() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [leaf("A"), group("B", vec![leaf("b1"), leaf("b2")])];
        let tree = build_tree(&options, &mut store, &defs, true, None);

        assert_eq!(tree.max_depth(), 1);
        assert_eq!(tree.roots().len(), 2);
        let pad = group_of(&tree, tree.roots()[0]);
        assert!(pad.is_padding());
        assert_eq!(ids(&tree, &store, pad.children()), ["A"]);
        let b = group_of(&tree, tree.roots()[1]);
        assert!(!b.is_padding());
        assert_eq!(b.id(), "B");
        assert_eq!(ids(&tree, &store, b.children()), ["b1", "b2"]);
    }

    #[test]
    fn all_leaves_need_no_padding() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let tree = build_tree(&options, &mut store, &[leaf("A"), leaf("B"), leaf("C")], true, None);
        assert_eq!(tree.max_depth(), 0);
        assert_eq!(tree.group_count(), 0);
        assert_eq!(ids(&tree, &store, tree.roots()), ["A", "B", "C"]);
    }

    #[test]
    fn trailing_leaf_after_group_is_wrapped_individually() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let tree = build_tree(
            &options,
            &mut store,
            &[group("X", vec![leaf("x1")]), leaf("Y"), leaf("Z")],
            true,
            None,
        );
        assert_eq!(tree.max_depth(), 1);
        assert_eq!(tree.roots().len(), 3);
        for (node, expected) in tree.roots()[1..].iter().zip(["Y", "Z"]) {
            let pad = group_of(&tree, *node);
            assert!(pad.is_padding());
            assert_eq!(ids(&tree, &store, pad.children()), [expected]);
        }
    }

    #[test]
    fn leaf_only_level_shares_one_chain() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [
            group("G1", vec![group("G2", vec![leaf("a")])]),
            group("G3", vec![leaf("b"), leaf("c")]),
        ];
        let tree = build_tree(&options, &mut store, &defs, true, None);
        assert_eq!(tree.max_depth(), 2);

        let g3 = group_of(&tree, tree.roots()[1]);
        assert_eq!(g3.children().len(), 1);
        let pad = group_of(&tree, g3.children()[0]);
        assert!(pad.is_padding());
        assert_eq!(pad.level(), 1);
        assert_eq!(ids(&tree, &store, pad.children()), ["b", "c"]);
    }

    #[test]
    fn deep_padding_chain_nests_and_levels_increase() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [leaf("A"), group("G", vec![group("H", vec![group("I", vec![leaf("i")])])])];
        let tree = build_tree(&options, &mut store, &defs, true, None);
        assert_eq!(tree.max_depth(), 3);

        let mut node = tree.roots()[0];
        for level in 0..3 {
            let pad = group_of(&tree, node);
            assert!(pad.is_padding());
            assert_eq!(pad.level(), level);
            assert_eq!(pad.children().len(), 1);
            node = pad.children()[0];
        }
        assert!(matches!(node, TreeNode::Column(_)));
    }

    #[test]
    fn every_leaf_path_has_max_depth() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [
            leaf("a"),
            group("g", vec![leaf("b"), group("h", vec![leaf("c")]), leaf("d")]),
            group("e", vec![]),
        ];
        let tree = build_tree(&options, &mut store, &defs, true, None);
        let mut sink = CollectingSink::new();
        for column in tree.leaves() {
            let path = tree.ancestor_path(column, &mut sink).unwrap();
            assert_eq!(path.len(), tree.max_depth());
        }
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn parents_are_linked_after_balancing() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let tree = build_tree(
            &options,
            &mut store,
            &[leaf("A"), group("B", vec![leaf("b1")])],
            true,
            None,
        );
        let a = store.find_by_id("A").unwrap();
        let pad = store.get(a).unwrap().original_parent().unwrap();
        assert!(tree.group(pad).unwrap().is_padding());
        assert_eq!(tree.group(pad).unwrap().original_parent(), None);
        assert_eq!(tree.column_parent(a), Some(Some(pad)));
    }

    #[test]
    fn depth_first_visits_children_before_group() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let tree = build_tree(
            &options,
            &mut store,
            &[group("g", vec![leaf("a"), leaf("b")]), leaf("c")],
            true,
            None,
        );
        let mut seen = Vec::new();
        tree.depth_first(|node, parent| {
            let name = match node {
                TreeNode::Column(c) => store.get(c).unwrap().id().to_owned(),
                TreeNode::Group(g) => tree.group(g).unwrap().id().to_owned(),
            };
            let parent = parent.map(|p| tree.group(p).unwrap().id().to_owned());
            seen.push((name, parent));
        });
        let g = Some("g".to_owned());
        let pad_id = tree.group(store.get(store.find_by_id("c").unwrap()).unwrap().original_parent().unwrap())
            .unwrap()
            .id()
            .to_owned();
        assert_eq!(
            seen,
            vec![
                ("a".to_owned(), g.clone()),
                ("b".to_owned(), g.clone()),
                ("g".to_owned(), None),
                ("c".to_owned(), Some(pad_id.clone())),
                (pad_id, None),
            ]
        );
    }

    #[test]
    fn rebuild_reuses_leaves_in_place() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let first = build_tree(&options, &mut store, &[leaf("a"), leaf("b")], true, None);
        let a = store.find_by_id("a").unwrap();
        store.get_mut(a).unwrap().set_width(321, &options.sizing);

        let existing = first.leaves();
        let defs = [
            ColumnDefinition::leaf(ColDef::new().with_id("b").with_header("Bee")),
            leaf("a"),
            leaf("c"),
        ];
        let second = build_tree(&options, &mut store, &defs, true, Some(existing.as_slice()));
        let leaves = second.leaves();
        assert_eq!(leaves[0], existing[1]);
        assert_eq!(leaves[1], existing[0]);
        assert_eq!(store.get(a).unwrap().width(), 321);
        assert_eq!(store.get(leaves[0]).unwrap().header_name(), "Bee");
        assert_eq!(store.get(leaves[2]).unwrap().id(), "c");
    }

    #[test]
    fn duplicate_user_id_matches_once() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let first = build_tree(&options, &mut store, &[leaf("a")], true, None);
        let existing = first.leaves();

        let mut sink = CollectingSink::new();
        let mut registry = RecordingRegistry::new();
        let second = ColumnTreeFactory::new(&options, &mut sink, &mut registry).build_tree(
            &mut store,
            &[leaf("a"), leaf("a")],
            true,
            Some(existing.as_slice()),
        );
        let leaves = second.leaves();
        assert_eq!(leaves[0], existing[0]);
        assert_ne!(leaves[1], existing[0]);
        assert_eq!(store.get(leaves[1]).unwrap().id(), "a_1");
        assert_eq!(registry.columns, ["a_1"]);
        assert_eq!(
            sink.diagnostics(),
            [Diagnostic::DuplicateColumnId {
                requested: "a".into(),
                assigned: "a_1".into()
            }]
        );
    }

    #[test]
    fn field_and_equality_matching() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let by_field = ColumnDefinition::leaf(ColDef::new().with_field("price"));
        let anonymous = ColumnDefinition::leaf(ColDef::new().with_header("Anon"));
        let first = build_tree(&options, &mut store, &[by_field.clone(), anonymous.clone()], true, None);
        let existing = first.leaves();

        let second = build_tree(&options, &mut store, &[anonymous, by_field], true, Some(existing.as_slice()));
        assert_eq!(second.leaves(), vec![existing[1], existing[0]]);

        let changed = ColumnDefinition::leaf(ColDef::new().with_header("Other"));
        let third = build_tree(&options, &mut store, &[changed], true, Some(existing.as_slice()));
        assert!(!existing.contains(&third.leaves()[0]));
    }

    #[test]
    fn registry_sees_every_new_entity_once() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let mut sink = CollectingSink::new();
        let mut registry = RecordingRegistry::new();
        let defs = [leaf("A"), group("B", vec![leaf("b1")])];
        let tree = ColumnTreeFactory::new(&options, &mut sink, &mut registry)
            .build_tree(&mut store, &defs, true, None);
        assert_eq!(registry.columns, ["A", "b1"]);
        assert_eq!(registry.groups.len(), tree.group_count());
        assert!(registry.groups.contains(&"B".to_owned()));
    }

    #[test]
    fn padding_and_anonymous_ids_share_the_integer_space() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [
            ColumnDefinition::leaf(ColDef::new()),
            ColumnDefinition::group(ColGroupDef::new(), vec![leaf("x")]),
        ];
        let tree = build_tree(&options, &mut store, &defs, true, None);
        let mut all: Vec<String> = tree.groups().map(|(_, g)| g.id().to_owned()).collect();
        all.extend(store.iter().map(|(_, c)| c.id().to_owned()));
        all.sort();
        assert_eq!(all, ["0", "1", "2", "x"]);
    }

    #[test]
    fn expanded_state_carries_by_group_id() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [group("g", vec![leaf("a")])];
        let mut first = build_tree(&options, &mut store, &defs, true, None);
        let g = first.find_group("g").unwrap();
        first.group_mut(g).unwrap().set_expanded(true);

        let mut sink = CollectingSink::new();
        let mut registry = NoopRegistry;
        let existing = first.leaves();
        let second = ColumnTreeFactory::new(&options, &mut sink, &mut registry)
            .carry_expanded_from(&first)
            .build_tree(&mut store, &defs, true, Some(existing.as_slice()));
        let g = second.find_group("g").unwrap();
        assert!(second.group(g).unwrap().is_expanded());
    }

    #[test]
    fn expandable_needs_open_and_closed_children() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let defs = [
            group(
                "g",
                vec![
                    leaf("always"),
                    ColumnDefinition::leaf(ColDef::new().with_id("more").with_group_show(ColumnGroupShow::Open)),
                ],
            ),
            group("plain", vec![leaf("p")]),
        ];
        let mut tree = build_tree(&options, &mut store, &defs, true, None);
        let g = tree.find_group("g").unwrap();
        let plain = tree.find_group("plain").unwrap();
        assert!(tree.group(g).unwrap().is_expandable());
        assert!(!tree.group(plain).unwrap().is_expandable());

        let more = store.find_by_id("more").unwrap();
        assert!(!tree.is_column_displayable(&store, more));
        tree.group_mut(g).unwrap().set_expanded(true);
        assert!(tree.is_column_displayable(&store, more));

        store.get_mut(more).unwrap().set_visible(false);
        tree.refresh_expandable(&store);
        assert!(!tree.group(g).unwrap().is_expandable());
    }

    #[test]
    fn foreign_leaf_has_no_path() {
        let options = ColumnOptions::new();
        let mut store = ColumnStore::new();
        let tree = build_tree(&options, &mut store, &[leaf("a")], true, None);
        let mut other = ColumnStore::new();
        build_tree(&options, &mut other, &[leaf("z"), leaf("y")], true, None);
        let foreign = other.find_by_id("y").unwrap();

        let mut sink = CollectingSink::new();
        assert!(tree.ancestor_path(foreign, &mut sink).is_none());
        assert!(sink.diagnostics()[0].is_structural());
    }
}
