//! End-to-end scenarios: definitions in, displayed trees out.

use fgrid_columns::{
    CollectingSink, ColDef, ColGroupDef, ColumnDefinition, ColumnOptions, ColumnRef, ColumnStore,
    ColumnTree, DisplayedNode, DisplayedTree, GroupInstanceAllocator, PinnedSide, Reconciler,
    build_tree, reconcile,
};

fn leaf(id: &str) -> ColumnDefinition {
    ColumnDefinition::leaf(ColDef::new().with_id(id))
}

fn group(id: &str, children: Vec<ColumnDefinition>) -> ColumnDefinition {
    ColumnDefinition::group(ColGroupDef::new().with_group_id(id), children)
}

fn col(store: &ColumnStore, id: &str) -> ColumnRef {
    store.find_by_id(id).expect("column exists")
}

/// `Region{Country{gold, silver}, Sport{bronze}}, total`
fn medals() -> (ColumnStore, ColumnTree) {
    let mut store = ColumnStore::new();
    let defs = [
        group(
            "region",
            vec![
                group("country", vec![leaf("gold"), leaf("silver")]),
                group("sport", vec![leaf("bronze")]),
            ],
        ),
        leaf("total"),
    ];
    let tree = build_tree(&ColumnOptions::new(), &mut store, &defs, true, None);
    (store, tree)
}

fn group_at(tree: &DisplayedTree, node: DisplayedNode) -> &fgrid_columns::DisplayedGroup {
    match node {
        DisplayedNode::Group(g) => tree.group(g).expect("group"),
        DisplayedNode::Column(c) => panic!("expected group, found {c}"),
    }
}

#[test]
fn contiguous_leaves_share_the_group_chain() {
    let (store, tree) = medals();
    assert_eq!(tree.max_depth(), 2);
    let visible = [col(&store, "gold"), col(&store, "silver"), col(&store, "bronze"), col(&store, "total")];
    let out = reconcile(&visible, &tree, PinnedSide::Center, None);

    assert_eq!(out.roots().len(), 2);
    let region = group_at(&out, out.roots()[0]);
    assert_eq!(region.unique_id(), "region_0");
    let country = group_at(&out, region.children()[0]);
    let sport = group_at(&out, region.children()[1]);
    assert_eq!(country.children().len(), 2);
    assert_eq!(sport.children(), [DisplayedNode::Column(visible[2])]);

    let outer_pad = group_at(&out, out.roots()[1]);
    assert!(outer_pad.is_padding());
    let inner_pad = group_at(&out, outer_pad.children()[0]);
    assert!(inner_pad.is_padding());
    assert_eq!(inner_pad.children(), [DisplayedNode::Column(visible[3])]);
}

#[test]
fn unchanged_paths_keep_the_same_group_objects() {
    let (store, tree) = medals();
    let gold = col(&store, "gold");
    let silver = col(&store, "silver");
    let total = col(&store, "total");

    let first = reconcile(&[gold, silver, total], &tree, PinnedSide::Center, None);
    let country_uid = first.group(first.find("country", 0).unwrap()).unwrap().uid();
    let region_uid = first.group(first.find("region", 0).unwrap()).unwrap().uid();

    // bronze is hidden, then total moves to the front
    let second = reconcile(&[total, gold, silver], &tree, PinnedSide::Center, Some(first));
    let country = second.group(second.find("country", 0).unwrap()).unwrap();
    assert_eq!(country.uid(), country_uid);
    assert_eq!(country.children(), [DisplayedNode::Column(gold), DisplayedNode::Column(silver)]);
    assert_eq!(
        second.group(second.find("region", 0).unwrap()).unwrap().uid(),
        region_uid
    );
    assert!(second.find("sport", 0).is_none());
}

#[test]
fn divergence_creates_fresh_instances() {
    let (store, tree) = medals();
    let gold = col(&store, "gold");
    let silver = col(&store, "silver");
    let total = col(&store, "total");

    let first = reconcile(&[gold, silver], &tree, PinnedSide::Center, None);
    let first_uids: Vec<_> = first.groups().map(|(_, g)| g.uid()).collect();

    let second = reconcile(&[gold, total, silver], &tree, PinnedSide::Center, Some(first));
    let region_1 = second.find("region", 1).expect("second region instance");
    let country_1 = second.find("country", 1).expect("second country instance");
    for handle in [region_1, country_1] {
        let group = second.group(handle).unwrap();
        assert!(!first_uids.contains(&group.uid()));
        assert_eq!(group.instance(), 1);
    }
    assert_eq!(second.parent_of_column(silver), Some(Some(country_1)));
    assert_eq!(second.group(country_1).unwrap().parent(), Some(region_1));
    assert_eq!(second.leaves(), vec![gold, total, silver]);
}

#[test]
fn sections_share_instance_numbers_within_one_pass() {
    let (store, tree) = medals();
    let gold = col(&store, "gold");
    let silver = col(&store, "silver");
    let bronze = col(&store, "bronze");

    let mut allocator = GroupInstanceAllocator::new();
    let mut sink = CollectingSink::new();
    let mut reconciler = Reconciler::new(&tree, &mut allocator, &mut sink);
    let left = reconciler.reconcile(&[gold], PinnedSide::Left, None);
    let center = reconciler.reconcile(&[silver, bronze], PinnedSide::Center, None);
    let right = reconciler.reconcile(&[], PinnedSide::Right, None);

    assert!(left.find("region", 0).is_some());
    assert!(center.find("region", 1).is_some());
    assert!(center.find("country", 1).is_some());
    assert!(center.find("sport", 0).is_some());
    assert!(right.is_empty());
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn rebuilt_definitions_do_not_reuse_stale_groups() {
    let (mut store, tree) = medals();
    let visible = tree.leaves();
    let first = reconcile(&visible, &tree, PinnedSide::Center, None);
    let old_uid = first.group(first.find("country", 0).unwrap()).unwrap().uid();

    let defs = [
        group(
            "region",
            vec![
                group("country", vec![leaf("gold"), leaf("silver")]),
                group("sport", vec![leaf("bronze")]),
            ],
        ),
        leaf("total"),
    ];
    let rebuilt = build_tree(&ColumnOptions::new(), &mut store, &defs, true, Some(visible.as_slice()));
    assert_eq!(rebuilt.leaves(), visible);

    let second = reconcile(&rebuilt.leaves(), &rebuilt, PinnedSide::Center, Some(first));
    let country = second.group(second.find("country", 0).unwrap()).unwrap();
    assert_ne!(country.uid(), old_uid);
    assert_eq!(second.tree_stamp(), rebuilt.stamp());
}

#[test]
fn single_level_scenarios() {
    let options = ColumnOptions::new();

    let mut store = ColumnStore::new();
    let flat = build_tree(&options, &mut store, &[leaf("A"), leaf("B"), leaf("C")], true, None);
    assert_eq!(flat.max_depth(), 0);
    assert_eq!(flat.group_count(), 0);
    let out = reconcile(&flat.leaves(), &flat, PinnedSide::Center, None);
    assert_eq!(out.group_count(), 0);
    assert_eq!(out.leaves(), flat.leaves());

    let mut store = ColumnStore::new();
    let tree = build_tree(
        &options,
        &mut store,
        &[group("X", vec![leaf("x1")]), leaf("Y")],
        true,
        None,
    );
    assert_eq!(tree.max_depth(), 1);
    let y = col(&store, "Y");
    let pad = store.get(y).unwrap().original_parent().unwrap();
    assert!(tree.group(pad).unwrap().is_padding());
    assert_eq!(tree.group(pad).unwrap().children().len(), 1);
}
