#![no_main]

use arbitrary::Arbitrary;
use fgrid_columns::{
    ColDef, ColGroupDef, ColumnDefinition, ColumnOptions, ColumnRef, ColumnStore, PinnedSide,
    build_tree, reconcile,
};
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

#[derive(Debug, Arbitrary)]
enum Node {
    Leaf { id: Option<u8>, field: Option<u8> },
    Group { id: Option<u8>, children: Vec<Node> },
}

#[derive(Debug, Arbitrary)]
struct Input {
    defs: Vec<Node>,
    hidden: Vec<u8>,
    order: Vec<u8>,
}

fn to_defs(nodes: &[Node], depth: usize) -> Vec<ColumnDefinition> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Leaf { id, field } => {
                let mut def = ColDef::new();
                def.col_id = id.map(|i| format!("c{}", i % 8));
                def.field = field.map(|f| format!("f{}", f % 4));
                ColumnDefinition::leaf(def)
            }
            // Bound recursion so pathological inputs stay cheap.
            Node::Group { id, children } if depth < 6 => {
                let mut def = ColGroupDef::new();
                def.group_id = id.map(|i| format!("g{}", i % 4));
                ColumnDefinition::group(def, to_defs(children, depth + 1))
            }
            Node::Group { .. } => ColumnDefinition::leaf(ColDef::new()),
        })
        .collect()
}

fuzz_target!(|input: Input| {
    let defs = to_defs(&input.defs, 0);
    let options = ColumnOptions::new();
    let mut store = ColumnStore::new();
    let tree = build_tree(&options, &mut store, &defs, true, None);

    let leaves = tree.leaves();
    let mut visible: Vec<_> = leaves
        .iter()
        .enumerate()
        .filter(|(i, _)| !input.hidden.contains(&(*i as u8)))
        .map(|(i, leaf)| (input.order.get(i).copied().unwrap_or(0), i, *leaf))
        .collect();
    visible.sort();
    let visible: Vec<_> = visible.into_iter().map(|(_, _, leaf)| leaf).collect();

    let first = reconcile(&visible, &tree, PinnedSide::Center, None);
    assert_eq!(first.leaves(), visible, "reconcile reordered leaves");
    let groups = first.group_count();

    let second = reconcile(&visible, &tree, PinnedSide::Center, Some(first));
    assert_eq!(second.leaves(), visible);
    assert_eq!(second.group_count(), groups, "idempotent reconcile changed shape");

    // A rebuild with the same definitions keeps every handle once no two
    // leaves compete for the same match key.
    let reusable = keys_unambiguous(&store, &leaves);
    let rebuilt = build_tree(&options, &mut store, &defs, true, Some(leaves.as_slice()));
    assert_eq!(rebuilt.leaves().len(), leaves.len());
    if reusable {
        assert_eq!(rebuilt.leaves(), leaves, "rebuild recreated leaves");
    }
});

fn keys_unambiguous(store: &ColumnStore, leaves: &[ColumnRef]) -> bool {
    let mut ids = HashSet::new();
    let mut fields = HashSet::new();
    leaves.iter().all(|leaf| {
        let Some(column) = store.get(*leaf) else {
            return false;
        };
        let user = column.user_def();
        let id_ok = match user.col_id.as_deref() {
            Some(id) => column.id() == id && ids.insert(id.to_owned()),
            None => true,
        };
        let field_ok = match user.field.as_deref() {
            Some(field) => fields.insert(field.to_owned()),
            None => true,
        };
        id_ok && field_ok
    })
}
