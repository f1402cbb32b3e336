#![no_main]

use fgrid::{ColumnModel, ColumnOptions, PinnedSide};
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let mut model = ColumnModel::new(ColumnOptions::new());
    if model.set_column_defs_json(json).is_err() {
        return;
    }

    let tree = model.tree();
    let store = model.store();

    // Balanced: every leaf has exactly max_depth ancestors.
    let index = tree.ancestor_index();
    let mut sink = fgrid::CollectingSink::new();
    for leaf in tree.leaves() {
        let path = index.path(leaf, &mut sink).expect("leaf reachable");
        assert_eq!(path.len(), tree.max_depth(), "unbalanced leaf");
    }

    // Ids are unique across leaves and groups.
    let mut seen = HashSet::new();
    for leaf in tree.leaves() {
        let id = store.get(leaf).expect("leaf in store").id();
        assert!(seen.insert(id.to_owned()), "duplicate leaf id {id}");
    }
    for (_, group) in tree.groups() {
        assert!(seen.insert(group.id().to_owned()), "duplicate group id {}", group.id());
    }

    // Displayed leaves are visible, unique and in their own section.
    let shown = model.displayed_columns();
    assert_eq!(shown.iter().collect::<HashSet<_>>().len(), shown.len());
    for side in PinnedSide::ALL {
        for leaf in model.displayed(side).leaves() {
            let column = store.get(leaf).expect("displayed leaf in store");
            assert!(column.is_visible());
            assert_eq!(column.pinned(), side);
        }
    }

    // Re-applying the same definitions reuses every leaf whose match key
    // is unambiguous.
    let before = tree.leaves();
    let reusable = keys_unambiguous(store, &before);
    model.set_column_defs_json(json).expect("same json parses again");
    let after = model.tree().leaves();
    assert_eq!(after.len(), before.len());
    if reusable {
        assert_eq!(after, before, "rebuild recreated leaves");
    }
});

fn keys_unambiguous(store: &fgrid::columns::ColumnStore, leaves: &[fgrid::ColumnRef]) -> bool {
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
