//! Column model driven through its public API.

use fgrid::prelude::*;
use fgrid::{CollectingSink, Diagnostic, DisplayedNode, RecordingRegistry};
use proptest::prelude::*;
use std::collections::HashSet;

const DEFS: &str = r#"[
    {"headerName": "Athlete", "groupId": "athleteGroup", "openByDefault": false, "children": [
        {"field": "athlete"},
        {"field": "age", "columnGroupShow": "open", "type": "numericColumn"},
        {"field": "country", "columnGroupShow": "open"}
    ]},
    {"headerName": "Medals", "groupId": "medals", "children": [
        {"field": "gold", "type": "medal"},
        {"field": "silver", "type": "medal"},
        {"colId": "total", "headerName": "Total", "pinned": "right", "width": 90}
    ]},
    {"field": "year", "displayName": "Year", "type": "nope"}
]"#;

fn model() -> fgrid::ColumnModel<CollectingSink, RecordingRegistry> {
    let options = ColumnOptions::new()
        .with_default_col_def(ColDef::new().with_width(120))
        .with_column_type("medal", ColDef::new().with_width(70));
    let mut model = ColumnModel::new(options)
        .with_diagnostics(CollectingSink::new())
        .with_registry(RecordingRegistry::new());
    model.set_column_defs_json(DEFS).expect("valid definitions");
    model
}

fn displayed_ids<S: fgrid::DiagnosticSink, R: fgrid::EntityRegistry>(
    model: &fgrid::ColumnModel<S, R>,
) -> Vec<String> {
    model
        .displayed_columns()
        .into_iter()
        .map(|c| model.store().get(c).expect("live column").id().to_owned())
        .collect()
}

#[test]
fn json_definitions_build_sections() {
    let model = model();
    assert_eq!(displayed_ids(&model), ["athlete", "gold", "silver", "year", "total"]);
    assert_eq!(model.column("gold").unwrap().width(), 70);
    assert_eq!(model.column("total").unwrap().width(), 90);
    assert_eq!(model.column("year").unwrap().width(), 120);
    assert_eq!(model.column("year").unwrap().header_name(), "Year");
    assert_eq!(model.tree().max_depth(), 1);

    let right = model.displayed(PinnedSide::Right);
    let DisplayedNode::Group(medals) = right.roots()[0] else {
        panic!("total should sit under the medals group");
    };
    assert_eq!(right.group(medals).unwrap().group_id(), "medals");
    assert_eq!(right.group(medals).unwrap().instance(), 1);
}

#[test]
fn configuration_problems_are_diagnosed() {
    let model = model();
    let kinds: Vec<_> = model.diagnostics().diagnostics().iter().map(Diagnostic::kind).collect();
    assert!(kinds.contains(&"unknown_column_type"));
    assert!(kinds.contains(&"deprecated_field"));
    assert!(model.diagnostics().diagnostics().iter().all(|d| !d.is_structural()));
}

#[test]
fn group_expansion_and_visibility() {
    let mut model = model();
    model.set_group_expanded("athleteGroup", true).unwrap();
    assert_eq!(
        displayed_ids(&model),
        ["athlete", "age", "country", "gold", "silver", "year", "total"]
    );

    model.set_column_visible("age", false).unwrap();
    model.set_column_visible("country", false).unwrap();
    let athlete = model.tree().find_group("athleteGroup").unwrap();
    assert!(!model.tree().group(athlete).unwrap().is_expandable());
    assert_eq!(displayed_ids(&model), ["athlete", "gold", "silver", "year", "total"]);
}

#[test]
fn redefining_keeps_matching_columns() {
    let mut model = model();
    let gold = model.column_handle("gold").unwrap();
    model.set_column_width("gold", 333).unwrap();
    model.set_column_visible("gold", false).unwrap();
    model
        .set_column_defs_json(r#"[{"field": "gold"}, {"field": "bronze"}]"#)
        .unwrap();

    assert_eq!(model.column_handle("gold"), Some(gold));
    // the default definition sets a width, so it is applied again
    assert_eq!(model.column("gold").unwrap().width(), 120);
    assert!(!model.column("gold").unwrap().is_visible());
    assert_eq!(model.tree().max_depth(), 0);
    assert_eq!(displayed_ids(&model), ["bronze"]);
    let released: HashSet<_> = model.registry().released.iter().map(String::as_str).collect();
    assert!(released.contains("athlete") && released.contains("total"));
    assert!(!released.contains("gold"));
}

#[test]
fn leaf_named_like_its_group_is_suffixed() {
    let mut model = ColumnModel::new(ColumnOptions::new());
    model
        .set_column_defs_json(r#"[{"groupId": "g", "children": [{"field": "g"}]}]"#)
        .unwrap();

    assert!(model.tree().find_group("g").is_some());
    assert!(model.column("g").is_none());
    assert_eq!(displayed_ids(&model), ["g_1"]);
    assert!(matches!(
        model.set_column_visible("g", false),
        Err(GridError::ColumnNotFound { .. })
    ));
}

#[test]
fn pinned_sections_keep_group_identity_on_refresh() {
    let mut model = model();
    let center = model.displayed(PinnedSide::Center);
    let medals = center.find("medals", 0).unwrap();
    let uid = center.group(medals).unwrap().uid();

    model.set_column_visible("year", false).unwrap();
    let center = model.displayed(PinnedSide::Center);
    let medals = center.find("medals", 0).unwrap();
    assert_eq!(center.group(medals).unwrap().uid(), uid);
}

// ═════════════════════════════════════════════════════════════════════════
// Arbitrary edit sequences
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Edit {
    Visible(usize, bool),
    Pin(usize, PinnedSide),
    Move(usize, usize),
    Expand(bool),
}

const IDS: [&str; 7] = ["athlete", "age", "country", "gold", "silver", "total", "year"];

fn arb_edit() -> impl Strategy<Value = Edit> {
    let side = prop_oneof![Just(PinnedSide::Left), Just(PinnedSide::Center), Just(PinnedSide::Right)];
    prop_oneof![
        (0..IDS.len(), any::<bool>()).prop_map(|(i, v)| Edit::Visible(i, v)),
        (0..IDS.len(), side).prop_map(|(i, s)| Edit::Pin(i, s)),
        (0..IDS.len(), 0usize..10).prop_map(|(i, to)| Edit::Move(i, to)),
        any::<bool>().prop_map(Edit::Expand),
    ]
}

proptest! {
    #[test]
    fn displayed_columns_follow_state(edits in prop::collection::vec(arb_edit(), 0..24)) {
        let mut model = model();
        for edit in edits {
            match edit {
                Edit::Visible(i, v) => model.set_column_visible(IDS[i], v).unwrap(),
                Edit::Pin(i, s) => model.set_column_pinned(IDS[i], s).unwrap(),
                Edit::Move(i, to) => model.move_column(IDS[i], to).unwrap(),
                Edit::Expand(open) => model.set_group_expanded("athleteGroup", open).unwrap(),
            }
        }

        let shown = model.displayed_columns();
        let unique: HashSet<_> = shown.iter().collect();
        prop_assert_eq!(unique.len(), shown.len());

        let mut expected = Vec::new();
        for side in PinnedSide::ALL {
            let section = model.displayed(side).leaves();
            for column in &section {
                let col = model.store().get(*column).unwrap();
                prop_assert!(col.is_visible());
                prop_assert_eq!(col.pinned(), side);
                prop_assert!(model.tree().is_column_displayable(model.store(), *column));
            }
            expected.extend(
                model
                    .order()
                    .iter()
                    .copied()
                    .filter(|c| section.contains(c)),
            );
        }
        prop_assert_eq!(expected, shown);
        prop_assert!(model.diagnostics().diagnostics().iter().all(|d| !d.is_structural()));
    }
}
