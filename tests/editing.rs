//! Integration tests for the transactional editor

use pretty_assertions::assert_eq;
use rack_layout::cascade;
use rack_layout::layout::config::RackRules;
use rack_layout::model::PalletConfiguration;
use rack_layout::{
    Drawing, EditReport, Editor, EngineConfig, FixedDecision, GroupAnswer, LayoutError,
    LayoutWarning, Pallet, Point, Rack, RectId, Rectangle, Sheet, TableCatalog, Value,
};

fn cube_rack(id: u64, x: f64, y: f64) -> Rectangle {
    Rectangle::new_rack(
        RectId(id),
        Rack::uniform(2, 1, Pallet::new(1000.0, 1000.0, 1000.0, 800.0)),
        &RackRules::default(),
    )
    .at(x, y)
}

fn snapshot(drawing: &Drawing) -> Vec<Rectangle> {
    drawing.iter().cloned().collect()
}

fn column_name(drawing: &Drawing, id: u64) -> String {
    drawing
        .get(RectId(id))
        .and_then(|r| r.rack())
        .and_then(|r| r.column())
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn set(
    editor: &Editor<'_>,
    drawing: &mut Drawing,
    id: u64,
    key: &str,
    value: impl Into<Value>,
) -> Result<EditReport, LayoutError> {
    let mut decision = FixedDecision(GroupAnswer::No);
    editor.set_property(drawing, &mut decision, RectId(id), key, value, true)
}

/// Two racks in a row starting at (1000, 1000)
fn row_of_two(editor: &Editor<'_>, drawing: &mut Drawing) {
    editor
        .insert(drawing, cube_rack(1, 1000.0, 1000.0), true)
        .expect("Should insert the first rack");
    editor
        .insert(drawing, cube_rack(2, 2310.0, 1000.0), true)
        .expect("Should insert the second rack");
}

#[test]
fn test_second_rack_shares_an_upright() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);

    let first = drawing.get(RectId(1)).unwrap();
    let second = drawing.get(RectId(2)).unwrap();
    assert_eq!(first.length_x(), 1310.0);
    assert_eq!(second.length_x(), 1230.0);
    assert!(first.rack().unwrap().is_first_in_row_column());
    assert!(!second.rack().unwrap().is_first_in_row_column());
    assert_eq!(drawing.rack_group(first), vec![RectId(1), RectId(2)]);
}

#[test]
fn test_row_propagation_keeps_racks_end_to_end() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);

    // B140 needs a 100 mm upright, which the whole row then shares
    let report = set(&editor, &mut drawing, 1, "RackLevel_1_PalletLoad0", 5000.0)
        .expect("Should grow the row");

    let first = drawing.get(RectId(1)).unwrap();
    let second = drawing.get(RectId(2)).unwrap();
    assert_eq!(first.length_x(), 1350.0);
    assert_eq!(second.top_left(), Point::new(2350.0, 1000.0));
    assert_eq!(second.length_x(), 1250.0);
    assert_eq!(column_name(&drawing, 1), "C100/2.0");
    assert_eq!(column_name(&drawing, 2), "C100/2.0");
    assert!(report.touched.contains(&RectId(2)));
    assert_eq!(report.update_counter, 1);
    assert_eq!(second.update_counter(), 1);
}

#[test]
fn test_sliding_a_rack_along_the_line_leaves_its_row() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);

    set(&editor, &mut drawing, 1, "TOP_LEFT_X", 10000.0).expect("Should move out of the row");
    let moved = drawing.get(RectId(1)).unwrap();
    assert_eq!(moved.top_left(), Point::new(10000.0, 1000.0));
    assert_eq!(moved.length_x(), 1310.0);
    assert_eq!(moved.update_counter(), 1);
    assert_eq!(drawing.rack_group(moved), vec![RectId(1)]);

    // the rack left behind now owns both of its uprights
    let rest = drawing.get(RectId(2)).unwrap();
    assert_eq!(rest.top_left(), Point::new(2310.0, 1000.0));
    assert_eq!(rest.length_x(), 1310.0);
    assert!(rest.rack().unwrap().is_first_in_row_column());
    assert_eq!(rest.update_counter(), 1);

    set(&editor, &mut drawing, 1, "CENTER_POINT", Point::new(15000.0, 1450.0))
        .expect("Should move again");
    let moved = drawing.get(RectId(1)).unwrap();
    assert_eq!(moved.center(), Point::new(15000.0, 1450.0));
    assert_eq!((moved.length_x(), moved.length_y()), (1310.0, 900.0));
    assert_eq!(moved.update_counter(), 2);
}

#[test]
fn test_sliding_a_rack_into_its_row_neighbour_conflicts() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);
    let before = snapshot(&drawing);

    let err = set(&editor, &mut drawing, 2, "TOP_LEFT_X", 2000.0).unwrap_err();
    assert_eq!(err.conflicts(), Some(&[RectId(1)][..]));
    assert_eq!(snapshot(&drawing), before);
}

#[test]
fn test_failed_regroup_restores_the_whole_sheet() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);
    let wall_end = Rectangle::block(RectId(3)).at(3600.0, 1000.0).with_size(500.0, 500.0);
    editor.insert(&mut drawing, wall_end, true).expect("Should insert the block");
    let before = snapshot(&drawing);

    let err = set(&editor, &mut drawing, 1, "RackLevel_1_PalletLoad0", 5000.0).unwrap_err();
    assert_eq!(err.conflicts(), Some(&[RectId(3)][..]));
    assert_eq!(snapshot(&drawing), before);

    let last = drawing.changes().last().unwrap();
    assert!(!last.success);
    assert!(last.error.is_some());
}

#[test]
fn test_cascade_is_idempotent_on_a_committed_rack() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);

    let ctx = editor.context(&drawing);
    for id in [RectId(1), RectId(2)] {
        let committed = drawing.get(id).unwrap().clone();
        let mut again = committed.clone();
        let mut warnings = Vec::new();
        cascade::recompute(&mut again, &ctx, &mut warnings).expect("Should recompute");
        assert_eq!(again, committed);
        assert!(warnings.is_empty());
    }

    let row = drawing.rack_group(drawing.get(RectId(1)).unwrap());
    let patches = cascade::recompute_group(&row, &ctx, &mut Vec::new()).expect("Should lay out");
    for patch in patches {
        assert!(!patch.differs_from(drawing.get(patch.id).unwrap()));
    }
}

#[test]
fn test_removing_the_lead_rack_makes_the_next_one_lead() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    row_of_two(&editor, &mut drawing);

    let report = editor.remove(&mut drawing, RectId(1)).expect("Should remove");
    assert_eq!(report.removed, vec![RectId(1)]);
    assert!(drawing.get(RectId(1)).is_none());

    let rest = drawing.get(RectId(2)).unwrap();
    assert_eq!(rest.top_left(), Point::new(2310.0, 1000.0));
    assert_eq!(rest.length_x(), 1310.0);
    assert!(rest.rack().unwrap().is_first_in_row_column());
    assert_eq!(rest.update_counter(), 1);
}

#[test]
fn test_pallets_count_is_bounded() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    editor
        .insert(&mut drawing, cube_rack(1, 1000.0, 1000.0), true)
        .expect("Should insert");
    let before = snapshot(&drawing);

    for count in [9.0, 1e19] {
        let err = set(&editor, &mut drawing, 1, "RackLevel_1_PalletsCount", count).unwrap_err();
        assert!(matches!(err, LayoutError::BoundsViolation { .. }), "got {:?}", err);
        assert_eq!(snapshot(&drawing), before);
        let last = drawing.changes().last().expect("Should notify");
        assert!(!last.success);
    }

    set(&editor, &mut drawing, 1, "RackLevel_1_PalletsCount", 2.0).expect("Two pallets fit");
    let rack = drawing.get(RectId(1)).unwrap();
    assert_eq!(rack.rack().unwrap().level(1).unwrap().pallets.len(), 2);
    // 2 x 1000 + 3 x 75 -> 2250 clear, plus two 80 mm uprights
    assert_eq!(rack.length_x(), 2410.0);
}

#[test]
fn test_redefined_pallet_configuration_reaches_bound_racks() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let euro = PalletConfiguration {
        name: "EUR".to_string(),
        length: 1000.0,
        width: 1000.0,
        height: 1000.0,
    };
    let mut drawing =
        Drawing::from_config(20000.0, 20000.0, &config).with_pallet_configuration(euro.clone());
    let rack = Rectangle::new_rack(
        RectId(1),
        Rack::uniform(2, 1, Pallet::configured(&euro, 800.0)),
        &RackRules::default(),
    )
    .at(1000.0, 1000.0);
    editor.insert(&mut drawing, rack, true).expect("Should insert");
    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1310.0);

    let err = set(&editor, &mut drawing, 1, "RackLevel_1_PalletLength0", 1200.0).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidValue { .. }), "got {:?}", err);

    drawing.define_pallet_configuration(PalletConfiguration {
        length: 1200.0,
        ..euro
    });
    // untouched until the next recompute
    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1310.0);

    set(&editor, &mut drawing, 1, "RackLevel_1_PalletLoad0", 900.0).expect("Should recompute");
    let rack = drawing.get(RectId(1)).unwrap();
    let level = rack.rack().unwrap().level(1).unwrap();
    assert_eq!(level.pallets[0].length, 1200.0);
    assert_eq!(level.pallets[0].configuration(), Some("EUR"));
    assert_eq!(rack.length_x(), 1510.0);
}

#[test]
fn test_unknown_pallet_configuration_is_rejected() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    let ghost = PalletConfiguration {
        name: "GHOST".to_string(),
        length: 1000.0,
        width: 1000.0,
        height: 1000.0,
    };
    let rack = Rectangle::new_rack(
        RectId(1),
        Rack::uniform(2, 1, Pallet::configured(&ghost, 800.0)),
        &RackRules::default(),
    )
    .at(1000.0, 1000.0);
    let err = editor.insert(&mut drawing, rack, true).unwrap_err();
    assert!(matches!(err, LayoutError::CascadeFailure { .. }), "got {:?}", err);
    assert!(drawing.is_empty());

    editor
        .insert(&mut drawing, cube_rack(2, 1000.0, 1000.0), true)
        .expect("Should insert");
    let before = snapshot(&drawing);
    let err = set(&editor, &mut drawing, 2, "RackLevel_1_PalletConfiguration0", "GHOST").unwrap_err();
    assert!(matches!(err, LayoutError::InvalidValue { .. }), "got {:?}", err);
    assert_eq!(snapshot(&drawing), before);
}

#[test]
fn test_anchor_properties() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(10000.0, 10000.0, &config);
    let block = Rectangle::block(RectId(1)).at(1000.0, 1000.0).with_size(2000.0, 1000.0);
    editor.insert(&mut drawing, block, true).expect("Should insert");

    set(&editor, &mut drawing, 1, "BOT_RIGHT_POINT", Point::new(3500.0, 2500.0)).unwrap();
    let rect = drawing.get(RectId(1)).unwrap();
    assert_eq!(rect.top_left(), Point::new(1000.0, 1000.0));
    assert_eq!((rect.length_x(), rect.length_y()), (2500.0, 1500.0));

    set(&editor, &mut drawing, 1, "TOP_LEFT_POINT", Point::new(500.0, 500.0)).unwrap();
    let rect = drawing.get(RectId(1)).unwrap();
    assert_eq!(rect.bottom_right(), Point::new(3500.0, 2500.0));
    assert_eq!((rect.length_x(), rect.length_y()), (3000.0, 2000.0));

    set(&editor, &mut drawing, 1, "CENTER_POINT", Point::new(5000.0, 5000.0)).unwrap();
    let rect = drawing.get(RectId(1)).unwrap();
    assert_eq!(rect.top_left(), Point::new(3500.0, 4000.0));
    assert_eq!((rect.length_x(), rect.length_y()), (3000.0, 2000.0));
    assert_eq!(rect.update_counter(), 3);
}

#[test]
fn test_off_step_dimension_is_corrected_with_a_warning() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(10000.0, 10000.0, &config);
    let block = Rectangle::block(RectId(1)).at(1000.0, 1000.0).with_size(2000.0, 1000.0);
    editor.insert(&mut drawing, block, true).expect("Should insert");

    let report = set(&editor, &mut drawing, 1, "DIMENSION_X", 1005.0).expect("Should snap");
    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1010.0);
    assert_eq!(
        report.warnings,
        vec![LayoutWarning::StepViolation {
            subject: "DIMENSION_X".to_string(),
            value: 1005.0,
            step: 10.0,
            corrected: 1010.0,
        }]
    );

    let err = set(&editor, &mut drawing, 1, "DIMENSION_X", 5.0).unwrap_err();
    assert!(matches!(err, LayoutError::BoundsViolation { .. }), "got {:?}", err);
    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1010.0);
}

#[test]
fn test_key_and_value_errors() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(10000.0, 10000.0, &config);
    let block = Rectangle::block(RectId(1)).at(1000.0, 1000.0).with_size(2000.0, 1000.0);
    editor.insert(&mut drawing, block, true).expect("Should insert");

    let err = set(&editor, &mut drawing, 1, "DIMENSION_W", 10.0).unwrap_err();
    assert!(matches!(err, LayoutError::UnknownProperty { .. }));
    let err = set(&editor, &mut drawing, 1, "RACK_COLUMN", "C80/1.5").unwrap_err();
    assert!(matches!(err, LayoutError::UnsupportedProperty { .. }));
    let err = set(&editor, &mut drawing, 1, "TOP_LEFT_X", "left").unwrap_err();
    assert!(matches!(err, LayoutError::InvalidValue { .. }));
    let err = set(&editor, &mut drawing, 9, "NAME", "ghost").unwrap_err();
    assert!(matches!(err, LayoutError::NotFound { id: RectId(9) }));

    assert_eq!(drawing.changes().len(), 4);
    assert!(drawing.changes().iter().all(|change| !change.success));
}

#[test]
fn test_explicit_column_must_be_strong_enough() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    editor
        .insert(&mut drawing, cube_rack(1, 1000.0, 1000.0), true)
        .expect("Should insert");
    set(&editor, &mut drawing, 1, "RackLevel_1_PalletLoad0", 5000.0).expect("Should load");
    assert_eq!(column_name(&drawing, 1), "C100/2.0");
    let before = snapshot(&drawing);

    let err = set(&editor, &mut drawing, 1, "RACK_COLUMN", "C80/2.0").unwrap_err();
    assert!(matches!(err, LayoutError::BoundsViolation { .. }), "got {:?}", err);
    assert_eq!(snapshot(&drawing), before);

    let err = set(&editor, &mut drawing, 1, "RACK_COLUMN", "C999").unwrap_err();
    assert!(matches!(err, LayoutError::CatalogLookupFailure { .. }));

    set(&editor, &mut drawing, 1, "RACK_COLUMN", "C120/3.0").expect("Stronger is fine");
    assert_eq!(column_name(&drawing, 1), "C120/3.0");
    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1390.0);
}

fn size_group(editor: &Editor<'_>, drawing: &mut Drawing) {
    let twin = |id: u64, y: f64| {
        Rectangle::new_rack(
            RectId(id),
            Rack::uniform(2, 1, Pallet::new(1000.0, 1000.0, 1000.0, 800.0)).with_size_index(7),
            &RackRules::default(),
        )
        .at(1000.0, y)
    };
    editor.insert(drawing, twin(1, 1000.0), true).expect("Should insert");
    editor.insert(drawing, twin(2, 5000.0), true).expect("Should insert");
}

#[test]
fn test_size_group_cancel_changes_nothing() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    size_group(&editor, &mut drawing);
    let before = snapshot(&drawing);

    let mut asked = Vec::new();
    let mut decision = |_: &Rectangle, siblings: &[RectId]| {
        asked.extend_from_slice(siblings);
        GroupAnswer::Cancel
    };
    let err = editor
        .set_property(&mut drawing, &mut decision, RectId(1), "RackLevel_1_PalletHeight0", 1500.0, true)
        .unwrap_err();
    assert!(matches!(err, LayoutError::Cancelled));
    assert_eq!(asked, vec![RectId(2)]);
    assert_eq!(snapshot(&drawing), before);
}

#[test]
fn test_size_group_no_detaches_the_rack() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    size_group(&editor, &mut drawing);

    let mut decision = FixedDecision(GroupAnswer::No);
    editor
        .set_property(&mut drawing, &mut decision, RectId(1), "RackLevel_1_PalletHeight0", 1500.0, true)
        .expect("Should apply to the rack alone");

    let edited = drawing.get(RectId(1)).unwrap();
    let sibling = drawing.get(RectId(2)).unwrap();
    assert_eq!(edited.length_z(), 2800.0);
    assert_eq!(sibling.length_z(), 2300.0);
    assert_eq!(edited.rack().unwrap().size_index(), 8);
    assert_eq!(sibling.rack().unwrap().size_index(), 7);
}

#[test]
fn test_size_group_yes_applies_to_siblings() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    size_group(&editor, &mut drawing);

    let mut decision = FixedDecision(GroupAnswer::Yes);
    let report = editor
        .set_property(&mut drawing, &mut decision, RectId(1), "RackLevel_1_PalletHeight0", 1500.0, true)
        .expect("Should apply to the group");

    for id in [RectId(1), RectId(2)] {
        let rect = drawing.get(id).unwrap();
        assert_eq!(rect.length_z(), 2800.0);
        assert_eq!(rect.rack().unwrap().size_index(), 7);
    }
    assert!(report.touched.contains(&RectId(2)));
    assert!(report.removed.is_empty());
}

#[test]
fn test_size_group_yes_drops_siblings_that_do_not_fit() {
    let config = EngineConfig::default();
    let catalog = TableCatalog::default();
    let editor = Editor::new(&config, &catalog);
    let mut drawing = Drawing::from_config(20000.0, 20000.0, &config);
    size_group(&editor, &mut drawing);
    let block = Rectangle::block(RectId(3)).at(2500.0, 5000.0).with_size(500.0, 500.0);
    editor.insert(&mut drawing, block, true).expect("Should insert");

    let mut decision = FixedDecision(GroupAnswer::Yes);
    let report = editor
        .set_property(&mut drawing, &mut decision, RectId(1), "RackLevel_1_PalletLength0", 1500.0, true)
        .expect("The edited rack still fits");

    assert_eq!(drawing.get(RectId(1)).unwrap().length_x(), 1810.0);
    assert_eq!(report.removed, vec![RectId(2)]);
    assert!(drawing.get(RectId(2)).is_none());
}
