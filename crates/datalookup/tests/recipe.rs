//! Integration tests over the recipe fixture: nested records, record
//! collections inside them, arrays and null values.

use datalookup::{DatalookupError, FilterValue, RecordSet};
use serde_json::json;

const RECIPE: &str = include_str!("data/recipe.json");

fn recipe() -> RecordSet {
    RecordSet::from_json_str(RECIPE).expect("recipe fixture parses")
}

fn names(set: &RecordSet) -> Vec<String> {
    set.iter()
        .map(|r| r.value_of("name").unwrap().as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_values_round_trip() {
    let raw: serde_json::Value = serde_json::from_str(RECIPE).unwrap();
    assert_eq!(recipe().values(), raw);
}

#[test]
fn test_deep_filter_not_existing_data() {
    let found = recipe()
        .filter([("batters__batter__type", "Not exist")])
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_chaining_filters() {
    let found = recipe()
        .filter([("ppu", 0.55)])
        .unwrap()
        .filter([("batters__batter__type", "Chocolate")])
        .unwrap();
    assert_eq!(names(&found), vec!["Old Fashioned"]);
}

#[test]
fn test_filtering_on_cascade() {
    let mut set = recipe();
    let found = set
        .on_cascade()
        .filter([("batters__batter__id", "1003")])
        .unwrap();
    assert_eq!(names(&found), vec!["Cake"]);

    let batters = found[0].get("batters").unwrap().as_record().unwrap();
    let batter = batters.get("batter").unwrap().as_records().unwrap();
    assert_eq!(batter.len(), 1);
    assert_eq!(batter[0].value_of("type").unwrap(), json!("Blueberry"));

    // The source keeps every batter
    let source = set[0].get("batters").unwrap().as_record().unwrap();
    assert_eq!(source.get("batter").unwrap().as_records().unwrap().len(), 4);
}

#[test]
fn test_filtering_without_cascade_keeps_nested_records() {
    let found = recipe()
        .filter([("batters__batter__id", "1003")])
        .unwrap();
    let batters = found[0].value_of("batters").unwrap();
    assert_eq!(batters["batter"].as_array().unwrap().len(), 4);
}

#[test]
fn test_isnull() {
    let set = recipe();
    assert_eq!(set.filter([("time__isnull", true)]).unwrap().len(), 2);
    assert_eq!(set.filter([("time__isnull", false)]).unwrap().len(), 1);

    let err = set.filter([("time__isnull", "yes")]).unwrap_err();
    assert!(matches!(err, DatalookupError::LookupType { .. }));
}

#[test]
fn test_array_contains() {
    let set = recipe();
    assert_eq!(set.filter([("topping__contains", "Glazed")]).unwrap().len(), 2);
    assert_eq!(
        set.filter([("topping__contains", vec!["Sugar", "Glazed"])])
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_array_contained_by() {
    let set = recipe();
    assert_eq!(
        set.filter([("topping__contained_by", vec!["Glazed", "Sugar"])])
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        set.filter([("topping__contained_by", vec!["Sugar", "Glazed", "Chocolate"])])
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn test_array_overlap() {
    let set = recipe();
    assert_eq!(
        set.filter([("topping__overlap", vec!["Glazed", "Sugar"])])
            .unwrap()
            .len(),
        3
    );
    assert_eq!(
        set.filter([("topping__overlap", vec!["Glazed"])]).unwrap().len(),
        2
    );
}

#[test]
fn test_array_len() {
    let set = recipe();
    assert_eq!(set.filter([("topping__len", 1)]).unwrap().len(), 1);
    assert_eq!(set.filter([("topping__len", 2)]).unwrap().len(), 2);
}

#[test]
fn test_array_in() {
    let found = recipe()
        .filter([("topping__in", vec!["Glazed"])])
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_related_records_search() {
    let batters = recipe().related_records("batters.batter").unwrap();
    assert_eq!(batters.len(), 7);
    assert_eq!(batters[0].value_of("id").unwrap(), json!("1001"));

    let err = recipe().related_records("batters.nope").unwrap_err();
    assert!(matches!(err, DatalookupError::FieldNotFound { .. }));
}

#[test]
fn test_filter_related() {
    let found = recipe()
        .filter_related("batters.batter", [("type", "Regular")])
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[test]
fn test_related_in() {
    let set = recipe();
    for (batter, expected) in [("Regular", 3), ("Chocolate", 2), ("Blueberry", 1)] {
        let related = set
            .filter_related("batters.batter", [("type", batter)])
            .unwrap();
        let found = set
            .filter([("batters__batter__in", FilterValue::from(related))])
            .unwrap();
        assert_eq!(found.len(), expected, "batter {batter}");
    }
}

#[test]
fn test_exclude_related_in() {
    let set = recipe();
    for (batter, expected) in [("Regular", 0), ("Chocolate", 1), ("Blueberry", 2)] {
        let related = set
            .filter_related("batters.batter", [("type", batter)])
            .unwrap();
        let found = set
            .exclude([("batters__batter__in", FilterValue::from(related))])
            .unwrap();
        assert_eq!(found.len(), expected, "batter {batter}");
    }
}

#[test]
fn test_related_exact() {
    let single = RecordSet::new(json!({"id": "1001", "type": "Regular"})).unwrap();
    let found = recipe()
        .filter([("batters__batter", FilterValue::from(single))])
        .unwrap();
    assert_eq!(names(&found), vec!["Raised"]);
}

#[test]
fn test_distinct_related_records() {
    let batters = recipe().related_records("batters.batter").unwrap();
    let distinct = batters.distinct();
    assert_eq!(distinct.len(), 4);
    assert_eq!(distinct.distinct(), distinct);
}
