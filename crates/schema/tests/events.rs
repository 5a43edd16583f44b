#![forbid(unsafe_code)]

use flatvar_core::{FlatVar, HostKind, HostValue, Resolver};
use flatvar_flatten::{flatten_with_report, FlattenOptions};
use flatvar_schema::{decode, SchemaRegistry};
use serde_json::json;

fn registry() -> SchemaRegistry {
    let schema = json!({
        "enums": [
            { "name": "Crime", "variants": ["None", "Claim", "Fine", "Bounty"] }
        ],
        "records": [
            {
                "name": "Jumped",
                "fields": [
                    { "name": "type", "type": { "scalar": "text" } },
                    { "name": "SystemName", "type": { "scalar": "text" }, "description": "The system" },
                    { "name": "Coordinates", "type": { "nullable": { "ref": "Coordinates" } } },
                    { "name": "Crimes", "type": { "sequence": { "ref": "Crime" } } },
                    { "name": "Timestamp", "type": { "scalar": "date_time" } }
                ]
            },
            {
                "name": "Coordinates",
                "fields": [
                    { "name": "x", "type": { "scalar": "decimal" } },
                    { "name": "y", "type": { "scalar": "decimal" } },
                    { "name": "z", "type": { "scalar": "decimal" } }
                ]
            }
        ]
    });
    SchemaRegistry::from_json_str(&schema.to_string()).unwrap()
}

#[test]
fn decoded_event_flattens_through_registry() {
    let reg = registry();
    let root = reg.resolve("Jumped").unwrap();
    let event = json!({
        "type": "Jumped",
        "SystemName": "Artemis",
        "Coordinates": { "x": 14.3, "y": -2.5, "z": 0 },
        "Crimes": ["Fine", 3],
        "Timestamp": "2024-05-01T12:00:00Z",
    });
    let value = decode(&event, &root, &reg);
    let report = flatten_with_report(&root, &value, "", &FlattenOptions::default(), &reg);
    assert!(report.faults.is_empty(), "{:?}", report.faults);

    let keys: Vec<_> = report.vars.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "system name",
            "coordinates x",
            "coordinates y",
            "coordinates z",
            "crimes 0",
            "crimes 1",
            "crimes entries",
            "timestamp",
        ]
    );
    assert_eq!(report.vars[3], FlatVar::new("coordinates z", HostKind::Number, Some(HostValue::Number(0.0)), false));
    assert_eq!(report.vars[5].value, Some(HostValue::Text("Bounty".into())));
    assert_eq!(report.vars[7].kind, HostKind::DateTime);
}

#[test]
fn absent_nested_record_still_documents_shape() {
    let reg = registry();
    let root = reg.resolve("Jumped").unwrap();
    let value = decode(&json!({ "SystemName": "Artemis", "Coordinates": null }), &root, &reg);
    let vars = flatten_with_report(&root, &value, "", &FlattenOptions::default(), &reg).vars;
    assert_eq!(vars[0], FlatVar::new("system name", HostKind::Text, Some(HostValue::Text("Artemis".into())), true));
    assert_eq!(vars[1], FlatVar::new("coordinates x", HostKind::Number, None, false));
    assert_eq!(vars[4], FlatVar::new("crimes n", HostKind::Text, None, false));
    assert_eq!(vars[5], FlatVar::new("crimes entries", HostKind::Integer, None, true));
}
