//! Property-Based Tests for Schema Module
//!
//! Uses proptest to check that accepted input satisfies every constraint and
//! rejected input reports every violated field.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use crate::schema::{validate, Field, Schema};

const NAME_MAX: usize = 20;
const QTY_MIN: i64 = 1;
const QTY_MAX: i64 = 500;

fn line_schema() -> Schema {
    Schema::new(vec![
        Field::string("name").required().min_len(1).max_len(NAME_MAX),
        Field::integer("quantity")
            .required()
            .min(QTY_MIN as f64)
            .max(QTY_MAX as f64),
        Field::one_of("status", &["pending", "accepted", "rejected"]).required(),
        Field::string("reason"),
    ])
    .refine("reason", "Reason is required", |obj| {
        obj.get("status").and_then(Value::as_str) != Some("rejected")
            || obj
                .get("reason")
                .and_then(Value::as_str)
                .is_some_and(|r| !r.trim().is_empty())
    })
}

// == Strategies ==
fn valid_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{0,19}"
}

fn invalid_name() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("")),
        "[a-z]{21,40}".prop_map(Value::String),
        Just(json!(true)),
    ]
}

fn invalid_quantity() -> impl Strategy<Value = Value> {
    prop_oneof![
        (i64::MIN / 2..QTY_MIN).prop_map(|q| json!(q)),
        (QTY_MAX + 1..i64::MAX / 2).prop_map(|q| json!(q)),
        "[a-z]{1,5}".prop_map(Value::String),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Accepted input satisfies every declared constraint.
    #[test]
    fn prop_accepted_input_satisfies_constraints(
        name in valid_name(),
        quantity in QTY_MIN..=QTY_MAX,
        as_string in any::<bool>(),
    ) {
        let quantity_value = if as_string { json!(quantity.to_string()) } else { json!(quantity) };
        let params = validate(
            &line_schema(),
            &json!({"name": name, "quantity": quantity_value, "status": "pending"}),
        ).unwrap();

        let name_len = params.get_str("name").unwrap().chars().count();
        prop_assert!((1..=NAME_MAX).contains(&name_len));
        prop_assert_eq!(params.get_i64("quantity"), Some(quantity));
    }

    // Rejected input names every violated field, not only the first.
    #[test]
    fn prop_all_violations_reported(
        bad_name in proptest::option::of(invalid_name()),
        bad_quantity in proptest::option::of(invalid_quantity()),
        rejected_without_reason in any::<bool>(),
    ) {
        prop_assume!(bad_name.is_some() || bad_quantity.is_some() || rejected_without_reason);

        let mut input = Map::new();
        input.insert("name".into(), bad_name.clone().unwrap_or(json!("Amoxicillin")));
        input.insert("quantity".into(), bad_quantity.clone().unwrap_or(json!(10)));
        input.insert(
            "status".into(),
            json!(if rejected_without_reason { "rejected" } else { "accepted" }),
        );

        let errors = validate(&line_schema(), &Value::Object(input)).unwrap_err();

        prop_assert_eq!(errors.contains("name"), bad_name.is_some());
        prop_assert_eq!(errors.contains("quantity"), bad_quantity.is_some());
        prop_assert_eq!(errors.contains("reason"), rejected_without_reason);
    }
}
