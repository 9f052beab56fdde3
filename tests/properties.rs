//! Property-based tests for the Line Protocol parser
//!
//! These tests check invariants that must hold for ANY input, not just
//! hand-written lines. proptest generates random inputs and shrinks failures
//! to minimal cases.

use lineproto_stream::{FieldValue, LineProtocolParser, Point};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Parse everything, panicking on source errors (impossible for in-memory text).
fn parse(input: &str) -> Vec<Point> {
    LineProtocolParser::from_text(input)
        .collect::<Result<_, _>>()
        .expect("in-memory input never fails in skip mode")
}

/// Identifier-ish text that needs escaping in every context.
fn name() -> impl Strategy<Value = String> {
    "[a-z ,=]{0,3}[a-z][a-z ,=]{0,3}"
}

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e9f64..1.0e9).prop_map(FieldValue::from),
        any::<bool>().prop_map(FieldValue::Boolean),
        "[a-z \"=,]{0,8}".prop_map(FieldValue::String),
    ]
}

fn point() -> impl Strategy<Value = Point> {
    (
        name(),
        prop::collection::vec((name(), name()), 0..3),
        prop::collection::vec((name(), field_value()), 1..4),
        prop::option::of(any::<i64>()),
    )
        .prop_map(|(measurement, tags, fields, timestamp)| {
            let mut builder = Point::builder(measurement);
            for (k, v) in tags {
                builder.add_tag(k, v).unwrap();
            }
            for (k, v) in fields {
                builder.add_field(k, v).unwrap();
            }
            if let Some(ts) = timestamp {
                builder.set_timestamp(ts);
            }
            builder.build().unwrap()
        })
}

// =============================================================================
// Property: Every Point Is Complete
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// Arbitrary text never panics and never yields a point without a
    /// measurement or fields.
    #[test]
    fn prop_points_have_measurement_and_fields(input in "[a-z0-9 ,=\"\\\\#.\n-]{0,64}") {
        for point in parse(&input) {
            prop_assert!(!point.measurement().is_empty());
            prop_assert!(!point.fields().is_empty());
            for (key, value) in point.tags() {
                prop_assert!(!key.is_empty());
                prop_assert!(!value.is_empty());
            }
            for key in point.fields().keys() {
                prop_assert!(!key.is_empty());
            }
        }
    }

    /// Arbitrary unicode never panics either.
    #[test]
    fn prop_unicode_never_panics(input in "\\PC{0,64}") {
        let _ = parse(&input);
    }

    // =========================================================================
    // Property: Writer Output Parses Back
    // =========================================================================

    #[test]
    fn prop_written_point_parses_back(point in point()) {
        let line = point.to_string();
        let parsed = parse(&line);
        prop_assert_eq!(parsed, vec![point]);
    }

    // =========================================================================
    // Property: One Bad Line Does Not Disturb Its Neighbours
    // =========================================================================

    #[test]
    fn prop_garbage_line_is_isolated(
        before in point(),
        after in point(),
        garbage in "[, ][a-z ,=]{0,10}",
    ) {
        let input = format!("{}\n{}\n{}\n", before, garbage, after);
        let parsed = parse(&input);
        prop_assert_eq!(parsed, vec![before, after]);
    }

    #[test]
    fn prop_comments_contribute_nothing(point in point(), comment in "[^\n]{0,20}") {
        let input = format!("#{}\n{}\n#{}", comment, point, comment);
        prop_assert_eq!(parse(&input), vec![point]);
    }
}
