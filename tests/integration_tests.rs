//! Integration tests: full pipelines from column metadata or Arrow batches to
//! typed values.

use std::sync::Arc;

use rowbind::{
    ColumnDef, ColumnMetadata, ColumnType, ConverterRegistry, ErrorPolicy, MapperConfig, Row,
    RowMapper, RowbindError, Value,
};

fn mapper(config: MapperConfig) -> RowMapper {
    RowMapper::with_registry(config, Arc::new(ConverterRegistry::new()))
}

fn scores() -> ColumnMetadata {
    ColumnMetadata::new(vec![
        ColumnDef::new("player", ColumnType::Text).unwrap(),
        ColumnDef::new("score", ColumnType::Int).unwrap(),
    ])
    .unwrap()
}

fn score_rows(n: i32) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let score = if i % 10 == 7 { Value::Null } else { Value::Int(i) };
            Row::new(vec![Value::Text(format!("p{i}")), score])
        })
        .collect()
}

// =============================================================================
// Error Policy Tests
// =============================================================================

mod error_policy_tests {
    use super::*;

    #[test]
    fn test_fail_fast_stops_at_first_bad_row() {
        let m = mapper(MapperConfig::default());
        let err = m
            .map_rows::<(String, i64), _>(&scores(), score_rows(20))
            .unwrap_err();
        assert!(matches!(err, RowbindError::Conversion(ref c) if c.field == "1"));
    }

    #[test]
    fn test_skip_drops_bad_rows() {
        let m = mapper(MapperConfig::default().with_error_policy(ErrorPolicy::Skip));
        let mapped = m
            .map_rows::<(String, i64), _>(&scores(), score_rows(20))
            .unwrap();
        assert_eq!(mapped.rows.len(), 18);
        assert_eq!(mapped.skipped, 2);
        assert!(mapped.errors.is_empty());
    }

    #[test]
    fn test_collect_reports_row_indices() {
        let m = mapper(MapperConfig::default().with_error_policy(ErrorPolicy::Collect));
        let mapped = m
            .map_rows::<(String, i64), _>(&scores(), score_rows(30))
            .unwrap();
        let indices: Vec<usize> = mapped.errors.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![7, 17, 27]);
        assert_eq!(mapped.rows.len(), 27);
    }

    #[test]
    fn test_optional_target_absorbs_nulls() {
        let m = mapper(MapperConfig::default());
        let mapped = m
            .map_rows::<(String, Option<i64>), _>(&scores(), score_rows(10))
            .unwrap();
        assert!(mapped.is_clean());
        assert_eq!(mapped.rows[7], ("p7".to_string(), None));
        assert_eq!(mapped.rows[8], ("p8".to_string(), Some(8)));
    }

    #[test]
    fn test_resolution_error_precedes_rows() {
        let m = mapper(MapperConfig::default().with_error_policy(ErrorPolicy::Collect));
        let err = m
            .map_rows::<(String,), _>(&scores(), score_rows(3))
            .unwrap_err();
        assert!(matches!(err, RowbindError::Resolution(_)));
    }
}

// =============================================================================
// Batch Tests
// =============================================================================

mod batch_tests {
    use super::*;

    #[test]
    fn test_parallel_batch_preserves_order() {
        let m = mapper(
            MapperConfig::default()
                .with_parallel_threshold(16)
                .with_error_policy(ErrorPolicy::Skip),
        );
        let rows = score_rows(2_000);
        let mapped = m.map_batch::<(String, i64)>(&scores(), &rows).unwrap();
        assert_eq!(mapped.skipped, 200);
        assert!(mapped
            .rows
            .windows(2)
            .all(|w| w[0].1 < w[1].1));
    }

    #[test]
    fn test_batch_reuses_cached_plan() {
        let m = mapper(MapperConfig::default().with_error_policy(ErrorPolicy::Skip));
        for _ in 0..3 {
            m.map_batch::<(String, i64)>(&scores(), &score_rows(5)).unwrap();
        }
        let stats = m.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }
}

// =============================================================================
// Stream Tests
// =============================================================================

mod stream_tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_stream_of_rows() {
        let m = mapper(MapperConfig::default());
        let plan = m.bind::<(String, Option<i32>)>(&scores()).unwrap();
        let rows = futures::stream::iter(score_rows(12));
        let values: Vec<_> = futures::executor::block_on(
            plan.stream(rows).map(|r| r.unwrap()).collect::<Vec<_>>(),
        );
        assert_eq!(values.len(), 12);
        assert_eq!(values[11], ("p11".to_string(), Some(11)));
    }

    #[test]
    fn test_iterator_stops_on_demand() {
        let m = mapper(MapperConfig::default());
        let plan = m.bind::<(String, i64)>(&scores()).unwrap();
        let first_three: Vec<_> = plan
            .iter(score_rows(1_000))
            .take(3)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(first_three.len(), 3);
    }
}

// =============================================================================
// Arrow Ingestion Tests
// =============================================================================

mod arrow_tests {
    use super::*;
    use arrow::array::{ArrayRef, Int32Array, StringArray, TimestampMillisecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use rowbind::{Instance, RecordShape, Result, RowType, TargetDescriptor};

    #[derive(Debug, PartialEq)]
    struct Visit {
        user_name: String,
        visits: i64,
        last_visit: Option<i64>,
    }

    impl RowType for Visit {
        fn descriptor() -> TargetDescriptor {
            RecordShape::new("Visit")
                .param::<String>("userName")
                .param::<i64>("visits")
                .setter::<Option<i64>>("lastVisit")
                .into()
        }

        fn from_instance(instance: Instance) -> Result<Self> {
            let mut record = instance.into_record()?;
            Ok(Visit {
                user_name: record.take_arg(0)?,
                visits: record.take_arg(1)?,
                last_visit: record.take_prop::<Option<i64>>("lastVisit")?.flatten(),
            })
        }
    }

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("user_name", DataType::Utf8, false),
            Field::new("visits", DataType::Int32, false),
            Field::new(
                "last_visit",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["ann", "bob"])) as ArrayRef,
                Arc::new(Int32Array::from(vec![3, 5])) as ArrayRef,
                Arc::new(TimestampMillisecondArray::from(vec![
                    Some(1_709_294_400_000),
                    None,
                ])) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_record_batch_to_records() {
        let m = mapper(MapperConfig::default());
        let mapped = m.map_record_batch::<Visit>(&batch()).unwrap();
        assert_eq!(
            mapped.rows,
            vec![
                Visit {
                    user_name: "ann".into(),
                    visits: 3,
                    last_visit: Some(1_709_294_400_000),
                },
                Visit {
                    user_name: "bob".into(),
                    visits: 5,
                    last_visit: None,
                },
            ]
        );
    }

    #[test]
    fn test_arrow_schema_nullability() {
        let cols = ColumnMetadata::from_arrow_schema(batch().schema().as_ref()).unwrap();
        assert!(!cols.get(0).unwrap().nullable);
        assert!(cols.get(2).unwrap().nullable);
        assert_eq!(cols.get(2).unwrap().column_type, ColumnType::Timestamp);
    }
}

// =============================================================================
// Property Tests
// =============================================================================

mod proptest_mapping {
    use super::*;
    use proptest::prelude::*;
    use rowbind::naming::{candidates, to_camel_case};
    use rowbind::{RowType, ShapeResolver};

    fn snake_ident() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..4).prop_map(|parts| parts.join("_"))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_candidates_contain_exact_and_camel(column in snake_ident()) {
            let set = candidates(&column);
            prop_assert!(set.contains(&column));
            prop_assert!(set.contains(&to_camel_case(&column)));
            prop_assert!(set.len() <= 2);
            prop_assert!(!to_camel_case(&column).contains('_'));
        }

        #[test]
        fn test_tuple_values_survive_materialization(
            values in proptest::collection::vec((any::<i32>(), "[a-z]{0,8}"), 0..50)
        ) {
            let m = mapper(MapperConfig::default());
            let rows: Vec<Row> = values
                .iter()
                .map(|(n, s)| Row::new(vec![Value::Text(s.clone()), Value::Int(*n)]))
                .collect();
            let mapped = m.map_rows::<(String, i64), _>(&scores(), rows).unwrap();
            let expected: Vec<(String, i64)> =
                values.into_iter().map(|(n, s)| (s, i64::from(n))).collect();
            prop_assert_eq!(mapped.rows, expected);
        }

        #[test]
        fn test_resolution_is_deterministic(swap in any::<bool>()) {
            let cols = if swap {
                scores().select(&["score", "player"]).unwrap().columns
            } else {
                scores()
            };
            let resolver = ShapeResolver::new(Arc::new(ConverterRegistry::new()));
            let target = <(Value, Value)>::descriptor();
            prop_assert_eq!(
                resolver.resolve(&cols, &target).unwrap(),
                resolver.resolve(&cols, &target).unwrap()
            );
        }
    }
}
