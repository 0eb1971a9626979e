#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use viamask::via::{RawAnnotationDocument, RawEntry, RawRegion, ShapeAttributes};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Small label vocabulary so that `(filename, type)` groups collide often.
pub fn arb_label() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None::<String>),
        1 => Just(Some(String::new())),
        4 => prop::sample::select(vec!["leaf", "stem", "head", "leaf_spot"])
            .prop_map(|s| Some(s.to_string())),
    ]
}

pub fn arb_polygon(max_coord: i32) -> impl Strategy<Value = (Vec<i32>, Vec<i32>)> {
    prop::collection::vec((-5..=max_coord, -5..=max_coord), 3..8)
        .prop_map(|points| points.into_iter().unzip())
}

pub fn arb_region(max_coord: i32) -> impl Strategy<Value = RawRegion> {
    (arb_polygon(max_coord), arb_label()).prop_map(|((xs, ys), label)| {
        let region_attributes = label.map(|label| {
            let mut map = serde_json::Map::new();
            map.insert("Type".to_string(), serde_json::Value::String(label));
            map
        });
        RawRegion {
            shape_attributes: Some(ShapeAttributes {
                name: Some("polygon".to_string()),
                all_points_x: Some(xs),
                all_points_y: Some(ys),
            }),
            region_attributes,
        }
    })
}

/// Documents whose entries reuse a few stems with different extensions.
pub fn arb_document(
    max_entries: usize,
    max_regions: usize,
) -> impl Strategy<Value = RawAnnotationDocument> {
    let entry = (
        prop::sample::select(vec!["img", "cat", "a_b"]),
        prop::sample::select(vec!["jpg", "png", "tar.gz"]),
        prop::collection::vec(arb_region(40), 0..=max_regions),
    );

    prop::collection::vec(entry, 0..=max_entries).prop_map(|entries| RawAnnotationDocument {
        entries: entries
            .into_iter()
            .enumerate()
            .map(|(i, (stem, ext, regions))| {
                (
                    format!("{}.{}{}", stem, ext, i),
                    RawEntry {
                        filename: Some(format!("{}.{}", stem, ext)),
                        regions: Some(regions),
                    },
                )
            })
            .collect(),
    })
}
