mod common;

use std::fs;

use test_case::test_case;
use tilescope::features::{FeatureFilter, FeatureType};
use tilescope::genomics::{ByteOrder, GenomicRange, PackedGenomeStore, StoreOptions};
use tilescope::plugin::{AnnotationSource, CompositionSource, SequenceSource};
use tilescope::AnnotationError;

fn r(start: u32, end: u32) -> GenomicRange {
    GenomicRange::new(start, end).expect("valid range")
}

fn genome() -> Vec<(&'static str, &'static str)> {
    vec![
        ("chr1", "TCAGTCAGNNNNACGTacgtacgtACGTAAAAaaaaCCCC"),
        ("chr2", "GGGGCCCC"),
        ("chr1_random", "ACGT"),
        ("chrM", "ACGTACGT"),
    ]
}

#[test_case(false, ByteOrder::Little; "little endian")]
#[test_case(true, ByteOrder::Big; "big endian")]
fn memory_mapped_container_decodes_bases(big_endian: bool, order: ByteOrder) {
    let path = common::write_temp(
        &format!("decode-{big_endian}.2bit"),
        &common::twobit(&genome(), big_endian),
    );
    let store = PackedGenomeStore::open(&path, StoreOptions::default()).expect("store opens");

    assert_eq!(store.byte_order(), order);
    assert_eq!(
        store.names().collect::<Vec<_>>(),
        ["chr1", "chr2", "chr1_random", "chrM"]
    );

    let chr1 = store.sequence("chr1").expect("chr1 present");
    assert_eq!(chr1.len(), 40);
    assert!(!chr1.is_decoded());
    assert_eq!(chr1.fetch(&r(1, 8)).expect("fetch"), b"TCAGTCAG");
    assert!(chr1.is_decoded());
    assert_eq!(chr1.fetch(&r(7, 14)).expect("fetch"), b"AGNNNNAC");
    assert_eq!(chr1.symbol_at(40).expect("last base"), b'C');
    assert!(matches!(
        chr1.symbol_at(41),
        Err(AnnotationError::Bounds { position: 41, length: 40 })
    ));

    let layout = chr1.layout().expect("layout");
    assert_eq!(layout.n_regions().blocks(), &[r(9, 12)]);
    assert_eq!(layout.mask_regions().blocks(), &[r(17, 24), r(33, 36)]);

    fs::remove_file(path).ok();
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("tilescope-does-not-exist.2bit");
    let err = PackedGenomeStore::open(&path, StoreOptions::default()).unwrap_err();
    assert!(matches!(err, AnnotationError::Io { path: p, .. } if p == path));
}

#[test]
fn sequence_source_serves_repeats_and_bases() {
    let store = PackedGenomeStore::from_bytes(common::twobit(&genome(), false), StoreOptions::default())
        .expect("store parses");
    let source = SequenceSource::from_store(store);

    assert_eq!(source.source_type(), "2bit");
    assert_eq!(source.version(), "1.00");
    assert_eq!(source.schema(), FeatureFilter::ByType(FeatureType::Repeat));

    let all = source.features("1", &FeatureFilter::All, -1).expect("repeats");
    let ranges: Vec<GenomicRange> = all.iter().map(|f| f.range).collect();
    assert_eq!(ranges, [r(17, 24), r(33, 36)]);
    assert!(all.iter().all(|f| f.feature_type == FeatureType::Repeat && f.source == "ucsc"));

    let window = source
        .features("chr1", &FeatureFilter::overlapping(30, 40), -1)
        .expect("repeats in window");
    assert_eq!(window.len(), 1);
    assert_eq!(window.iter().next().map(|f| f.range), Some(r(33, 36)));

    let inside = source
        .features("chr1", &FeatureFilter::contained_by(18, 40), -1)
        .expect("contained repeats");
    assert_eq!(inside.len(), 1);

    assert_eq!(source.bases("2", &r(3, 6)).expect("bases"), b"GGCC");
    assert!(matches!(
        source.bases("chr9", &r(1, 2)),
        Err(AnnotationError::NotFound(name)) if name == "chr9"
    ));
}

#[test]
fn elided_store_reports_no_repeats() {
    let store = PackedGenomeStore::from_bytes(
        common::twobit(&genome(), true),
        StoreOptions::default().with_elide_repeats(true),
    )
    .expect("store parses");
    let chr1 = store.sequence("chr1").expect("chr1 present");
    assert!(chr1.layout().expect("layout").mask_regions().is_empty());
    assert!(chr1.repeat_features(&FeatureFilter::All).expect("repeats").is_empty());
    assert_eq!(chr1.fetch(&r(9, 12)).expect("fetch"), b"NNNN");
}

#[test]
fn composition_entry_points_hide_random_and_mito() {
    let store = PackedGenomeStore::from_bytes(
        common::twobit(&genome(), false),
        StoreOptions::default().with_elide_repeats(true),
    )
    .expect("store parses");
    let source = CompositionSource::from_store(store, Default::default()).expect("source");

    let names: Vec<String> = source
        .entry_points()
        .expect("entry points")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["1", "2"]);
    assert_eq!(source.reference_length("1"), Some(40));
    assert_eq!(source.reference_length("chrX"), None);
}

#[test]
fn sequence_entry_points_are_raw_names() {
    let store = PackedGenomeStore::from_bytes(common::twobit(&genome(), false), StoreOptions::default())
        .expect("store parses");
    let source = SequenceSource::from_store(store);
    let points = source.entry_points().expect("entry points");
    assert_eq!(points.len(), 4);
    assert_eq!(points[2].name, "chr1_random");
    assert_eq!(points[2].length, Some(4));
}
