mod common;

use resonances::{
    catalog::{
        sequence::peek_sequence, Catalog, CatalogTable, LibrationFilter, ResonanceCatalogBuilder,
        ResonanceKind,
    },
    config::{ConflictPolicy, ResonanceConfig},
    libration::Libration,
    resonance_errors::ResonanceError,
};
use rstest::rstest;

use crate::common::AeiDir;

const LINE: &str = "4 -2 -1 0 0 -1 2.5";

fn config(policy: ConflictPolicy) -> ResonanceConfig {
    ResonanceConfig::builder()
        .conflict_policy(policy)
        .build()
        .unwrap()
}

#[rstest]
#[case::native(ConflictPolicy::Native)]
#[case::check_then_insert(ConflictPolicy::CheckThenInsert)]
fn test_build_is_idempotent(#[case] policy: ConflictPolicy) {
    let catalog = Catalog::open_in_memory().unwrap();
    let config = config(policy);
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();

    let first = builder.build_line(LINE, 1).unwrap();
    let second = builder.build_line(LINE, 1).unwrap();
    assert_eq!(first, second);

    assert_eq!(catalog.row_count(CatalogTable::Planet).unwrap(), 2);
    assert_eq!(catalog.row_count(CatalogTable::Asteroid).unwrap(), 1);
    assert_eq!(catalog.row_count(CatalogTable::ThreeBodyResonance).unwrap(), 1);

    let stored = catalog.resonance(ResonanceKind::ThreeBody, first).unwrap();
    assert_eq!(stored.asteroid, 1);
    assert_eq!(stored.coefficients.as_table_order(), vec![4, -2, -1, 0, 0, -1]);
    assert_eq!(stored.to_string(), "JUPITER-SATURN-A1 [4 -2 -1 0 0 -1] (a=2.5000)");
}

#[rstest]
#[case::native(ConflictPolicy::Native)]
#[case::check_then_insert(ConflictPolicy::CheckThenInsert)]
fn test_planets_shared_between_asteroids(#[case] policy: ConflictPolicy) {
    let catalog = Catalog::open_in_memory().unwrap();
    let config = config(policy);
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();

    for asteroid in 1..=3 {
        builder.build_line(LINE, asteroid).unwrap();
    }
    assert_eq!(catalog.row_count(CatalogTable::Planet).unwrap(), 2);
    assert_eq!(catalog.row_count(CatalogTable::Asteroid).unwrap(), 3);
    assert_eq!(catalog.row_count(CatalogTable::ThreeBodyResonance).unwrap(), 3);
}

#[test]
fn test_stale_sequence_recovers() {
    let catalog = Catalog::open_in_memory().unwrap();
    let config = config(ConflictPolicy::Native);
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();

    assert_eq!(builder.build_line(LINE, 1).unwrap(), 1);

    catalog
        .reset_sequence(CatalogTable::ThreeBodyResonance, 1)
        .unwrap();
    assert_eq!(builder.build_line(LINE, 2).unwrap(), 2);
    assert_eq!(
        peek_sequence(catalog.connection(), CatalogTable::ThreeBodyResonance).unwrap(),
        Some(3)
    );
    assert_eq!(catalog.row_count(CatalogTable::ThreeBodyResonance).unwrap(), 2);
}

#[test]
fn test_rejected_rows_leave_no_trace() {
    let catalog = Catalog::open_in_memory().unwrap();
    let config = config(ConflictPolicy::Native);
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();

    assert_eq!(
        builder.build_line("4 -2 -1 0 0 0 2.5", 1),
        Err(ResonanceError::DAlembertViolation(vec![4, -2, -1, 0, 0, 0]))
    );
    assert!(matches!(
        builder.build_line("4 -1 0 -1 2.5", 1),
        Err(ResonanceError::CoefficientParse { .. })
    ));
    assert_eq!(catalog.row_count(CatalogTable::Planet).unwrap(), 0);
    assert_eq!(catalog.row_count(CatalogTable::ThreeBodyResonance).unwrap(), 0);
}

#[test]
fn test_broken_marker_written_once() {
    let catalog = Catalog::open_in_memory().unwrap();

    assert!(catalog.mark_broken(7, Some("no rows")).unwrap());
    assert!(!catalog.mark_broken(7, Some("other reason")).unwrap());
    assert!(catalog.is_broken(7).unwrap());
    assert!(!catalog.is_broken(8).unwrap());

    let broken = catalog.broken_asteroids().unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].name, "A7");
    assert_eq!(broken[0].reason.as_deref(), Some("no rows"));
}

#[test]
fn test_catalog_file_persists() {
    let dir = AeiDir::new();
    let path = dir.file("catalog.sqlite");
    let config = config(ConflictPolicy::Native);

    let id = {
        let catalog = Catalog::open(&path).unwrap();
        let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();
        let id = builder.build_line(LINE, 5).unwrap();
        catalog
            .upsert_libration(
                ResonanceKind::ThreeBody,
                &Libration {
                    resonance_id: id,
                    circulation_breaks: vec![1200.0],
                    average_delta: None,
                    percentage: None,
                    is_apocentric: false,
                },
            )
            .unwrap();
        catalog.mark_broken(6, None).unwrap();
        id
    };

    let catalog = Catalog::open(&path).unwrap();
    assert!(catalog.is_broken(6).unwrap());
    let librations = catalog
        .librations_for_asteroid(ResonanceKind::ThreeBody, 5, LibrationFilter::Pure)
        .unwrap();
    assert_eq!(librations.len(), 1);
    assert_eq!(librations[0].resonance_id, id);
    assert_eq!(librations[0].circulation_breaks, vec![1200.0]);

    // the counter survives the reopen
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();
    assert!(builder.build_line(LINE, 9).unwrap() > id);
}

#[test]
fn test_filters_agree_with_predicates() {
    let catalog = Catalog::open_in_memory().unwrap();
    let config = config(ConflictPolicy::Native);
    let builder = ResonanceCatalogBuilder::new(&catalog, &config).unwrap();

    let librations = [
        (vec![], None, None),
        (vec![10.0], None, None),
        (vec![10.0, 30_000.0], Some(15_000.0), Some(29.99)),
        (vec![10.0, 20.0, 30.0], None, None),
        (vec![10.0, 20.0], Some(10.0), None),
    ];
    for (asteroid, (breaks, average_delta, percentage)) in (1..).zip(librations) {
        let id = builder.build_line(LINE, asteroid).unwrap();
        catalog
            .upsert_libration(
                ResonanceKind::ThreeBody,
                &Libration {
                    resonance_id: id,
                    circulation_breaks: breaks,
                    average_delta,
                    percentage,
                    is_apocentric: false,
                },
            )
            .unwrap();
    }

    let all = catalog
        .librations_in_range(ResonanceKind::ThreeBody, 1..=5, LibrationFilter::All)
        .unwrap();
    assert_eq!(all.len(), 5);

    for filter in [LibrationFilter::Pure, LibrationFilter::Transient] {
        let selected: Vec<u32> = catalog
            .librations_in_range(ResonanceKind::ThreeBody, 1..=5, filter)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        let expected: Vec<u32> = all
            .iter()
            .filter(|(_, l)| filter.accepts(l))
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(selected, expected, "{filter:?}");
    }
}
