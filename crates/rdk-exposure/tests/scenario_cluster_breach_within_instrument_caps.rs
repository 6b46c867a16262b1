use rdk_config::{ClusterConfig, EngineConfig};
use rdk_exposure::evaluate;
use rdk_schemas::{Direction, Position, MICROS_SCALE};

// Two correlated pairs, each comfortably inside its own cap, must still
// trigger the combined cluster cap. This is the whole point of clusters: a
// shared driver makes the two exposures one trade.
#[test]
fn scenario_correlated_pairs_breach_cluster_cap_only() {
    let mut cfg = EngineConfig::sane_defaults();
    cfg.instrument_caps_micros
        .insert("EURUSD".into(), 40_000 * MICROS_SCALE);
    cfg.instrument_caps_micros
        .insert("GBPUSD".into(), 40_000 * MICROS_SCALE);
    cfg.clusters = vec![ClusterConfig {
        cluster_id: "usd-majors".into(),
        members: vec!["EURUSD".into(), "GBPUSD".into()],
        cap_micros: 60_000 * MICROS_SCALE,
    }];
    cfg.validate().unwrap();

    let positions = vec![
        Position::new("EURUSD", 35_000 * MICROS_SCALE, Direction::Long),
        Position::new("GBPUSD", 35_000 * MICROS_SCALE, Direction::Long),
    ];

    let report = evaluate(&positions, &cfg);

    assert!(report.instrument_breaches.is_empty());
    assert_eq!(report.breached_clusters(), vec!["usd-majors".to_string()]);
    assert_eq!(
        report.per_cluster_net_micros["usd-majors"],
        70_000 * MICROS_SCALE
    );
}
