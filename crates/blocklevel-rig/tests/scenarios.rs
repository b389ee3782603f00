//! Scenario runs against the simulated block

use std::io::Write;

use approx::assert_relative_eq;

use blocklevel_core::control::{Leveler, LevelingReport, Outcome};
use blocklevel_core::simulation::SimulatedBlock;
use blocklevel_rig::scenarios::{Scenario, REFERENCE_FLOOR_MM};
use blocklevel_rig::{ConfigError, RigConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(config: &RigConfig) -> (LevelingReport, SimulatedBlock) {
    let mut block = SimulatedBlock::new(config.plant.clone()).unwrap();
    let mut leveler = Leveler::new(config.leveler.clone(), config.estimator.clone()).unwrap();
    let report = leveler.run(&mut block).unwrap();
    (report, block)
}

#[test]
fn test_reference_trapezoid_stays_above_floor() {
    init_logging();
    for seed in [1, 42] {
        let config = Scenario::Reference.config(seed);
        let (report, block) = run(&config);

        assert!(
            matches!(report.outcome, Outcome::Converged | Outcome::MaxIterations),
            "seed {seed}: {:?}",
            report.outcome
        );
        assert!(report.iterations <= 50);
        assert_eq!(config.leveler.low_limit, REFERENCE_FLOOR_MM);
        // Pistons only lower the block, so the whole plate sinks toward the
        // low corners; the run must stay clear of the floor while doing so
        let lowest = block.history().lowest_corner();
        assert!(lowest < -5.0, "seed {seed}: lowest corner {lowest}");
        assert!(lowest >= REFERENCE_FLOOR_MM, "seed {seed}: lowest corner {lowest}");
    }
}

#[test]
fn test_settle_converges_within_corner_tolerance() {
    init_logging();
    for seed in [3, 11, 2024] {
        let config = Scenario::Settle.config(seed);
        let (report, block) = run(&config);

        assert_eq!(report.outcome, Outcome::Converged, "seed {seed}");
        assert!(report.iterations >= 1);
        assert!(block.corners().max_abs_deviation() <= config.leveler.tolerance.corner);
        assert!(report.history.last().unwrap().converged);
    }
}

#[test]
fn test_config_file_replays_scenario() {
    let config = Scenario::Reference.config(5);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", config.to_json_pretty().unwrap()).unwrap();

    let loaded = RigConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded.leveler.low_limit, REFERENCE_FLOOR_MM);

    let mut short = loaded.clone();
    short.leveler.max_iterations = 3;
    let mut original = config.clone();
    original.leveler.max_iterations = 3;

    let (a, _) = run(&short);
    let (b, _) = run(&original);
    assert_eq!(a.iterations, b.iterations);
    assert_relative_eq!(a.final_state.tilt_x, b.final_state.tilt_x, epsilon = 1e-9);
    assert_relative_eq!(a.final_state.tilt_y, b.final_state.tilt_y, epsilon = 1e-9);
    assert_relative_eq!(a.final_state.height, b.final_state.height, epsilon = 1e-6);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RigConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
