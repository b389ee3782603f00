//! Leveling state machine
//!
//! ```text
//! Init ─► Identify ─► Solve ─► Actuate ─► Evaluate ─┬─► Converged
//!            ▲                                      ├─► DivergedUnsafe
//!            └──────────────────────────────────────┤
//!                                                   └─► MaxIterations
//! ```
//!
//! Every outer iteration re-identifies the response matrix, solves for the
//! corrective powers and applies them. The loop only exits at iteration
//! boundaries, and a safety breach stops all further actuation.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::estimation::{EstimatorConfig, State, StateEstimator};
use crate::identification::{Identification, ResponseIdentifier};
use crate::plant::{Corner, CornerSet};
use crate::rig::{pause, LevelingRig};
use crate::{LevelError, LevelResult, Powers, ResponseMatrix, NUM_CORNERS};

use super::{ControlLaw, LevelerConfig};

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reset, warm-up and initial read
    Init,
    /// Calibration pulses on each corner
    Identify,
    /// Pseudoinverse solve and projection
    Solve,
    /// Corrective pulses
    Actuate,
    /// Re-read, safety and convergence checks
    Evaluate,
    /// Session finished
    Done,
}

/// How a leveling session ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Converged,
    /// A corner (or raw laser reading) fell below the low limit
    DivergedUnsafe { min_height_mm: f64, limit_mm: f64 },
    MaxIterations,
}

/// Diagnostics for one outer iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: usize,
    /// State the step was solved for
    pub state_before: State,
    pub response: ResponseMatrix,
    /// Commanded powers after projection
    pub powers: Powers,
    /// Corners actually pulsed (power above the minimum)
    pub applied: [bool; NUM_CORNERS],
    pub state_after: State,
    /// ‖state_after ./ tol‖₂
    pub normalized_error: f64,
    /// max |corner height| when the rig knows it [mm]
    pub corner_deviation: Option<f64>,
    pub converged: bool,
}

/// Result of a leveling session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelingReport {
    pub outcome: Outcome,
    /// Completed outer iterations
    pub iterations: usize,
    pub initial_state: State,
    pub final_state: State,
    /// Ground-truth corners at the end, if the rig exposes them
    pub final_corners: Option<CornerSet>,
    pub history: Vec<IterationRecord>,
}

impl LevelingReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }

    /// Turn an unsafe outcome into [`LevelError::UnsafeState`]
    pub fn into_result(self) -> LevelResult<Self> {
        match self.outcome {
            Outcome::DivergedUnsafe {
                min_height_mm,
                limit_mm,
            } => Err(LevelError::UnsafeState {
                min_height_mm,
                limit_mm,
            }),
            _ => Ok(self),
        }
    }
}

/// Next transition of the state machine
enum Step {
    Identify,
    Solve(Identification),
    Actuate(Identification, Powers),
    Evaluate(Identification, Powers, [bool; NUM_CORNERS]),
    Finish(Outcome),
}

/// Closed-loop block leveler
#[derive(Debug, Clone)]
pub struct Leveler {
    config: LevelerConfig,
    estimator: StateEstimator,
    identifier: ResponseIdentifier,
    law: ControlLaw,
    phase: Phase,
}

impl Leveler {
    pub fn new(config: LevelerConfig, estimator: EstimatorConfig) -> LevelResult<Self> {
        config.validate()?;
        Ok(Self {
            estimator: StateEstimator::new(estimator)?,
            identifier: ResponseIdentifier::new(config.test_power, config.settle())?,
            law: ControlLaw::from_config(&config),
            phase: Phase::Init,
            config,
        })
    }

    pub fn config(&self) -> &LevelerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &StateEstimator {
        &self.estimator
    }

    /// Phase reached by the latest run
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Level the block on `rig`
    ///
    /// Rig errors other than absorbed sensor faults abort the session and
    /// are returned as `Err`. Unsafe and unconverged sessions are reported
    /// through [`LevelingReport::outcome`].
    pub fn run<R: LevelingRig + ?Sized>(&mut self, rig: &mut R) -> LevelResult<LevelingReport> {
        self.enter(Phase::Init);
        self.estimator.reset();

        if let Some(power) = self.config.warmup_power {
            debug!("warm-up pulse {power:.3} on all corners");
            self.pulse_all(rig, power)?;
        }

        let initial = self.estimator.read(rig)?;
        info!("initial state: {initial}");

        let mut report = LevelingReport {
            outcome: Outcome::MaxIterations,
            iterations: 0,
            initial_state: initial,
            final_state: initial,
            final_corners: None,
            history: Vec::new(),
        };

        let mut step = if let Some(outcome) = self.safety_breach(rig) {
            Step::Finish(outcome)
        } else if self.is_converged(&initial, rig) {
            Step::Finish(Outcome::Converged)
        } else if self.config.max_iterations == 0 {
            Step::Finish(Outcome::MaxIterations)
        } else {
            Step::Identify
        };

        loop {
            step = match step {
                Step::Identify => {
                    self.enter(Phase::Identify);
                    let identification = self.identifier.identify(rig, &mut self.estimator)?;
                    match self.safety_breach(rig) {
                        Some(outcome) => Step::Finish(outcome),
                        None => Step::Solve(identification),
                    }
                }
                Step::Solve(identification) => {
                    self.enter(Phase::Solve);
                    let powers = self.law.solve(&identification.response, &identification.state);
                    debug!(
                        "powers A={:.4} B={:.4} C={:.4} D={:.4}",
                        powers[0], powers[1], powers[2], powers[3]
                    );
                    Step::Actuate(identification, powers)
                }
                Step::Actuate(identification, powers) => {
                    self.enter(Phase::Actuate);
                    let mut applied = [false; NUM_CORNERS];
                    for corner in Corner::ALL {
                        let power = powers[corner.index()];
                        if power > self.config.min_power {
                            rig.actuate(corner, power)?;
                            pause(self.config.settle());
                            applied[corner.index()] = true;
                        }
                    }
                    Step::Evaluate(identification, powers, applied)
                }
                Step::Evaluate(identification, powers, applied) => {
                    self.enter(Phase::Evaluate);
                    let after = self.estimator.read(rig)?;
                    let tol = &self.config.tolerance;
                    let normalized_error = after.normalized_error(tol);
                    let corner_deviation = rig.corner_heights().map(|c| c.max_abs_deviation());
                    let converged = self.is_converged(&after, rig);

                    report.iterations += 1;
                    report.final_state = after;
                    info!(
                        "iteration {}: {after} | error {normalized_error:.3}{}",
                        report.iterations,
                        corner_deviation
                            .map(|d| format!(" | max corner {d:.3} mm"))
                            .unwrap_or_default()
                    );
                    report.history.push(IterationRecord {
                        iteration: report.iterations,
                        state_before: identification.state,
                        response: identification.response,
                        powers,
                        applied,
                        state_after: after,
                        normalized_error,
                        corner_deviation,
                        converged,
                    });

                    if let Some(outcome) = self.safety_breach(rig) {
                        Step::Finish(outcome)
                    } else if converged {
                        Step::Finish(Outcome::Converged)
                    } else if report.iterations >= self.config.max_iterations {
                        Step::Finish(Outcome::MaxIterations)
                    } else {
                        Step::Identify
                    }
                }
                Step::Finish(outcome) => {
                    self.enter(Phase::Done);
                    report.outcome = outcome;
                    report.final_corners = rig.corner_heights();
                    info!(
                        "leveling finished after {} iterations: {outcome:?}",
                        report.iterations
                    );
                    return Ok(report);
                }
            };
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!("phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    fn pulse_all<R: LevelingRig + ?Sized>(&self, rig: &mut R, power: f64) -> LevelResult<()> {
        for corner in Corner::ALL {
            rig.actuate(corner, power)?;
            pause(self.config.settle());
        }
        Ok(())
    }

    /// State inside tolerance and, with ground truth, every corner too
    fn is_converged<R: LevelingRig + ?Sized>(&self, state: &State, rig: &R) -> bool {
        let tol = &self.config.tolerance;
        state.normalized_error(tol) < 1.0
            && rig
                .corner_heights()
                .map_or(true, |c| c.max_abs_deviation() <= tol.corner)
    }

    /// Lowest corner (simulation) or raw laser reading (hardware) below the limit
    fn safety_breach<R: LevelingRig + ?Sized>(&self, rig: &R) -> Option<Outcome> {
        let lowest = rig
            .corner_heights()
            .map(|c| c.min())
            .or(self.estimator.last_min_raw())?;

        if lowest < self.config.low_limit {
            warn!(
                "block too low: {lowest:.3} mm below limit {:.3} mm, stopping",
                self.config.low_limit
            );
            Some(Outcome::DivergedUnsafe {
                min_height_mm: lowest,
                limit_mm: self.config.low_limit,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::HeightFilterParams;
    use crate::simulation::{PlantConfig, SimulatedBlock};

    fn quiet_estimator() -> EstimatorConfig {
        EstimatorConfig {
            samples: 1,
            sample_interval_ms: 0,
            filter: HeightFilterParams::pass_through(),
        }
    }

    #[test]
    fn test_level_block_converges_immediately() {
        let config = PlantConfig::default()
            .noiseless()
            .with_initial_heights(CornerSet::uniform(0.0));
        let mut block = SimulatedBlock::new(config).unwrap();
        let mut leveler = Leveler::new(LevelerConfig::default(), quiet_estimator()).unwrap();

        let report = leveler.run(&mut block).unwrap();
        assert_eq!(report.outcome, Outcome::Converged);
        assert_eq!(report.iterations, 0);
        assert!(block.history().is_empty());
        assert_eq!(leveler.phase(), Phase::Done);
    }

    #[test]
    fn test_zero_budget_stops_before_actuating() {
        let config = PlantConfig::default().noiseless();
        let mut block = SimulatedBlock::new(config).unwrap();
        let leveler_config = LevelerConfig {
            max_iterations: 0,
            low_limit: -100.0,
            ..LevelerConfig::default()
        };
        let mut leveler = Leveler::new(leveler_config, quiet_estimator()).unwrap();

        let report = leveler.run(&mut block).unwrap();
        assert_eq!(report.outcome, Outcome::MaxIterations);
        assert!(block.history().is_empty());
    }

    #[test]
    fn test_warmup_pulses_every_corner() {
        let config = PlantConfig::default()
            .noiseless()
            .with_initial_heights(CornerSet::uniform(0.1));
        let mut block = SimulatedBlock::new(config).unwrap();
        let leveler_config = LevelerConfig {
            warmup_power: Some(0.02),
            ..LevelerConfig::default()
        };
        let mut leveler = Leveler::new(leveler_config, quiet_estimator()).unwrap();

        let report = leveler.run(&mut block).unwrap();
        // 0.1 mm − 0.02 · 5 mm leaves the block flush
        assert_eq!(report.outcome, Outcome::Converged);
        let warmup: Vec<Corner> = block.history().actuations.iter().map(|a| a.corner).collect();
        assert_eq!(warmup, Corner::ALL.to_vec());
    }

    #[test]
    fn test_unsafe_report_converts_to_error() {
        let report = LevelingReport {
            outcome: Outcome::DivergedUnsafe {
                min_height_mm: -1.0,
                limit_mm: -0.7,
            },
            iterations: 0,
            initial_state: State::default(),
            final_state: State::default(),
            final_corners: None,
            history: Vec::new(),
        };
        assert!(!report.is_converged());
        assert_eq!(
            report.into_result().unwrap_err(),
            LevelError::UnsafeState {
                min_height_mm: -1.0,
                limit_mm: -0.7
            }
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LevelerConfig {
            test_power: 0.0,
            ..LevelerConfig::default()
        };
        assert!(Leveler::new(config, EstimatorConfig::default()).is_err());
    }
}
