mod registry;
mod transition;

use std::time::Duration;

use graphconfig::{GraphSettings, TransitionMode};
use rand::prelude::*;

pub use registry::{FunctionId, FunctionRegistry};
pub use transition::{Phase, PhaseChange, TransitionState};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("function '{0}' is not registered")]
    UnknownFunction(String),
    #[error("function registry must contain at least one function")]
    EmptyRegistry,
    #[error("function '{0}' is registered twice")]
    DuplicateFunction(String),
}

/// Drives the transition state machine and picks follow-up functions from
/// the registry with a seeded RNG.
pub struct FunctionScheduler {
    registry: FunctionRegistry,
    mode: TransitionMode,
    state: TransitionState,
    rng: StdRng,
    warned_single_random: bool,
}

impl FunctionScheduler {
    /// Starts steady on `settings.function`. Without a configured seed the
    /// RNG is seeded from OS entropy.
    pub fn new(registry: FunctionRegistry, settings: &GraphSettings) -> Result<Self, SchedulerError> {
        let initial = registry.lookup(&settings.function)?;
        let state = TransitionState::new(
            initial,
            settings.function_duration,
            settings.transition_duration,
        );
        Ok(Self {
            registry,
            mode: settings.transition_mode,
            state,
            rng: settings
                .seed
                .map(StdRng::seed_from_u64)
                .unwrap_or_else(StdRng::from_entropy),
            warned_single_random: false,
        })
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    pub fn mode(&self) -> TransitionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TransitionMode) {
        self.mode = mode;
    }

    pub fn set_function_duration(&mut self, duration: Duration) {
        self.state.set_function_duration(duration);
    }

    pub fn set_transition_duration(&mut self, duration: Duration) {
        self.state.set_transition_duration(duration);
    }

    pub fn advance(&mut self, delta_seconds: f32) -> Option<PhaseChange> {
        let Self {
            registry,
            mode,
            state,
            rng,
            warned_single_random,
        } = self;
        state.advance(delta_seconds, |current| {
            pick_next(registry, *mode, current, rng, warned_single_random)
        })
    }

    pub fn skip(&mut self) -> Option<PhaseChange> {
        let Self {
            registry,
            mode,
            state,
            rng,
            warned_single_random,
        } = self;
        state.skip(|current| pick_next(registry, *mode, current, rng, warned_single_random))
    }
}

fn pick_next(
    registry: &FunctionRegistry,
    mode: TransitionMode,
    current: FunctionId,
    rng: &mut StdRng,
    warned: &mut bool,
) -> FunctionId {
    match registry.next(mode, current, rng) {
        Some(next) => next,
        None => {
            // Random mode over a single function: blend the function into itself.
            if !*warned {
                tracing::warn!(
                    function = registry.name(current),
                    "random transition requested with a single registered function; keeping it"
                );
                *warned = true;
            }
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(function: &str, mode: TransitionMode, seed: u64) -> GraphSettings {
        GraphSettings {
            function: function.into(),
            transition_mode: mode,
            seed: Some(seed),
            function_duration: Duration::from_secs_f32(1.0),
            transition_duration: Duration::from_secs_f32(0.5),
            ..GraphSettings::default()
        }
    }

    fn library() -> FunctionRegistry {
        FunctionRegistry::new(["wave", "multi_wave", "ripple", "sphere", "torus"]).unwrap()
    }

    #[test]
    fn cycles_through_library() {
        let mut scheduler =
            FunctionScheduler::new(library(), &settings("sphere", TransitionMode::Cycle, 1))
                .unwrap();
        let first = scheduler.advance(1.0);
        assert_eq!(
            first,
            Some(PhaseChange::TransitionStarted {
                from: FunctionId::new(3),
                to: FunctionId::new(4),
            })
        );
        scheduler.advance(0.5);
        let second = scheduler.advance(1.0);
        assert_eq!(
            second,
            Some(PhaseChange::TransitionStarted {
                from: FunctionId::new(4),
                to: FunctionId::new(0),
            })
        );
    }

    #[test]
    fn random_mode_never_stays_put() {
        let mut scheduler =
            FunctionScheduler::new(library(), &settings("wave", TransitionMode::Random, 42))
                .unwrap();
        for _ in 0..200 {
            if let Some(PhaseChange::TransitionStarted { from, to }) = scheduler.skip() {
                assert_ne!(from, to);
            }
            scheduler.advance(0.5);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let run = |seed| {
            let mut scheduler =
                FunctionScheduler::new(library(), &settings("wave", TransitionMode::Random, seed))
                    .unwrap();
            (0..20)
                .filter_map(|_| {
                    let change = scheduler.skip();
                    scheduler.advance(0.5);
                    change
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn single_function_random_blends_into_itself() {
        let registry = FunctionRegistry::new(["only"]).unwrap();
        let mut scheduler =
            FunctionScheduler::new(registry, &settings("only", TransitionMode::Random, 3)).unwrap();
        let change = scheduler.advance(1.0);
        assert_eq!(
            change,
            Some(PhaseChange::TransitionStarted {
                from: FunctionId::new(0),
                to: FunctionId::new(0),
            })
        );
        assert!(scheduler.state().is_transitioning());
    }

    #[test]
    fn unknown_initial_function_is_rejected() {
        let err = FunctionScheduler::new(library(), &settings("spiral", TransitionMode::Cycle, 0))
            .err()
            .expect("unknown function");
        assert!(matches!(err, SchedulerError::UnknownFunction(name) if name == "spiral"));
    }

    #[test]
    fn runtime_setters_apply_to_next_phase() {
        let mut scheduler =
            FunctionScheduler::new(library(), &settings("wave", TransitionMode::Cycle, 0))
                .unwrap();
        scheduler.set_function_duration(Duration::from_secs(3));
        assert_eq!(scheduler.advance(1.5), None);
        scheduler.set_mode(TransitionMode::Random);
        assert_eq!(scheduler.mode(), TransitionMode::Random);
        assert!(scheduler.advance(1.5).is_some());
    }
}
