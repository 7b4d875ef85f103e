use std::time::Duration;

use crate::registry::FunctionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Steady,
    Transitioning,
}

/// Emitted by [`TransitionState::advance`] when the phase flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    TransitionStarted { from: FunctionId, to: FunctionId },
    TransitionFinished { function: FunctionId },
}

/// Two-state machine alternating between showing one function and blending
/// from the previous function into the current one.
///
/// `elapsed` counts seconds since the last flip. Flips subtract the finished
/// period instead of zeroing so overshoot carries into the next phase.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionState {
    current: FunctionId,
    source: Option<FunctionId>,
    elapsed: f32,
    function_duration: f32,
    transition_duration: f32,
}

impl TransitionState {
    pub fn new(initial: FunctionId, function_duration: Duration, transition_duration: Duration) -> Self {
        Self {
            current: initial,
            source: None,
            elapsed: 0.0,
            function_duration: function_duration.as_secs_f32(),
            transition_duration: transition_duration.as_secs_f32(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.source.is_some() {
            Phase::Transitioning
        } else {
            Phase::Steady
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.source.is_some()
    }

    /// Function being shown, or blended towards while transitioning.
    pub fn current_function(&self) -> FunctionId {
        self.current
    }

    /// Function being blended away from; `None` while steady.
    pub fn transition_function(&self) -> Option<FunctionId> {
        self.source
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn function_duration(&self) -> f32 {
        self.function_duration
    }

    pub fn transition_duration(&self) -> f32 {
        self.transition_duration
    }

    pub fn set_function_duration(&mut self, duration: Duration) {
        self.function_duration = duration.as_secs_f32();
    }

    pub fn set_transition_duration(&mut self, duration: Duration) {
        self.transition_duration = duration.as_secs_f32();
    }

    /// Adds one frame of time and applies at most one phase flip.
    ///
    /// `pick_next` runs only when a steady period ends and receives the
    /// function that was active before the flip.
    pub fn advance<F>(&mut self, delta_seconds: f32, pick_next: F) -> Option<PhaseChange>
    where
        F: FnOnce(FunctionId) -> FunctionId,
    {
        assert!(
            delta_seconds.is_finite() && delta_seconds >= 0.0,
            "frame delta must be finite and non-negative, got {delta_seconds}"
        );
        self.elapsed += delta_seconds;

        match self.source {
            Some(_) => {
                if self.elapsed >= self.transition_duration {
                    self.elapsed -= self.transition_duration;
                    self.source = None;
                    Some(PhaseChange::TransitionFinished {
                        function: self.current,
                    })
                } else {
                    None
                }
            }
            None => {
                if self.elapsed >= self.function_duration {
                    self.elapsed -= self.function_duration;
                    Some(self.begin_transition(pick_next))
                } else {
                    None
                }
            }
        }
    }

    /// Ends the steady period immediately. No-op while transitioning.
    pub fn skip<F>(&mut self, pick_next: F) -> Option<PhaseChange>
    where
        F: FnOnce(FunctionId) -> FunctionId,
    {
        if self.source.is_some() {
            return None;
        }
        self.elapsed = 0.0;
        Some(self.begin_transition(pick_next))
    }

    fn begin_transition<F>(&mut self, pick_next: F) -> PhaseChange
    where
        F: FnOnce(FunctionId) -> FunctionId,
    {
        let from = self.current;
        self.source = Some(from);
        self.current = pick_next(from);
        PhaseChange::TransitionStarted {
            from,
            to: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(id: FunctionId) -> FunctionId {
        FunctionId::new((id.index() + 1) % 5)
    }

    #[test]
    fn flips_once_and_carries_overshoot() {
        let mut state = TransitionState::new(
            FunctionId::new(3),
            Duration::from_secs_f32(1.0),
            Duration::from_secs_f32(0.5),
        );

        assert_eq!(state.advance(0.4, next), None);
        assert_eq!(state.advance(0.4, next), None);
        let change = state.advance(0.4, next);

        assert_eq!(
            change,
            Some(PhaseChange::TransitionStarted {
                from: FunctionId::new(3),
                to: FunctionId::new(4),
            })
        );
        assert_eq!(state.phase(), Phase::Transitioning);
        assert_eq!(state.transition_function(), Some(FunctionId::new(3)));
        assert_eq!(state.current_function(), FunctionId::new(4));
        assert!((state.elapsed() - 0.2).abs() < 1e-5, "elapsed {}", state.elapsed());
    }

    #[test]
    fn transition_returns_to_steady_with_remainder() {
        let mut state = TransitionState::new(
            FunctionId::new(0),
            Duration::from_secs_f32(1.0),
            Duration::from_secs_f32(0.5),
        );
        state.advance(1.25, next);
        assert!(state.is_transitioning());

        let change = state.advance(0.5, next);
        assert_eq!(
            change,
            Some(PhaseChange::TransitionFinished {
                function: FunctionId::new(1)
            })
        );
        assert_eq!(state.phase(), Phase::Steady);
        assert_eq!(state.transition_function(), None);
        assert!((state.elapsed() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn at_most_one_flip_per_frame() {
        let mut state = TransitionState::new(
            FunctionId::new(0),
            Duration::from_secs_f32(1.0),
            Duration::from_secs_f32(1.0),
        );
        let change = state.advance(10.0, next);
        assert!(matches!(change, Some(PhaseChange::TransitionStarted { .. })));
        assert!((state.elapsed() - 9.0).abs() < 1e-5);

        let change = state.advance(0.0, next);
        assert!(matches!(change, Some(PhaseChange::TransitionFinished { .. })));
        assert!((state.elapsed() - 8.0).abs() < 1e-5);
    }

    #[test]
    fn zero_function_duration_flips_every_steady_frame() {
        let mut state = TransitionState::new(FunctionId::new(0), Duration::ZERO, Duration::ZERO);
        let mut started = 0;
        for _ in 0..10 {
            if let Some(PhaseChange::TransitionStarted { .. }) = state.advance(0.016, next) {
                started += 1;
            }
        }
        assert_eq!(started, 5);
        assert_eq!(state.current_function(), FunctionId::new(0));
    }

    #[test]
    fn pick_next_only_runs_on_steady_expiry() {
        let mut state = TransitionState::new(
            FunctionId::new(2),
            Duration::from_secs(5),
            Duration::from_secs(1),
        );
        state.advance(1.0, |_| panic!("picked before the steady period ended"));
        assert_eq!(state.phase(), Phase::Steady);
    }

    #[test]
    fn skip_starts_transition_without_overshoot() {
        let mut state = TransitionState::new(
            FunctionId::new(1),
            Duration::from_secs(5),
            Duration::from_secs(1),
        );
        state.advance(2.0, next);
        let change = state.skip(next);
        assert_eq!(
            change,
            Some(PhaseChange::TransitionStarted {
                from: FunctionId::new(1),
                to: FunctionId::new(2),
            })
        );
        assert_eq!(state.elapsed(), 0.0);
        assert_eq!(state.skip(next), None);
    }

    #[test]
    #[should_panic(expected = "frame delta")]
    fn negative_delta_is_fatal() {
        let mut state = TransitionState::new(
            FunctionId::new(0),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        state.advance(-0.1, next);
    }
}
