use std::fmt;

use scheduler::{FunctionId, TransitionState};

/// Threads per work-group along x and y; must match `@workgroup_size` in the
/// generated kernels.
pub const WORKGROUP_SIZE: u32 = 8;

/// Width of the logical `[-1, 1]` domain the grid is mapped onto.
pub const DOMAIN_EXTENT: f32 = 2.0;

/// Index into the flattened `N x N` table of (from, to) kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelSelector(u32);

impl KernelSelector {
    /// `target + source * function_count`.
    pub fn new(source: FunctionId, target: FunctionId, function_count: u32) -> Self {
        debug_assert!(source.index() < function_count && target.index() < function_count);
        KernelSelector(target.index() + source.index() * function_count)
    }

    /// Diagonal entry while steady, (previous, current) pair while transitioning.
    pub fn for_state(state: &TransitionState, function_count: u32) -> Self {
        let target = state.current_function();
        let source = state.transition_function().unwrap_or(target);
        Self::new(source, target, function_count)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// Splits the selector back into its (source, target) pair.
    pub fn pair(self, function_count: u32) -> (FunctionId, FunctionId) {
        (
            FunctionId::new(self.0 / function_count),
            FunctionId::new(self.0 % function_count),
        )
    }

    /// Number of kernels a library of `function_count` functions must register.
    pub fn table_size(function_count: u32) -> u32 {
        function_count * function_count
    }
}

impl fmt::Display for KernelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel {}", self.0)
    }
}

pub fn step_for_resolution(resolution: u32) -> f32 {
    assert!(resolution > 0, "graph resolution must be positive");
    DOMAIN_EXTENT / resolution as f32
}

/// Work-groups per axis so that `groups * WORKGROUP_SIZE >= resolution`.
pub fn group_count(resolution: u32) -> u32 {
    assert!(resolution > 0, "graph resolution must be positive");
    resolution.div_ceil(WORKGROUP_SIZE)
}

/// Cubic Hermite ease `3t^2 - 2t^3` over `t` clamped to `[0, 1]`.
pub fn smoothstep(t: f32) -> f32 {
    let clamped = t.clamp(0.0, 1.0);
    clamped * clamped * (3.0 - 2.0 * clamped)
}

pub fn transition_progress(elapsed: f32, transition_duration: f32) -> f32 {
    if transition_duration <= 0.0 {
        return 1.0;
    }
    smoothstep(elapsed / transition_duration)
}

/// Everything the compute stage needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchPlan {
    pub kernel: KernelSelector,
    pub resolution: u32,
    pub step: f32,
    pub groups: [u32; 3],
    /// Blend factor between source and target; `None` while steady.
    pub transition_progress: Option<f32>,
}

impl DispatchPlan {
    pub fn new(state: &TransitionState, resolution: u32, function_count: u32) -> Self {
        let step = step_for_resolution(resolution);
        let groups = group_count(resolution);
        let transition_progress = state
            .is_transitioning()
            .then(|| transition_progress(state.elapsed(), state.transition_duration()));
        Self {
            kernel: KernelSelector::for_state(state, function_count),
            resolution,
            step,
            groups: [groups, groups, 1],
            transition_progress,
        }
    }

    /// Panics unless the selector addresses one of `kernel_count` kernels.
    pub fn ensure_registered(&self, kernel_count: u32) {
        assert!(
            self.kernel.index() < kernel_count,
            "{} is outside the registered kernel table of {kernel_count} entries",
            self.kernel
        );
    }
}

#[cfg(test)]
impl DispatchPlan {
    /// Invocations launched along one axis, including the guarded overhang.
    pub fn invocations_per_axis(&self) -> u32 {
        self.groups[0] * WORKGROUP_SIZE
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use graphconfig::{MAX_RESOLUTION, MIN_RESOLUTION};

    use super::*;

    const COUNT: u32 = 5;

    fn state(initial: u32, transition: f32) -> TransitionState {
        TransitionState::new(
            FunctionId::new(initial),
            Duration::from_secs(1),
            Duration::from_secs_f32(transition),
        )
    }

    #[test]
    fn group_count_covers_every_resolution_exactly() {
        for resolution in MIN_RESOLUTION..=MAX_RESOLUTION {
            let groups = group_count(resolution);
            assert!(groups * WORKGROUP_SIZE >= resolution, "under-dispatch at {resolution}");
            assert!((groups - 1) * WORKGROUP_SIZE < resolution, "over-dispatch at {resolution}");
        }
    }

    #[test]
    fn step_maps_grid_onto_unit_domain() {
        assert_eq!(step_for_resolution(10), 0.2);
        assert_eq!(step_for_resolution(1000), 0.002);
    }

    #[test]
    #[should_panic(expected = "resolution must be positive")]
    fn zero_resolution_is_fatal() {
        step_for_resolution(0);
    }

    #[test]
    fn steady_selector_is_diagonal() {
        for index in 0..COUNT {
            let state = state(index, 1.0);
            let selector = KernelSelector::for_state(&state, COUNT);
            assert_eq!(selector.index(), index + index * COUNT);
            assert_eq!(
                selector.pair(COUNT),
                (FunctionId::new(index), FunctionId::new(index))
            );
        }
    }

    #[test]
    fn transition_selector_orders_source_and_target() {
        let mut state = state(1, 1.0);
        state.advance(1.0, |_| FunctionId::new(3));
        let forward = KernelSelector::for_state(&state, COUNT);
        assert_eq!(forward.index(), 3 + 1 * COUNT);

        let backward = KernelSelector::new(FunctionId::new(3), FunctionId::new(1), COUNT);
        assert_eq!(backward.index(), 1 + 3 * COUNT);
        assert_ne!(forward, backward);

        for a in 0..COUNT {
            for b in 0..COUNT {
                let ab = KernelSelector::new(FunctionId::new(a), FunctionId::new(b), COUNT);
                let ba = KernelSelector::new(FunctionId::new(b), FunctionId::new(a), COUNT);
                assert!(ab.index() < KernelSelector::table_size(COUNT));
                assert_eq!(ab == ba, a == b);
            }
        }
    }

    #[test]
    fn smoothstep_is_symmetric_at_midpoint() {
        assert_eq!(transition_progress(0.25, 0.5), 0.5);
        assert!(transition_progress(1e-4, 0.5) < 1e-6);
        assert!(transition_progress(0.5 - 1e-4, 0.5) > 1.0 - 1e-6);
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
    }

    #[test]
    fn zero_transition_duration_reports_full_progress() {
        assert_eq!(transition_progress(0.0, 0.0), 1.0);
    }

    #[test]
    fn plan_gates_progress_on_transition_flag() {
        let mut state = state(0, 0.5);
        let steady = DispatchPlan::new(&state, 100, COUNT);
        assert_eq!(steady.transition_progress, None);
        assert_eq!(steady.groups, [13, 13, 1]);
        assert_eq!(steady.invocations_per_axis(), 104);

        state.advance(1.25, |_| FunctionId::new(2));
        let blending = DispatchPlan::new(&state, 100, COUNT);
        assert_eq!(blending.transition_progress, Some(0.5));
        assert_eq!(blending.kernel.index(), 2);
    }

    #[test]
    #[should_panic(expected = "outside the registered kernel table")]
    fn unregistered_selector_is_fatal() {
        let plan = DispatchPlan::new(&state(4, 1.0), 10, COUNT);
        plan.ensure_registered(COUNT);
    }
}
