use std::time::Duration;

use anyhow::{ensure, Result};
use graphconfig::{GraphSettings, TransitionMode};
use scheduler::{FunctionRegistry, FunctionScheduler, PhaseChange};

use crate::binder::DrawCall;
use crate::device::{FrameCommands, GraphDevice};
use crate::plan::{DispatchPlan, KernelSelector};
use crate::positions::PositionBuffer;
use crate::runtime::BoxedTimeSource;

/// State that exists only while the session is active.
struct Active<B> {
    scheduler: FunctionScheduler,
    positions: PositionBuffer<B>,
}

/// A running graph: the transition state, the position buffer and the
/// per-frame dispatch/draw submission over a [`GraphDevice`].
///
/// The host calls [`GpuGraph::on_activate`] once, [`GpuGraph::advance`] every
/// frame and [`GpuGraph::on_deactivate`] (or drops the graph) when done.
pub struct GpuGraph<D: GraphDevice> {
    device: D,
    registry: FunctionRegistry,
    settings: GraphSettings,
    max_resolution: u32,
    time: BoxedTimeSource,
    active: Option<Active<D::Buffer>>,
}

impl<D: GraphDevice> GpuGraph<D> {
    /// `time` feeds the `Time` uniform for the life of the graph; it keeps
    /// running across deactivation and is never rewound.
    pub fn new(
        device: D,
        registry: FunctionRegistry,
        settings: GraphSettings,
        max_resolution: u32,
        time: BoxedTimeSource,
    ) -> Result<Self> {
        assert!(
            (1..=max_resolution).contains(&settings.resolution),
            "initial resolution {} outside 1..={max_resolution}",
            settings.resolution
        );
        registry.lookup(&settings.function)?;
        let needed = KernelSelector::table_size(registry.len());
        ensure!(
            needed <= device.kernel_count(),
            "device registered {} kernels but {} functions need {needed}",
            device.kernel_count(),
            registry.len()
        );
        Ok(Self {
            device,
            registry,
            settings,
            max_resolution,
            time,
            active: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Creates the transition state and allocates the position buffer.
    /// Calling it on an active session is a no-op.
    pub fn on_activate(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        let scheduler = FunctionScheduler::new(self.registry.clone(), &self.settings)?;
        let mut positions = PositionBuffer::new(self.max_resolution);
        positions.allocate(&mut self.device)?;
        tracing::info!(
            function = self.registry.name(scheduler.state().current_function()),
            resolution = self.settings.resolution,
            mode = %scheduler.mode(),
            "graph activated"
        );
        self.active = Some(Active {
            scheduler,
            positions,
        });
        Ok(())
    }

    /// Releases the buffer and drops the transition state. Idempotent.
    pub fn on_deactivate(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.positions.release(&mut self.device);
            tracing::info!("graph deactivated");
        }
    }

    /// Steps the transition state by one frame, then submits the compute
    /// dispatch and the instanced draw.
    pub fn advance(&mut self, delta_seconds: f32) -> Result<()> {
        let active = self
            .active
            .as_mut()
            .unwrap_or_else(|| panic!("graph advanced before activation"));

        if let Some(change) = active.scheduler.advance(delta_seconds) {
            log_phase_change(&self.registry, change);
        }

        let function_count = self.registry.len();
        let dispatch = DispatchPlan::new(active.scheduler.state(), self.settings.resolution, function_count);
        dispatch.ensure_registered(self.device.kernel_count());
        let draw = DrawCall::for_resolution(self.settings.resolution);
        let time = self.time.seconds();

        self.device.submit_frame(FrameCommands {
            positions: active.positions.handle(),
            time,
            dispatch,
            draw,
        })
    }

    /// Ends the steady period now; ignored while transitioning or inactive.
    pub fn skip(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if let Some(change) = active.scheduler.skip() {
                log_phase_change(&self.registry, change);
            }
        }
    }

    pub fn resolution(&self) -> u32 {
        self.settings.resolution
    }

    pub fn max_resolution(&self) -> u32 {
        self.max_resolution
    }

    /// Changes the grid size without touching the buffer.
    pub fn set_resolution(&mut self, resolution: u32) {
        assert!(
            (1..=self.max_resolution).contains(&resolution),
            "resolution {resolution} outside 1..={}",
            self.max_resolution
        );
        if resolution != self.settings.resolution {
            tracing::debug!(resolution, "resolution changed");
        }
        self.settings.resolution = resolution;
    }

    pub fn mode(&self) -> TransitionMode {
        self.active
            .as_ref()
            .map(|active| active.scheduler.mode())
            .unwrap_or(self.settings.transition_mode)
    }

    pub fn set_mode(&mut self, mode: TransitionMode) {
        self.settings.transition_mode = mode;
        if let Some(active) = self.active.as_mut() {
            active.scheduler.set_mode(mode);
        }
    }

    pub fn set_function_duration(&mut self, duration: Duration) {
        self.settings.function_duration = duration;
        if let Some(active) = self.active.as_mut() {
            active.scheduler.set_function_duration(duration);
        }
    }

    pub fn set_transition_duration(&mut self, duration: Duration) {
        self.settings.transition_duration = duration;
        if let Some(active) = self.active.as_mut() {
            active.scheduler.set_transition_duration(duration);
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> Option<&FunctionScheduler> {
        self.active.as_ref().map(|active| &active.scheduler)
    }

    /// Allocations performed by the live buffer manager.
    pub fn buffer_allocations(&self) -> u32 {
        self.active
            .as_ref()
            .map(|active| active.positions.allocations())
            .unwrap_or(0)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: GraphDevice> Drop for GpuGraph<D> {
    fn drop(&mut self) {
        self.on_deactivate();
    }
}

fn log_phase_change(registry: &FunctionRegistry, change: PhaseChange) {
    match change {
        PhaseChange::TransitionStarted { from, to } => tracing::debug!(
            from = registry.name(from),
            to = registry.name(to),
            "transition started"
        ),
        PhaseChange::TransitionFinished { function } => {
            tracing::debug!(function = registry.name(function), "transition finished")
        }
    }
}
