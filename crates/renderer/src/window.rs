use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use graphconfig::{MAX_RESOLUTION, MIN_RESOLUTION};
use scheduler::FunctionRegistry;
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::compile::function_names;
use crate::gpu::WgpuDevice;
use crate::graph::GpuGraph;
use crate::runtime::{FrameClock, FramePacer, SystemTimeSource};
use crate::types::RendererConfig;

const SOFTWARE_FPS_CAP: f32 = 15.0;
/// Grid edge change per arrow key press.
pub const RESOLUTION_STEP: i64 = 10;

/// Keyboard actions understood by the window host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Skip,
    ResolutionUp,
    ResolutionDown,
    ToggleMode,
    ToggleVsync,
    Quit,
}

pub fn control_for_key(key: &Key) -> Option<Control> {
    match key {
        Key::Named(NamedKey::Space) => Some(Control::Skip),
        Key::Named(NamedKey::ArrowUp) => Some(Control::ResolutionUp),
        Key::Named(NamedKey::ArrowDown) => Some(Control::ResolutionDown),
        Key::Named(NamedKey::Escape) => Some(Control::Quit),
        Key::Character(value) => match value.as_str() {
            " " => Some(Control::Skip),
            "m" | "M" => Some(Control::ToggleMode),
            "v" | "V" => Some(Control::ToggleVsync),
            "q" | "Q" => Some(Control::Quit),
            _ => None,
        },
        _ => None,
    }
}

/// Applies `delta` and clamps into `[MIN_RESOLUTION, min(max, MAX_RESOLUTION)]`.
pub fn stepped_resolution(current: u32, delta: i64, max_resolution: u32) -> u32 {
    let upper = max_resolution.min(MAX_RESOLUTION).max(MIN_RESOLUTION);
    let next = (i64::from(current) + delta).clamp(i64::from(MIN_RESOLUTION), i64::from(upper));
    next as u32
}

/// Opens a window and runs the graph until it is closed.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> Result<()> {
        let config = self.config;
        let event_loop = EventLoopBuilder::new()
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

        let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
        let window = WindowBuilder::new()
            .with_title("gpugraph")
            .with_inner_size(window_size)
            .build(&event_loop)
            .map_err(|err| anyhow!("failed to create window: {err}"))?;
        let window = Arc::new(window);

        let device = WgpuDevice::new(
            window.as_ref(),
            window.inner_size(),
            config.antialiasing,
            config.gpu_power,
            config.vsync,
        )?;

        let profile = device.adapter_profile().clone();
        let mut target_fps = config.target_fps;
        if profile.is_software() && target_fps.is_none() {
            warn!(
                adapter = %profile.name,
                backend = ?profile.backend,
                cap = SOFTWARE_FPS_CAP,
                "software rasterizer detected; capping frame rate (override with --fps)"
            );
            target_fps = Some(SOFTWARE_FPS_CAP);
        }

        let registry = FunctionRegistry::new(function_names())?;
        let mut graph = Some(GpuGraph::new(
            device,
            registry,
            config.graph.clone(),
            config.max_resolution,
            Box::new(SystemTimeSource::new()),
        )?);
        if let Some(graph) = graph.as_mut() {
            graph.on_activate()?;
        }

        let mut host = Host {
            window: window.clone(),
            pacer: FramePacer::new(target_fps),
            clock: FrameClock::default(),
            vsync: config.vsync,
            failure: None,
            title: String::new(),
        };
        window.request_redraw();

        let run_result = event_loop.run(|event, elwt| {
            if matches!(event, Event::LoopExiting) {
                graph.take();
                return;
            }
            let Some(active) = graph.as_mut().filter(|graph| graph.is_active()) else {
                return;
            };
            match event {
                Event::WindowEvent { window_id, event } if window_id == host.window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            active.on_deactivate();
                            elwt.exit();
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.state != ElementState::Pressed {
                                return;
                            }
                            let Some(control) = control_for_key(&event.logical_key) else {
                                return;
                            };
                            let repeatable =
                                matches!(control, Control::ResolutionUp | Control::ResolutionDown);
                            if event.repeat && !repeatable {
                                return;
                            }
                            if host.apply(control, active) {
                                active.on_deactivate();
                                elwt.exit();
                            }
                        }
                        WindowEvent::Resized(new_size) => {
                            active.device_mut().resize(new_size);
                        }
                        WindowEvent::RedrawRequested => {
                            if host.render(active) {
                                active.on_deactivate();
                                elwt.exit();
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    let now = Instant::now();
                    if host.pacer.ready_for_frame(now) {
                        host.window.request_redraw();
                        elwt.set_control_flow(ControlFlow::Wait);
                    } else if let Some(deadline) = host.pacer.next_deadline() {
                        elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                    } else {
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                }
                _ => {}
            }
        });

        // The surface borrows the window handle; tear the device down first.
        drop(graph);
        run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
        match host.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Host {
    window: Arc<Window>,
    pacer: FramePacer,
    clock: FrameClock,
    vsync: bool,
    failure: Option<anyhow::Error>,
    title: String,
}

impl Host {
    /// Returns true when the host should exit.
    fn apply(&mut self, control: Control, graph: &mut GpuGraph<WgpuDevice>) -> bool {
        match control {
            Control::Skip => graph.skip(),
            Control::ResolutionUp | Control::ResolutionDown => {
                let delta = if control == Control::ResolutionUp {
                    RESOLUTION_STEP
                } else {
                    -RESOLUTION_STEP
                };
                let next = stepped_resolution(graph.resolution(), delta, graph.max_resolution());
                graph.set_resolution(next);
            }
            Control::ToggleMode => {
                let mode = graph.mode().toggled();
                graph.set_mode(mode);
                info!(%mode, "transition mode changed");
            }
            Control::ToggleVsync => {
                self.vsync = !self.vsync;
                graph.device_mut().set_vsync(self.vsync);
            }
            Control::Quit => return true,
        }
        self.refresh_title(graph);
        false
    }

    /// Advances one frame. Returns true when the host should exit.
    fn render(&mut self, graph: &mut GpuGraph<WgpuDevice>) -> bool {
        let now = Instant::now();
        let delta = self.clock.tick(now);
        match graph.advance(delta) {
            Ok(()) => {
                self.pacer.mark_rendered(now);
                self.refresh_title(graph);
                false
            }
            Err(err) => match err.downcast_ref::<wgpu::SurfaceError>() {
                Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    graph.device_mut().recover_surface();
                    false
                }
                Some(wgpu::SurfaceError::OutOfMemory) => {
                    error!("surface out of memory; exiting");
                    self.failure = Some(err.context("GPU surface ran out of memory"));
                    true
                }
                Some(wgpu::SurfaceError::Timeout) => {
                    warn!("surface timeout; skipping frame");
                    false
                }
                Some(other) => {
                    warn!(error = ?other, "surface error; retrying next frame");
                    false
                }
                None => {
                    error!(error = %err, "failed to render frame");
                    self.failure = Some(err);
                    true
                }
            },
        }
    }

    fn refresh_title(&mut self, graph: &GpuGraph<WgpuDevice>) {
        let Some(scheduler) = graph.scheduler() else {
            return;
        };
        let function = graph.registry().name(scheduler.state().current_function());
        let title = format!(
            "gpugraph: {function} ({res}x{res}, {mode})",
            res = graph.resolution(),
            mode = graph.mode()
        );
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }
}
