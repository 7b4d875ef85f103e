//! GPU function graph renderer.
//!
//! A grid of `resolution²` points is evaluated each frame by a compute kernel
//! that samples one of several parametric functions (or blends two of them
//! during a transition) and writes positions into a storage buffer. The same
//! buffer then feeds an instanced cube draw.
//!
//! ```text
//!   window host ── advance(delta) ──▶ GpuGraph
//!                                       │ scheduler::FunctionScheduler
//!                                       ▼
//!                                DispatchPlan + DrawCall
//!                                       │
//!                                       ▼
//!                        GraphDevice::submit_frame (compute, then draw)
//! ```
//!
//! The pure pieces (`plan`, `binder`, `positions`, `graph`) never touch wgpu
//! and are tested against [`device::testing::RecordingDevice`]. The `gpu`
//! module provides the wgpu-backed [`gpu::WgpuDevice`] and `window` runs it
//! inside a winit event loop.

pub mod binder;
pub mod compile;
pub mod device;
pub mod gpu;
pub mod graph;
pub mod plan;
pub mod positions;
pub mod runtime;
pub mod types;
pub mod window;

pub use binder::{Bounds, DrawCall};
pub use compile::{function_names, FUNCTION_LIBRARY};
pub use device::{FrameCommands, GraphDevice, PARAMS_BINDING, POSITIONS_BINDING};
pub use graph::GpuGraph;
pub use plan::{DispatchPlan, KernelSelector, WORKGROUP_SIZE};
pub use positions::PositionBuffer;
pub use runtime::{BoxedTimeSource, ManualTimeSource, SystemTimeSource, TimeSource};
pub use types::{Antialiasing, GpuPowerPreference, RendererConfig};
pub use window::Renderer;
