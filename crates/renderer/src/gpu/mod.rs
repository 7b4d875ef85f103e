//! wgpu implementation of [`crate::device::GraphDevice`].
//!
//! - `context` owns instance/adapter/device/surface wiring, MSAA sample
//!   selection and present-mode choice.
//! - `pipeline` builds the `N²` compute pipelines from the generated kernel
//!   library and the instanced cube render pipeline.
//! - `uniforms` holds the `Pod` parameter blocks and the camera.
//! - `state` ties them together as [`WgpuDevice`] and records one compute
//!   pass followed by one render pass per frame.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::{PositionBinding, WgpuDevice};
