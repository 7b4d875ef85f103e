use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::device::{FrameCommands, GraphDevice, PARAMS_BINDING, POSITIONS_BINDING};
use crate::plan::KernelSelector;
use crate::positions::POINT_STRIDE;
use crate::types::{AdapterProfile, Antialiasing, GpuPowerPreference};

use super::context::{GpuContext, DEPTH_FORMAT};
use super::pipeline::{KernelTable, PointPipeline};
use super::uniforms::{ComputeParams, DrawParams};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.03,
    a: 1.0,
};

/// Position storage plus the two bind groups that reference it. Dropping the
/// binding drops both groups with the buffer.
pub struct PositionBinding {
    buffer: wgpu::Buffer,
    compute_group: wgpu::BindGroup,
    render_group: wgpu::BindGroup,
}

struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct FrameStats {
    frames: u32,
    last_report: Instant,
}

impl FrameStats {
    fn record(&mut self, now: Instant, resolution: u32, kernel: KernelSelector) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            debug!(fps = fps.round(), resolution, kernel = kernel.index(), "render stats");
            self.frames = 0;
            self.last_report = now;
        }
    }
}

/// [`GraphDevice`] backed by a wgpu surface.
pub struct WgpuDevice {
    context: GpuContext,
    kernels: KernelTable,
    points: PointPipeline,
    compute_params: wgpu::Buffer,
    draw_params: wgpu::Buffer,
    depth: RenderTarget,
    multisample: Option<RenderTarget>,
    stats: FrameStats,
}

impl WgpuDevice {
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing, gpu_power, vsync)?;
        let device = &context.device;

        let kernels = KernelTable::new(device);
        let points = PointPipeline::new(device, context.surface_format, context.sample_count);

        let compute_params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kernel params"),
            size: std::mem::size_of::<ComputeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw params"),
            size: std::mem::size_of::<DrawParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (depth, multisample) = Self::targets(&context);

        Ok(Self {
            context,
            kernels,
            points,
            compute_params,
            draw_params,
            depth,
            multisample,
            stats: FrameStats {
                frames: 0,
                last_report: Instant::now(),
            },
        })
    }

    fn targets(context: &GpuContext) -> (RenderTarget, Option<RenderTarget>) {
        let depth = RenderTarget::new(
            &context.device,
            "depth target",
            DEPTH_FORMAT,
            context.size,
            context.sample_count,
        );
        let multisample = (context.sample_count > 1).then(|| {
            RenderTarget::new(
                &context.device,
                "msaa color target",
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        (depth, multisample)
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || new_size == self.context.size {
            return;
        }
        self.context.resize(new_size);
        let (depth, multisample) = Self::targets(&self.context);
        self.depth = depth;
        self.multisample = multisample;
    }

    /// Reconfigures the surface after it was lost or went out of date.
    pub fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.context.set_vsync(enabled);
    }

    fn aspect(&self) -> f32 {
        self.context.size.width as f32 / self.context.size.height.max(1) as f32
    }
}

impl GraphDevice for WgpuDevice {
    type Buffer = PositionBinding;

    fn kernel_count(&self) -> u32 {
        self.kernels.len()
    }

    fn create_position_buffer(&mut self, elements: u64) -> Result<PositionBinding> {
        let size = elements * POINT_STRIDE;
        let limits = self.context.device.limits();
        if size > u64::from(limits.max_storage_buffer_binding_size) || size > limits.max_buffer_size {
            bail!(
                "position buffer of {size} bytes exceeds the device storage limit of {} bytes",
                limits.max_storage_buffer_binding_size
            );
        }

        let device = &self.context.device;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("positions"),
            size,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let compute_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kernel bind group"),
            layout: &self.kernels.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: POSITIONS_BINDING,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: PARAMS_BINDING,
                    resource: self.compute_params.as_entire_binding(),
                },
            ],
        });
        let render_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point bind group"),
            layout: &self.points.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: POSITIONS_BINDING,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: PARAMS_BINDING,
                    resource: self.draw_params.as_entire_binding(),
                },
            ],
        });

        Ok(PositionBinding {
            buffer,
            compute_group,
            render_group,
        })
    }

    fn release_position_buffer(&mut self, binding: PositionBinding) {
        let PositionBinding {
            buffer,
            compute_group,
            render_group,
        } = binding;
        drop(compute_group);
        drop(render_group);
        if let Err(err) = self.context.device.poll(wgpu::PollType::Wait) {
            warn!(error = %err, "failed to drain GPU work before releasing positions");
        }
        buffer.destroy();
    }

    fn submit_frame(&mut self, frame: FrameCommands<'_, PositionBinding>) -> Result<()> {
        let FrameCommands {
            positions,
            time,
            dispatch,
            draw,
        } = frame;

        let surface_texture = self.context.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let queue = &self.context.queue;
        queue.write_buffer(
            &self.compute_params,
            0,
            bytemuck::bytes_of(&ComputeParams::new(&dispatch, time)),
        );
        queue.write_buffer(
            &self.draw_params,
            0,
            bytemuck::bytes_of(&DrawParams::new(&draw, self.aspect(), time)),
        );

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("graph frame"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("kernel pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernels.pipelines[dispatch.kernel.index() as usize]);
            pass.set_bind_group(0, &positions.compute_group, &[]);
            let [x, y, z] = dispatch.groups;
            pass.dispatch_workgroups(x, y, z);
        }

        {
            let (attachment_view, resolve_target) = match self.multisample.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("point pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.points.pipeline);
            pass.set_bind_group(0, &positions.render_group, &[]);
            pass.draw(0..36, 0..draw.instance_count);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.stats
            .record(Instant::now(), dispatch.resolution, dispatch.kernel);
        Ok(())
    }
}
