use anyhow::{anyhow, bail, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::types::{AdapterProfile, Antialiasing, GpuPowerPreference};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Highest sample count `Antialiasing::Auto` settles on.
const AUTO_SAMPLE_CAP: u32 = 4;

/// Adapter, device and configured surface for one window.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub adapter_profile: AdapterProfile,
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });
        let surface = create_surface(&instance, target)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: match gpu_power {
                GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
                GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
            },
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no GPU adapter can present to this window")?;

        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
        debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            max_storage_binding = adapter_profile.max_storage_buffer_binding_size,
            "selected GPU adapter"
        );
        require_graph_capabilities(&adapter, &adapter_profile)?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let max_dimension = limits.max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            bail!(
                "window {}x{} exceeds the adapter's {max_dimension} pixel texture limit",
                size.width,
                size.height
            );
        }

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let features = adapter.get_texture_format_features(surface_format);
        let sample_count = pick_sample_count(
            antialiasing,
            &features.flags.supported_sample_counts(),
            features.flags.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
            adapter_profile.is_software(),
        );

        let required_features = if sample_count > 4 {
            wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
        } else {
            wgpu::Features::empty()
        };
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gpugraph device"),
            required_features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to open the GPU device")?;

        let present_mode = pick_present_mode(&caps.present_modes, vsync);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        debug!(?surface_format, ?present_mode, sample_count, "surface configured");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            size,
            sample_count,
            surface_format,
            adapter_profile,
            config,
            present_modes: caps.present_modes,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.reconfigure();
    }

    /// Re-applies the current configuration after `Lost`/`Outdated`.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn set_vsync(&mut self, enabled: bool) {
        let mode = pick_present_mode(&self.present_modes, enabled);
        if mode != self.config.present_mode {
            self.config.present_mode = mode;
            self.reconfigure();
            debug!(?mode, vsync = enabled, "present mode changed");
        }
    }
}

fn create_surface<T>(instance: &wgpu::Instance, target: &T) -> Result<wgpu::Surface<'static>>
where
    T: HasDisplayHandle + HasWindowHandle,
{
    let window_handle = target
        .window_handle()
        .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
    let display_handle = target
        .display_handle()
        .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

    // SAFETY: the window outlives the surface; the host drops the device first.
    unsafe {
        instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle: display_handle.as_raw(),
            raw_window_handle: window_handle.as_raw(),
        })
    }
    .context("failed to create rendering surface")
}

/// Kernels write positions from compute and the cube shader reads them from
/// the vertex stage, so both downlevel flags are mandatory.
fn require_graph_capabilities(adapter: &wgpu::Adapter, profile: &AdapterProfile) -> Result<()> {
    let flags = adapter.get_downlevel_capabilities().flags;
    if !flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        bail!("adapter '{}' does not support compute shaders", profile.name);
    }
    if !flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
        bail!(
            "adapter '{}' cannot read storage buffers from vertex shaders",
            profile.name
        );
    }
    Ok(())
}

fn pick_sample_count(
    antialiasing: Antialiasing,
    supported: &[u32],
    can_resolve: bool,
    software: bool,
) -> u32 {
    let best_at_most = |limit: u32| {
        supported
            .iter()
            .copied()
            .filter(|&count| count <= limit)
            .max()
            .unwrap_or(1)
    };
    let wanted = match antialiasing {
        Antialiasing::Off => return 1,
        Antialiasing::Auto => best_at_most(AUTO_SAMPLE_CAP),
        Antialiasing::Samples(requested) => {
            let granted = best_at_most(requested);
            if granted != requested {
                warn!(requested, granted, ?supported, "MSAA sample count not supported");
            }
            granted
        }
    };
    if wanted > 1 && !can_resolve {
        warn!("surface format cannot resolve multisampled targets; MSAA off");
        return 1;
    }
    if wanted > 1 && software {
        warn!(wanted, "software rasterizer; MSAA off");
        return 1;
    }
    wanted
}

/// Fifo when vsync is wanted, otherwise Immediate, then Mailbox, then Fifo.
fn pick_present_mode(available: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    let has = |mode: wgpu::PresentMode| available.contains(&mode).then_some(mode);
    let fifo = has(wgpu::PresentMode::Fifo)
        .or_else(|| available.first().copied())
        .unwrap_or(wgpu::PresentMode::Fifo);
    if vsync {
        return fifo;
    }
    has(wgpu::PresentMode::Immediate)
        .or_else(|| has(wgpu::PresentMode::Mailbox))
        .unwrap_or(fifo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::PresentMode;

    #[test]
    fn auto_caps_msaa_at_four() {
        assert_eq!(pick_sample_count(Antialiasing::Auto, &[1, 2, 4, 8], true, false), 4);
        assert_eq!(pick_sample_count(Antialiasing::Auto, &[1, 2], true, false), 2);
        assert_eq!(pick_sample_count(Antialiasing::Auto, &[], true, false), 1);
    }

    #[test]
    fn explicit_samples_fall_back_downwards() {
        assert_eq!(pick_sample_count(Antialiasing::Samples(8), &[1, 2, 4, 8], true, false), 8);
        assert_eq!(pick_sample_count(Antialiasing::Samples(16), &[1, 4], true, false), 4);
        assert_eq!(pick_sample_count(Antialiasing::Off, &[1, 4], true, false), 1);
    }

    #[test]
    fn msaa_disabled_without_resolve_or_on_software() {
        assert_eq!(pick_sample_count(Antialiasing::Auto, &[1, 4], false, false), 1);
        assert_eq!(pick_sample_count(Antialiasing::Samples(4), &[1, 4], true, true), 1);
    }

    #[test]
    fn present_mode_follows_vsync() {
        let all = [PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate];
        assert_eq!(pick_present_mode(&all, true), PresentMode::Fifo);
        assert_eq!(pick_present_mode(&all, false), PresentMode::Immediate);
        assert_eq!(
            pick_present_mode(&[PresentMode::Fifo, PresentMode::Mailbox], false),
            PresentMode::Mailbox
        );
        assert_eq!(pick_present_mode(&[PresentMode::Fifo], false), PresentMode::Fifo);
    }
}
