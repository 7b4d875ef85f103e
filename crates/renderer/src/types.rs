use graphconfig::{
    AntialiasSetting, GraphConfig, GraphSettings, PowerSetting, MAX_RESOLUTION,
};

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl From<AntialiasSetting> for Antialiasing {
    fn from(setting: AntialiasSetting) -> Self {
        match setting.samples() {
            None => Antialiasing::Auto,
            Some(1) => Antialiasing::Off,
            Some(samples) => Antialiasing::Samples(samples),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl From<PowerSetting> for GpuPowerPreference {
    fn from(setting: PowerSetting) -> Self {
        match setting {
            PowerSetting::High => GpuPowerPreference::High,
            PowerSetting::Low => GpuPowerPreference::Low,
        }
    }
}

/// What we learned about the adapter wgpu picked.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_storage_buffer_binding_size: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_storage_buffer_binding_size: limits.max_storage_buffer_binding_size,
        }
    }

    /// llvmpipe and friends report themselves as CPU devices.
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
            || self.name.to_ascii_lowercase().contains("llvmpipe")
    }
}

/// Everything the window host needs to start a graph.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    pub antialiasing: Antialiasing,
    pub gpu_power: GpuPowerPreference,
    /// Optional FPS cap; `None` renders as fast as presentation allows.
    pub target_fps: Option<f32>,
    pub vsync: bool,
    /// Initial graph settings; resolution and mode change at runtime.
    pub graph: GraphSettings,
    /// Capacity of the position buffer, fixed for the session.
    pub max_resolution: u32,
}

impl RendererConfig {
    pub fn from_graph_config(config: &GraphConfig) -> Self {
        Self {
            surface_size: (config.window.width, config.window.height),
            antialiasing: config.window.antialias.into(),
            gpu_power: config.window.power.into(),
            target_fps: config.window.target_fps(),
            vsync: config.window.vsync,
            graph: config.graph.clone(),
            max_resolution: MAX_RESOLUTION,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::from_graph_config(&GraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_window_settings() {
        let mut config = GraphConfig::default();
        config.window.antialias = AntialiasSetting::Samples8;
        config.window.power = PowerSetting::Low;
        config.window.fps = Some(0.0);
        let renderer = RendererConfig::from_graph_config(&config);
        assert_eq!(renderer.antialiasing, Antialiasing::Samples(8));
        assert_eq!(renderer.gpu_power, GpuPowerPreference::Low);
        assert_eq!(renderer.target_fps, None);
        assert_eq!(renderer.max_resolution, MAX_RESOLUTION);
        assert_eq!(renderer.surface_size, (1280, 720));
    }

    #[test]
    fn off_maps_to_single_sample() {
        assert_eq!(Antialiasing::from(AntialiasSetting::Off), Antialiasing::Off);
        assert_eq!(Antialiasing::from(AntialiasSetting::Auto), Antialiasing::Auto);
    }
}
