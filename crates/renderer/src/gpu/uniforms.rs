use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::binder::{Bounds, DrawCall};
use crate::plan::DispatchPlan;

/// Mirrors `Params` in the compute module.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ComputeParams {
    pub resolution: u32,
    pub step: f32,
    pub time: f32,
    pub transition_progress: f32,
}

impl ComputeParams {
    /// Steady frames upload zero progress; the diagonal kernels ignore it.
    pub fn new(plan: &DispatchPlan, time: f32) -> Self {
        Self {
            resolution: plan.resolution,
            step: plan.step,
            time,
            transition_progress: plan.transition_progress.unwrap_or(0.0),
        }
    }
}

/// Mirrors `DrawParams` in the render module (80 bytes, 16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DrawParams {
    pub view_proj: [[f32; 4]; 4],
    pub step: f32,
    pub _padding: [f32; 3],
}

impl DrawParams {
    pub fn new(draw: &DrawCall, aspect: f32, time: f32) -> Self {
        Self {
            view_proj: camera_for_bounds(&draw.bounds, aspect, time).to_cols_array_2d(),
            step: draw.step,
            _padding: [0.0; 3],
        }
    }
}

const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
const ORBIT_SPEED: f32 = 0.1;
const FRAMING_MARGIN: f32 = 1.05;

/// Slow orbit around the bounds, far enough back to keep the bounding
/// sphere inside both the vertical and horizontal field of view.
pub(crate) fn camera_for_bounds(bounds: &Bounds, aspect: f32, time: f32) -> Mat4 {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    let center = Vec3::from_array(bounds.center);
    let radius = bounds.radius();
    let half_horizontal = ((FOV_Y * 0.5).tan() * aspect).atan();
    let fit = (FOV_Y * 0.5).min(half_horizontal.max(1e-3));
    let distance = FRAMING_MARGIN * radius / fit.sin();

    let angle = time * ORBIT_SPEED;
    let eye = center + Vec3::new(angle.sin(), 0.6, angle.cos()).normalize() * distance;
    let view = Mat4::look_at_rh(eye, center, Vec3::Y);
    let projection = Mat4::perspective_rh(FOV_Y, aspect, 0.05, distance + radius * 2.0);
    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn uniform_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<ComputeParams>(), 16);
        assert_eq!(std::mem::size_of::<DrawParams>(), 80);
    }

    #[test]
    fn camera_keeps_bounds_corners_in_clip_space() {
        let bounds = DrawCall::for_resolution(10).bounds;
        for aspect in [0.5, 1.0, 16.0 / 9.0] {
            let view_proj = camera_for_bounds(&bounds, aspect, 3.0);
            for corner in 0..8u32 {
                let pick = |bit: u32| if corner & bit != 0 { 1.0 } else { -1.0 };
                let point = Vec4::new(
                    pick(1) * bounds.half_extent,
                    pick(2) * bounds.half_extent,
                    pick(4) * bounds.half_extent,
                    1.0,
                );
                let clip = view_proj * point;
                let ndc = clip / clip.w;
                assert!(clip.w > 0.0, "corner behind camera");
                assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{ndc:?} at aspect {aspect}");
                assert!((0.0..=1.0).contains(&ndc.z), "depth {ndc:?}");
            }
        }
    }
}
