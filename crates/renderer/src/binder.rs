use crate::plan::{step_for_resolution, DOMAIN_EXTENT};

/// Axis-aligned box centred on `center` with the same half-extent on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: [f32; 3],
    pub half_extent: f32,
}

impl Bounds {
    /// Box enclosing the `[-1, 1]` domain padded by one cube width, so points
    /// displaced to the edge stay inside regardless of resolution.
    pub fn for_step(step: f32) -> Self {
        Self {
            center: [0.0; 3],
            half_extent: DOMAIN_EXTENT * 0.5 + step,
        }
    }

    pub fn radius(&self) -> f32 {
        self.half_extent * 3f32.sqrt()
    }
}

#[cfg(test)]
impl Bounds {
    pub fn contains(&self, point: [f32; 3]) -> bool {
        point
            .iter()
            .zip(self.center)
            .all(|(value, centre)| (value - centre).abs() <= self.half_extent)
    }
}

/// One instanced draw of the cube mesh, one instance per grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub instance_count: u32,
    pub step: f32,
    pub bounds: Bounds,
}

impl DrawCall {
    pub fn for_resolution(resolution: u32) -> Self {
        let step = step_for_resolution(resolution);
        Self {
            instance_count: resolution * resolution,
            step,
            bounds: Bounds::for_step(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_count_matches_grid() {
        assert_eq!(DrawCall::for_resolution(10).instance_count, 100);
        assert_eq!(DrawCall::for_resolution(1000).instance_count, 1_000_000);
    }

    #[test]
    fn bounds_pad_domain_by_one_step() {
        let draw = DrawCall::for_resolution(10);
        assert_eq!(draw.bounds.center, [0.0, 0.0, 0.0]);
        assert!((draw.bounds.half_extent - 1.2).abs() < 1e-6);
        assert!(draw.bounds.contains([1.0 + draw.step * 0.5, -1.0, 1.0]));
        assert!(!draw.bounds.contains([0.0, 1.5, 0.0]));
    }

    #[test]
    fn bounds_shrink_towards_domain_at_high_resolution() {
        let coarse = DrawCall::for_resolution(10).bounds;
        let fine = DrawCall::for_resolution(1000).bounds;
        assert!(fine.half_extent < coarse.half_extent);
        assert!(fine.half_extent > 1.0);
        assert!(fine.radius() > 3f32.sqrt());
    }
}
