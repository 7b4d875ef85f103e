use crate::device::GraphDevice;

/// Bytes per grid point: three tightly packed `f32` components.
pub const POINT_STRIDE: u64 = 12;

#[derive(Debug)]
enum Slot<B> {
    Unallocated,
    Allocated(B),
    Released,
}

/// Owns the single device buffer holding one position per grid point.
///
/// The buffer is sized for `max_resolution²` points up front so resolution
/// changes never reallocate. Misuse of the lifecycle panics.
#[derive(Debug)]
pub struct PositionBuffer<B> {
    max_resolution: u32,
    slot: Slot<B>,
    allocations: u32,
}

impl<B> PositionBuffer<B> {
    pub fn new(max_resolution: u32) -> Self {
        assert!(max_resolution > 0, "position buffer needs a positive max resolution");
        Self {
            max_resolution,
            slot: Slot::Unallocated,
            allocations: 0,
        }
    }

    /// Number of points the buffer holds.
    pub fn element_count(&self) -> u64 {
        u64::from(self.max_resolution) * u64::from(self.max_resolution)
    }

    pub fn byte_size(&self) -> u64 {
        self.element_count() * POINT_STRIDE
    }

    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    pub fn allocate<D>(&mut self, device: &mut D) -> anyhow::Result<()>
    where
        D: GraphDevice<Buffer = B>,
    {
        match self.slot {
            Slot::Unallocated => {}
            Slot::Allocated(_) => panic!("position buffer allocated twice"),
            Slot::Released => panic!("position buffer allocated after release"),
        }
        let buffer = device.create_position_buffer(self.element_count())?;
        self.slot = Slot::Allocated(buffer);
        self.allocations += 1;
        tracing::debug!(
            elements = self.element_count(),
            bytes = self.byte_size(),
            "allocated position buffer"
        );
        Ok(())
    }

    /// Borrows the live handle for one frame.
    pub fn handle(&self) -> &B {
        match &self.slot {
            Slot::Allocated(buffer) => buffer,
            Slot::Unallocated => panic!("position buffer used before allocation"),
            Slot::Released => panic!("position buffer used after release"),
        }
    }

    pub fn release<D>(&mut self, device: &mut D)
    where
        D: GraphDevice<Buffer = B>,
    {
        match std::mem::replace(&mut self.slot, Slot::Released) {
            Slot::Allocated(buffer) => {
                device.release_position_buffer(buffer);
                tracing::debug!("released position buffer");
            }
            Slot::Unallocated => panic!("position buffer released before allocation"),
            Slot::Released => panic!("position buffer released twice"),
        }
    }
}

#[cfg(test)]
impl<B> PositionBuffer<B> {
    pub fn is_allocated(&self) -> bool {
        matches!(self.slot, Slot::Allocated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::RecordingDevice;

    #[test]
    fn sizes_for_max_resolution() {
        let buffer = PositionBuffer::<u32>::new(1000);
        assert_eq!(buffer.element_count(), 1_000_000);
        assert_eq!(buffer.byte_size(), 12_000_000);
    }

    #[test]
    fn allocate_then_release() {
        let mut device = RecordingDevice::new(25);
        let mut buffer = PositionBuffer::new(100);
        buffer.allocate(&mut device).unwrap();
        assert!(buffer.is_allocated());
        assert_eq!(buffer.allocations(), 1);
        assert_eq!(device.created_elements(), &[10_000]);

        let handle = *buffer.handle();
        buffer.release(&mut device);
        assert!(!buffer.is_allocated());
        assert_eq!(device.released(), &[handle]);
    }

    #[test]
    #[should_panic(expected = "before allocation")]
    fn handle_before_allocation_panics() {
        let buffer = PositionBuffer::<u32>::new(10);
        buffer.handle();
    }

    #[test]
    #[should_panic(expected = "used after release")]
    fn handle_after_release_panics() {
        let mut device = RecordingDevice::new(25);
        let mut buffer = PositionBuffer::new(10);
        buffer.allocate(&mut device).unwrap();
        buffer.release(&mut device);
        buffer.handle();
    }

    #[test]
    #[should_panic(expected = "allocated twice")]
    fn double_allocation_panics() {
        let mut device = RecordingDevice::new(25);
        let mut buffer = PositionBuffer::new(10);
        buffer.allocate(&mut device).unwrap();
        buffer.allocate(&mut device).unwrap();
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let mut device = RecordingDevice::new(25);
        let mut buffer = PositionBuffer::new(10);
        buffer.allocate(&mut device).unwrap();
        buffer.release(&mut device);
        buffer.release(&mut device);
    }

    #[test]
    fn failed_allocation_leaves_slot_empty() {
        let mut device = RecordingDevice::new(25);
        device.fail_next_allocation();
        let mut buffer = PositionBuffer::new(10);
        assert!(buffer.allocate(&mut device).is_err());
        assert_eq!(buffer.allocations(), 0);
        buffer.allocate(&mut device).unwrap();
        assert_eq!(buffer.allocations(), 1);
    }
}
