use crate::binder::DrawCall;
use crate::plan::DispatchPlan;

/// Storage binding holding the point positions, shared by compute and render.
pub const POSITIONS_BINDING: u32 = 0;
/// Uniform binding for per-frame parameters in both stages.
pub const PARAMS_BINDING: u32 = 1;

/// Work recorded for a single frame: the dispatch always precedes the draw
/// and both read the same borrowed buffer.
#[derive(Debug)]
pub struct FrameCommands<'a, B> {
    pub positions: &'a B,
    pub time: f32,
    pub dispatch: DispatchPlan,
    pub draw: DrawCall,
}

/// Seam between the graph session and the GPU.
///
/// The wgpu implementation lives in [`crate::gpu`]; tests drive the session
/// through [`testing::RecordingDevice`].
pub trait GraphDevice {
    type Buffer;

    /// Size of the (from, to) kernel table the device registered.
    fn kernel_count(&self) -> u32;

    fn create_position_buffer(&mut self, elements: u64) -> anyhow::Result<Self::Buffer>;

    /// Waits for in-flight work touching the buffer, then frees it.
    fn release_position_buffer(&mut self, buffer: Self::Buffer);

    /// Records the dispatch followed by the draw on one queue and submits.
    fn submit_frame(&mut self, frame: FrameCommands<'_, Self::Buffer>) -> anyhow::Result<()>;
}

pub mod testing {
    //! In-memory device double that records every call.

    use anyhow::anyhow;

    use super::{FrameCommands, GraphDevice};
    use crate::binder::DrawCall;
    use crate::plan::DispatchPlan;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedFrame {
        pub buffer: u32,
        pub time: f32,
        pub dispatch: DispatchPlan,
        pub draw: DrawCall,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum DeviceEvent {
        Created { buffer: u32, elements: u64 },
        Released { buffer: u32 },
        Frame(RecordedFrame),
    }

    #[derive(Debug, Default)]
    pub struct RecordingDevice {
        kernel_count: u32,
        next_buffer: u32,
        live: Vec<u32>,
        created: Vec<u64>,
        released: Vec<u32>,
        events: Vec<DeviceEvent>,
        fail_allocation: bool,
    }

    impl RecordingDevice {
        pub fn new(kernel_count: u32) -> Self {
            Self {
                kernel_count,
                ..Self::default()
            }
        }

        pub fn fail_next_allocation(&mut self) {
            self.fail_allocation = true;
        }

        pub fn created_elements(&self) -> &[u64] {
            &self.created
        }

        pub fn released(&self) -> &[u32] {
            &self.released
        }

        pub fn events(&self) -> &[DeviceEvent] {
            &self.events
        }

        pub fn frames(&self) -> impl Iterator<Item = &RecordedFrame> {
            self.events.iter().filter_map(|event| match event {
                DeviceEvent::Frame(frame) => Some(frame),
                _ => None,
            })
        }
    }

    impl GraphDevice for RecordingDevice {
        type Buffer = u32;

        fn kernel_count(&self) -> u32 {
            self.kernel_count
        }

        fn create_position_buffer(&mut self, elements: u64) -> anyhow::Result<u32> {
            if std::mem::take(&mut self.fail_allocation) {
                return Err(anyhow!("out of device memory"));
            }
            let buffer = self.next_buffer;
            self.next_buffer += 1;
            self.live.push(buffer);
            self.created.push(elements);
            self.events.push(DeviceEvent::Created { buffer, elements });
            Ok(buffer)
        }

        fn release_position_buffer(&mut self, buffer: u32) {
            self.live.retain(|live| *live != buffer);
            self.released.push(buffer);
            self.events.push(DeviceEvent::Released { buffer });
        }

        fn submit_frame(&mut self, frame: FrameCommands<'_, u32>) -> anyhow::Result<()> {
            assert!(
                self.live.contains(frame.positions),
                "frame submitted against dead buffer {}",
                frame.positions
            );
            self.events.push(DeviceEvent::Frame(RecordedFrame {
                buffer: *frame.positions,
                time: frame.time,
                dispatch: frame.dispatch,
                draw: frame.draw,
            }));
            Ok(())
        }
    }
}
