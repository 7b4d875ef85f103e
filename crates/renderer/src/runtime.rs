use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Where the `Time` uniform comes from. Readings are monotonic seconds
/// since the source was created.
pub trait TimeSource: Send {
    fn seconds(&mut self) -> f32;
}

/// Monotonic wall clock started on construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn seconds(&mut self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

/// Clock advanced only by the caller; used for deterministic sessions.
/// Shared through an `Arc` so a test can keep moving it after handing a
/// clone to the session.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Arc<Mutex<f32>>,
}

impl ManualTimeSource {
    pub fn new(seconds: f32) -> Self {
        Self {
            seconds: Arc::new(Mutex::new(seconds)),
        }
    }

    /// Moves the clock; going backwards is a caller bug.
    pub fn set(&self, seconds: f32) {
        let mut current = self.seconds.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        assert!(
            seconds >= *current,
            "manual clock moved backwards from {} to {seconds}",
            *current
        );
        *current = seconds;
    }
}

impl TimeSource for ManualTimeSource {
    fn seconds(&mut self) -> f32 {
        *self.seconds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Caps presentation to a target frame rate.
///
/// With no target every frame is ready immediately and the host falls back
/// to vsync or continuous polling.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Instant the next frame becomes due, if the pacer is capped.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }
}

/// Measures the real time between consecutive frames.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// Returns seconds since the previous tick; the first tick reports zero.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta
    }
}
