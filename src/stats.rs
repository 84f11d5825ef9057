//! Frame time statistics, logged instead of drawn as an overlay.

use instant::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct FrameStats {
    frames: u32,
    busy: Duration,
    window_start: Instant,
    frame_start: Option<Instant>,
    last_fps: Option<f64>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frames: 0,
            busy: Duration::ZERO,
            window_start: Instant::now(),
            frame_start: None,
            last_fps: None,
        }
    }

    pub fn begin(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    pub fn end(&mut self) {
        let now = Instant::now();
        if let Some(start) = self.frame_start.take() {
            self.busy += now - start;
        }
        self.frames += 1;
        let elapsed = now - self.window_start;
        if elapsed >= REPORT_INTERVAL {
            let fps = self.frames as f64 / elapsed.as_secs_f64();
            let ms = self.busy.as_secs_f64() * 1000.0 / self.frames as f64;
            log::info!("{fps:.1} fps, {ms:.2} ms per frame");
            self.last_fps = Some(fps);
            self.frames = 0;
            self.busy = Duration::ZERO;
            self.window_start = now;
        }
    }

    /// Frames per second of the last completed reporting window.
    pub fn fps(&self) -> Option<f64> {
        self.last_fps
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
