//! Wall-clock frame timing.
//!
//! Elapsed time is measured once per host redraw. Physics consumes it through
//! its own fixed-step accumulator; animation playback consumes it directly.

use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

pub struct TimeState {
    /// Longest delta handed to the simulation in one frame (seconds).
    pub max_frame_dt: f64,
    pub total_time: f64,
    pub frame_count: u64,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self {
            max_frame_dt: 0.25,
            total_time: 0.0,
            frame_count: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    /// Measure the time since the previous call and return it in seconds.
    pub fn begin_frame(&mut self) -> f64 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.record(dt)
    }

    /// Feed an explicit delta. Returns the (possibly capped) delta.
    pub fn record(&mut self, dt: f64) -> f64 {
        let mut dt = dt.max(0.0);
        // Long stalls (window drag, debugger) would otherwise dump seconds of
        // time into physics at once.
        if dt > self.max_frame_dt {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                dt * 1000.0,
                self.max_frame_dt * 1000.0
            );
            dt = self.max_frame_dt;
        }

        self.real_dt = dt;
        self.total_time += dt;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
        dt
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}
