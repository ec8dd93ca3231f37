use std::collections::HashMap;
use std::time::Instant;

/// Frames between two frame-rate readings.
const FPS_STEP: usize = 20;

/// Observer for per-frame pipeline events.
///
/// Keeps annotation and orchestration code free of any particular output
/// mechanism; hosts pick an implementation.
pub trait PipelineLogger: Send {
    /// A frame finished. `total` is 0 for open-ended streams.
    fn progress(&mut self, current: usize, total: usize);

    /// Duration of one named stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time measurement, e.g. the number of outlined regions.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-stream report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by [`crate::pipeline::session::Session::annotate`].
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count and total of one timing stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total: f64,
}

impl StageStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// Frame-rate meter plus per-stage timing report, written through `log`.
///
/// Only running totals are kept, so an open-ended camera stream does not
/// grow the logger.
///
/// Every [`FPS_STEP`] frames the rate over the last window is logged as
/// `"{fps:.2} FPS@{width}x{height}"`.
pub struct StdoutPipelineLogger {
    frame_size: Option<(u32, u32)>,
    frames: usize,
    window_start: Instant,
    start_time: Instant,
    last_fps: Option<f64>,
    timings: HashMap<String, StageStats>,
    metrics: HashMap<String, StageStats>,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_size: None,
            frames: 0,
            window_start: now,
            start_time: now,
            last_fps: None,
            timings: HashMap::new(),
            metrics: HashMap::new(),
        }
    }

    /// Frame size shown next to the rate.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Most recent windowed frame rate, once [`FPS_STEP`] frames have passed.
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    pub fn fps_text(&self) -> Option<String> {
        let fps = self.last_fps?;
        Some(match self.frame_size {
            Some((w, h)) => format!("{fps:.2} FPS@{w}x{h}"),
            None => format!("{fps:.2} FPS"),
        })
    }

    pub fn timings_for(&self, stage: &str) -> Option<StageStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<StageStats> {
        self.metrics.get(name).copied()
    }

    /// Formatted report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Annotated {} frame(s) in {:.2}s",
            self.frames, elapsed_s
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = self.timings[stage];
            let (total_ms, avg_ms) = (stats.total, stats.mean());
            lines.push(format!("  {stage:10}: avg {avg_ms:6.2}ms  total {total_ms:8.1}ms"));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let avg = self.metrics[name].mean();
            lines.push(format!("  {name}: avg {avg:.2}"));
        }

        if self.frames > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.2} fps",
                self.frames as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    fn tick(&mut self) {
        self.frames += 1;
        if self.frames % FPS_STEP != 0 {
            return;
        }
        let window_s = self.window_start.elapsed().as_secs_f64();
        self.window_start = Instant::now();
        if window_s > 0.0 {
            self.last_fps = Some(FPS_STEP as f64 / window_s);
            if let Some(text) = self.fps_text() {
                log::info!("{text}");
            }
        }
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.tick();
        if total > 0 && current == total {
            log::info!("Processed {current}/{total} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
