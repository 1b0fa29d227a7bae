use crate::host::Host;
use anyhow::{Context, bail};
use colorpref_core::{Frame, Key};
use colorpref_experiment::{
    AssetConfig, ExperimentError, Keyboard, MONDRIAN_COUNT, Result, Screen,
};
use colorpref_render::{MaskBank, SkiaRenderer, TextCache};
use colorpref_timing::{FrameClock, FrameStats, HighPrecisionTimer, Timer};
use std::time::Duration;
use tracing::{info, warn};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};

pub const SELF_CHECK_FRAMES: usize = 120;
/// Relative refresh-rate error above which frame-count durations are wrong.
pub const MAX_RATE_DEVIATION: f64 = 0.05;

/// The real display and keyboard. Window events are pumped from inside every
/// `present`, `poll` and `wait`, so the session drives the event loop.
pub struct WindowRig {
    host: Host,
    renderer: SkiaRenderer,
    render_timer: HighPrecisionTimer,
    frame_timer: HighPrecisionTimer,
    last_present: Option<u64>,
    period: Duration,
    // dropped after the window it created
    event_loop: EventLoop<()>,
}

impl WindowRig {
    pub fn open(assets: &AssetConfig, refresh_rate: u32, fullscreen: bool) -> anyhow::Result<Self> {
        let mut event_loop = EventLoop::new()?;
        let mut host = Host::new(fullscreen);
        while host.pixels.is_none() {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut host);
            if let Some(e) = host.error.take() {
                return Err(e);
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited with status {code} before the window opened");
            }
        }

        let masks = match &assets.mondrian_dir {
            Some(dir) => MaskBank::load(dir, MONDRIAN_COUNT)?,
            None => {
                info!("no mondrian directory configured, generating masks");
                MaskBank::procedural(MONDRIAN_COUNT, &mut rand::rng())?
            }
        };
        let text = match &assets.font_path {
            Some(path) => Some(TextCache::load(path)?),
            None => {
                warn!("no font configured, instructions will not be drawn");
                None
            }
        };
        let renderer = SkiaRenderer::new(host.size.width, host.size.height, masks, text)
            .context("failed to create renderer")?;

        Ok(Self {
            host,
            renderer,
            render_timer: HighPrecisionTimer::new(),
            frame_timer: HighPrecisionTimer::new(),
            last_present: None,
            period: FrameClock::new(refresh_rate).period(),
            event_loop,
        })
    }

    pub fn describe(&self) {
        println!("Display Configuration:");
        println!("  Platform: {} {}", std::env::consts::OS, std::env::consts::ARCH);
        println!(
            "  Physical size: {}x{}",
            self.host.size.width, self.host.size.height
        );
        println!("  Scale factor: {:.2}", self.host.scale_factor);
        if let Some(rate) = self.host.refresh_rate {
            println!("  Refresh rate: {rate:.1} Hz");
        }
    }

    /// Processes pending window events. A lost event loop counts as an abort.
    fn pump(&mut self, timeout: Option<Duration>) -> Result<()> {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.host) {
            warn!(code, "event loop exited");
            self.host.keys.push_back(Key::Escape);
        }
        if let Some(e) = self.host.error.take() {
            return Err(ExperimentError::display(format!("{e:#}")));
        }
        if let Some(size) = self.host.resized.take() {
            self.resize(size.width, size.height)?;
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        if let Some(pixels) = &mut self.host.pixels {
            pixels
                .resize_surface(width, height)
                .map_err(|e| ExperimentError::display(e.to_string()))?;
            pixels
                .resize_buffer(width, height)
                .map_err(|e| ExperimentError::display(e.to_string()))?;
        }
        self.renderer
            .resize(width, height)
            .map_err(|e| ExperimentError::display(format!("{e:#}")))?;
        info!(width, height, "display resized");
        Ok(())
    }

    /// Next pending key from `allowed`; other keys are dropped.
    fn take(&mut self, allowed: &[Key]) -> Result<Option<Key>> {
        while let Some(key) = self.host.keys.pop_front() {
            if key == Key::Escape {
                return Err(ExperimentError::Aborted);
            }
            if allowed.contains(&key) {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// Presents blank frames and compares the measured refresh rate with
    /// `refresh_rate`.
    pub fn self_check(&mut self, refresh_rate: u32) -> Result<FrameStats> {
        self.frame_timer = HighPrecisionTimer::new();
        self.last_present = None;
        let frame = Frame::default();
        for _ in 0..SELF_CHECK_FRAMES {
            self.present(&frame)?;
        }
        let stats = self.frame_timer.frame_stats();
        match rate_mismatch(&stats, refresh_rate) {
            Some(deviation) => warn!(
                measured_hz = stats.effective_fps,
                configured_hz = refresh_rate,
                deviation,
                "display refresh rate does not match the configuration"
            ),
            None => info!(
                measured_hz = stats.effective_fps,
                jitter_ms = stats.jitter_ns / 1e6,
                "display self-check passed"
            ),
        }
        if let Some(draw) = self.renderer.component_stats("draw") {
            info!(
                render_ms = self.render_timer.frame_stats().average_frame_time_ns / 1e6,
                draw_ms = draw.average_frame_time_ns / 1e6,
                "render timing"
            );
        }
        Ok(stats)
    }
}

/// Deviation of the measured rate from `refresh_rate` when it exceeds the
/// tolerance, or when nothing was measured.
pub fn rate_mismatch(stats: &FrameStats, refresh_rate: u32) -> Option<f64> {
    match stats.rate_deviation(refresh_rate as f64) {
        Some(d) if d <= MAX_RATE_DEVIATION => None,
        Some(d) => Some(d),
        None => Some(1.0),
    }
}

impl Screen for WindowRig {
    fn aspect_ratio(&self) -> f32 {
        self.host.size.width as f32 / self.host.size.height.max(1) as f32
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.pump(Some(Duration::ZERO))?;
        if self.host.keys.contains(&Key::Escape) {
            return Err(ExperimentError::Aborted);
        }
        let pixels = self
            .host
            .pixels
            .as_mut()
            .ok_or_else(|| ExperimentError::display("surface is gone"))?;
        self.renderer
            .render_frame(frame, pixels.frame_mut(), &mut self.render_timer)
            .map_err(|e| ExperimentError::display(format!("{e:#}")))?;
        // blocks until the next vertical blank
        pixels
            .render()
            .map_err(|e| ExperimentError::display(e.to_string()))?;

        // a surface that returns well inside one period is not vsynced, so the
        // configured rate is kept with the timer instead
        if let Some(previous) = self.last_present {
            let since = self.frame_timer.elapsed(previous);
            if since < self.period / 2 {
                self.frame_timer.sleep(self.period - since);
            }
        }
        let now = self.frame_timer.now();
        if let Some(previous) = self.last_present.replace(now) {
            self.frame_timer
                .record_frame(Duration::from_nanos(now.saturating_sub(previous)));
        }
        Ok(())
    }
}

impl Keyboard for WindowRig {
    fn poll(&mut self, allowed: &[Key]) -> Result<Option<Key>> {
        self.pump(Some(Duration::ZERO))?;
        self.take(allowed)
    }

    fn wait(&mut self, allowed: &[Key]) -> Result<Key> {
        loop {
            if let Some(key) = self.take(allowed)? {
                return Ok(key);
            }
            self.pump(None)?;
        }
    }

    /// The abort key survives a clear.
    fn clear(&mut self) {
        if let Err(e) = self.pump(Some(Duration::ZERO)) {
            warn!(error = %e, "failed to pump events while clearing keys");
        }
        self.host.keys.retain(|&k| k == Key::Escape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_at(hz: f64) -> FrameStats {
        FrameStats::from_durations(&vec![Duration::from_secs_f64(1.0 / hz); SELF_CHECK_FRAMES])
    }

    #[test]
    fn small_rate_error_passes() {
        assert_eq!(rate_mismatch(&stats_at(59.0), 60), None);
        assert_eq!(rate_mismatch(&stats_at(61.5), 60), None);
    }

    #[test]
    fn wrong_refresh_rate_is_flagged() {
        let deviation = rate_mismatch(&stats_at(144.0), 60).unwrap();
        assert!((deviation - 1.4).abs() < 1e-6);
        assert!(rate_mismatch(&stats_at(50.0), 60).is_some());
    }

    #[test]
    fn no_samples_is_flagged() {
        assert_eq!(rate_mismatch(&FrameStats::default(), 60), Some(1.0));
    }
}
