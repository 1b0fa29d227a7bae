use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Trait for high-precision timers
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn frame_count(&self) -> usize;
    fn frame_stats(&self) -> FrameStats;
}

/// Summary of recorded frame durations.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl FrameStats {
    pub fn from_durations(frame_times: &[Duration]) -> Self {
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return Self::default();
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        FrameStats {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_frame_time_ns: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }

    /// Relative deviation of the measured rate from `nominal_hz`.
    pub fn rate_deviation(&self, nominal_hz: f64) -> Option<f64> {
        (self.effective_fps > 0.0 && nominal_hz > 0.0)
            .then(|| (self.effective_fps - nominal_hz).abs() / nominal_hz)
    }
}

fn push_bounded(frame_times: &mut Vec<Duration>, max_samples: usize, d: Duration) {
    if frame_times.len() >= max_samples {
        frame_times.remove(0);
    }
    frame_times.push(d);
}

/// Wall-clock timer with platform sleeps.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        push_bounded(&mut self.frame_times, self.max_samples, d);
    }
    fn frame_count(&self) -> usize {
        self.frame_times.len()
    }
    fn frame_stats(&self) -> FrameStats {
        FrameStats::from_durations(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, INFINITE, SetWaitableTimer, WaitForSingleObject,
        };
        use windows::core::PCWSTR;

        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, PCWSTR::null()) else {
                std::thread::sleep(duration);
                return;
            };

            // negative: relative time in 100 ns intervals
            let due = -((duration.as_nanos() / 100) as i64);

            if SetWaitableTimer(timer, &due, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            }

            let _ = CloseHandle(timer);
        }
    }

    /// Sleeps to an absolute deadline, so an interrupted sleep resumes
    /// without drift.
    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, EINTR, TIMER_ABSTIME, clock_gettime, clock_nanosleep, timespec};

        let mut deadline = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe {
            clock_gettime(CLOCK_MONOTONIC, &mut deadline);
        }
        let nanos = deadline.tv_nsec as u64 + u64::from(duration.subsec_nanos());
        deadline.tv_sec += (duration.as_secs() + nanos / 1_000_000_000) as libc::time_t;
        deadline.tv_nsec = (nanos % 1_000_000_000) as libc::c_long;

        loop {
            let rc = unsafe {
                clock_nanosleep(CLOCK_MONOTONIC, TIMER_ABSTIME, &deadline, std::ptr::null_mut())
            };
            if rc != EINTR {
                break;
            }
        }
    }

    /// Coarse thread sleep, then spins out the last stretch on the mach clock.
    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};
        const SPIN: Duration = Duration::from_micros(200);

        let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
        let start = unsafe {
            mach_timebase_info(&mut timebase);
            mach_absolute_time()
        };
        let ticks = (duration.as_nanos() as u64).saturating_mul(u64::from(timebase.denom))
            / u64::from(timebase.numer.max(1));

        if let Some(coarse) = duration.checked_sub(SPIN) {
            std::thread::sleep(coarse);
        }
        while unsafe { mach_absolute_time() } - start < ticks {
            std::hint::spin_loop();
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer whose clock only moves when told to. Clones share the clock, so a
/// simulated display can advance the time a runner reads.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    frame_times: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        push_bounded(&mut self.frame_times, 1000, d);
    }
    fn frame_count(&self) -> usize {
        self.frame_times.len()
    }
    fn frame_stats(&self) -> FrameStats {
        FrameStats::from_durations(&self.frame_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_the_clock() {
        let timer = ManualTimer::new();
        let start = timer.now();
        let handle = timer.clone();
        handle.advance(Duration::from_millis(250));
        assert_eq!(timer.elapsed(start), Duration::from_millis(250));
        timer.sleep(Duration::from_millis(50));
        assert_eq!(handle.now(), 300_000_000);
    }

    #[test]
    fn frame_stats_report_rate_and_jitter() {
        let mut timer = ManualTimer::new();
        for _ in 0..10 {
            timer.record_frame(Duration::from_micros(16_667));
        }
        let stats = timer.frame_stats();
        assert_eq!(stats.samples, 10);
        assert!((stats.effective_fps - 60.0).abs() < 0.01);
        assert!(stats.jitter_ns < 1.0);
        assert!(stats.rate_deviation(60.0).unwrap() < 0.001);
        assert!(stats.rate_deviation(75.0).unwrap() > 0.05);
    }

    #[test]
    fn platform_sleep_does_not_return_early() {
        let timer = HighPrecisionTimer::new();
        let start = timer.now();
        timer.sleep(Duration::from_millis(3));
        assert!(timer.elapsed(start) >= Duration::from_millis(3));
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = HighPrecisionTimer::new().frame_stats();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.rate_deviation(60.0), None);
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 3;
        for ms in 1..=5 {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(timer.frame_times.first(), Some(&Duration::from_millis(3)));
        assert_eq!(timer.frame_count(), 3);
    }
}
