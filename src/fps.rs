use std::time::{Duration, Instant};

/// Frames between two rate reports.
const REPORT_INTERVAL: u32 = 120;

/// Frame-rate accounting around a render loop.
#[derive(Debug)]
pub struct FrameCounter {
    start: Instant,
    last_report: Instant,
    frames: u32,
    since_report: u32,
}

impl FrameCounter {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_report: now,
            frames: 0,
            since_report: 0,
        }
    }

    /// Account for one finished frame.
    pub fn end_frame(&mut self) {
        self.frames += 1;
        self.since_report += 1;
        if self.since_report == REPORT_INTERVAL {
            let now = Instant::now();
            log::info!(
                "fps: {:.2} over the last {REPORT_INTERVAL} frames",
                rate(REPORT_INTERVAL, now - self.last_report)
            );
            self.last_report = now;
            self.since_report = 0;
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Log the summary of the whole run.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        log::info!(
            "fps: rendered {} frames in {elapsed:?} ({:.2} fps)",
            self.frames,
            rate(self.frames, elapsed)
        );
        elapsed
    }
}

fn rate(frames: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        f64::from(frames) / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn counts_frames_across_reports() {
        let mut counter = FrameCounter::start();
        for _ in 0..REPORT_INTERVAL * 2 + 3 {
            counter.end_frame();
        }
        assert_eq!(counter.frames(), 243);
        assert_eq!(counter.since_report, 3);
        counter.finish();
    }

    #[test]
    fn rate_of_empty_interval() {
        assert_eq!(rate(10, Duration::ZERO), 0.0);
        assert_eq!(rate(60, Duration::from_secs(2)), 30.0);
    }
}
