//! Iteration timing and progress reporting for the batch drivers.
//!
//! Components
//! -----------------
//! * [`IterTimer`] – per-iteration durations with an exponential moving average
//!   `ema ← α·dt + (1–α)·ema`, `α ∈ (0,1]`. The first tick initializes the average.
//! * [`fmt_dur`] – compact [`Duration`] formatting (`"253µs"`, `"42ms"`, `"3.14s"`).
//! * [`BatchProgress`] – progress bar over an asteroid range, drawn with `indicatif`
//!   when the `progress` feature is enabled and silent otherwise.
use std::time::{Duration, Instant};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

pub struct IterTimer {
    last: Instant,
    ema_ns: f64,
    alpha: f64,
    count: u64,
}

impl IterTimer {
    pub fn new(alpha: f64) -> Self {
        Self {
            last: Instant::now(),
            ema_ns: 0.0,
            alpha,
            count: 0,
        }
    }

    #[inline]
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.count += 1;

        let dt_ns = dt.as_nanos() as f64;
        self.ema_ns = if self.count == 1 {
            dt_ns
        } else {
            self.alpha * dt_ns + (1.0 - self.alpha) * self.ema_ns
        };
        dt
    }

    #[inline]
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.ema_ns as u64)
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[inline]
pub fn fmt_dur(d: Duration) -> String {
    let us = d.as_micros();
    if us < 1_000 {
        format!("{us}µs")
    } else if d.as_millis() < 1_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f32())
    }
}

/// One step per asteroid.
pub(crate) struct BatchProgress {
    timer: IterTimer,
    #[cfg(feature = "progress")]
    bar: ProgressBar,
}

impl BatchProgress {
    pub(crate) fn new(total: u64) -> Self {
        #[cfg(feature = "progress")]
        let bar = {
            let bar = ProgressBar::new(total.max(1));
            bar.set_style(
                ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) \
                     | {per_sec} | ETA {eta_precise} | {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        };
        #[cfg(not(feature = "progress"))]
        let _ = total;

        BatchProgress {
            timer: IterTimer::new(0.2),
            #[cfg(feature = "progress")]
            bar,
        }
    }

    /// Mark the start of the work on `asteroid`.
    pub(crate) fn step(&mut self, asteroid: u32) {
        let last = self.timer.tick();
        let avg = self.timer.avg();
        #[cfg(feature = "progress")]
        {
            self.bar.set_message(format!(
                "A{asteroid} | last: {}, avg: {}",
                fmt_dur(last),
                fmt_dur(avg)
            ));
            if self.timer.count() > 1 {
                self.bar.inc(1);
            }
        }
        #[cfg(not(feature = "progress"))]
        tracing::trace!(asteroid, last = %fmt_dur(last), avg = %fmt_dur(avg), "batch step");
    }

    /// Smoothed duration of one step.
    pub(crate) fn finish(self) -> Duration {
        #[cfg(feature = "progress")]
        self.bar.finish_and_clear();
        self.timer.avg()
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_fmt_dur_scales() {
        assert_eq!(fmt_dur(Duration::from_micros(253)), "253µs");
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(3140)), "3.14s");
    }

    #[test]
    fn test_timer_average() {
        let mut timer = IterTimer::new(0.5);
        assert_eq!(timer.avg(), Duration::ZERO);
        timer.tick();
        timer.tick();
        assert_eq!(timer.count(), 2);
    }
}
