//! Common signal primitives
//!
//! Baseline estimation, run-length event detection, smoothing and the small
//! statistics helpers shared by every analysis stage. Everything here is a
//! pure function over `&[f64]` and returns 0 on empty input.

/// Lowest FHR value kept for baseline estimation
pub const BASELINE_MIN_BPM: f64 = 50.0;

/// Highest FHR value kept for baseline estimation
pub const BASELINE_MAX_BPM: f64 = 200.0;

/// Window of the double-smoothed median baseline, in samples
pub const BASELINE_WINDOW: usize = 10;

/// Minimum duration of an acceleration or deceleration, in seconds
pub const MIN_EVENT_SECS: f64 = 15.0;

/// Acceleration threshold above baseline from 32 weeks on
pub const ACCEL_THRESHOLD_BPM: f64 = 15.0;

/// Acceleration threshold above baseline before 32 weeks
pub const PRETERM_ACCEL_THRESHOLD_BPM: f64 = 10.0;

/// Deceleration threshold below baseline
pub const DECEL_THRESHOLD_BPM: f64 = 15.0;

/// UC level above which a sample belongs to a contraction
pub const CONTRACTION_THRESHOLD: f64 = 15.0;

/// Moving-average window for `smooth`
pub const SMOOTHING_WINDOW: usize = 5;

/// Median of a slice (mean of the middle pair for even lengths)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().cloned().fold(f64::INFINITY, f64::min)
}

pub fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

/// Least-squares slope of `values` against their sample index
pub fn linear_trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..n).map(|i| (i as f64).powi(2)).sum();

    let denominator = n_f * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denominator
}

/// Baseline FHR: median of sliding-window medians over physiologic samples
///
/// Samples outside [50, 200] bpm are discarded first. With fewer than
/// `BASELINE_WINDOW` samples left the plain median is returned.
pub fn calc_baseline(fhr: &[f64]) -> f64 {
    let filtered: Vec<f64> = fhr
        .iter()
        .cloned()
        .filter(|v| (BASELINE_MIN_BPM..=BASELINE_MAX_BPM).contains(v))
        .collect();

    if filtered.is_empty() {
        return 0.0;
    }
    if filtered.len() < BASELINE_WINDOW {
        return median(&filtered);
    }

    let window_medians: Vec<f64> = filtered.windows(BASELINE_WINDOW).map(median).collect();
    median(&window_medians)
}

/// Acceleration threshold for a gestational age
pub fn acceleration_threshold(ga_weeks: u32) -> f64 {
    if ga_weeks < 32 {
        PRETERM_ACCEL_THRESHOLD_BPM
    } else {
        ACCEL_THRESHOLD_BPM
    }
}

/// Count contiguous runs satisfying `hit` that last at least `min_len` samples
///
/// A run still open at the end of the series is counted under the same rule.
fn count_sustained_runs<F>(values: &[f64], min_len: usize, hit: F) -> usize
where
    F: Fn(f64) -> bool,
{
    let mut events = 0;
    let mut run = 0usize;

    for &v in values {
        if hit(v) {
            run += 1;
        } else {
            if run >= min_len {
                events += 1;
            }
            run = 0;
        }
    }
    if run >= min_len {
        events += 1;
    }

    events
}

/// Count accelerations: runs at or above `baseline + threshold` lasting
/// at least `min_len` samples
pub fn detect_accelerations(fhr: &[f64], baseline: f64, ga_weeks: u32, min_len: usize) -> usize {
    if fhr.is_empty() || baseline == 0.0 {
        return 0;
    }
    let level = baseline + acceleration_threshold(ga_weeks);
    count_sustained_runs(fhr, min_len.max(1), |v| v >= level)
}

/// Count decelerations: runs at or below `baseline - 15` lasting at least
/// `min_len` samples
pub fn detect_decelerations(fhr: &[f64], baseline: f64, min_len: usize) -> usize {
    if fhr.is_empty() || baseline == 0.0 {
        return 0;
    }
    let level = baseline - DECEL_THRESHOLD_BPM;
    count_sustained_runs(fhr, min_len.max(1), |v| v <= level)
}

/// Count rising edges of `value > threshold` (one per contraction or peak)
pub fn count_contractions(uc: &[f64], threshold: f64) -> usize {
    let mut count = 0;
    let mut in_contraction = false;

    for &v in uc {
        if v > threshold {
            if !in_contraction {
                count += 1;
                in_contraction = true;
            }
        } else {
            in_contraction = false;
        }
    }

    count
}

/// Centered moving average; the window shrinks at both edges
///
/// Signals shorter than the window are returned unchanged.
pub fn smooth(signal: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || signal.len() < window {
        return signal.to_vec();
    }

    let half = window / 2;
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(signal.len());
            mean(&signal[start..end])
        })
        .collect()
}
