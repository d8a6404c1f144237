//! Demo CTG stream simulator
//!
//! Each `StreamSimulator` owns its RNG and episode state, so independent
//! streams never share anything. The same seed always reproduces the same
//! stream.

use crate::{Result, Sample, Seed, Signal, TimeSeries};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Acceleration episode length, in seconds
pub const ACCELERATION_SECS: f64 = 15.0;

/// Deceleration episode length, in seconds
pub const DECELERATION_SECS: f64 = 20.0;

/// Contraction length, in seconds
pub const CONTRACTION_SECS: f64 = 30.0;

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub sample_rate_hz: f64,
    pub fhr_baseline: f64,
    pub fhr_noise_sd: f64,
    pub uc_baseline: f64,
    pub uc_noise_sd: f64,
    /// Per-sample probability of starting an acceleration
    pub acceleration_probability: f64,
    /// Per-sample probability of starting a deceleration
    pub deceleration_probability: f64,
    /// Per-sample probability of starting a contraction
    pub contraction_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 4.0,
            fhr_baseline: 140.0,
            fhr_noise_sd: 5.0,
            uc_baseline: 20.0,
            uc_noise_sd: 3.0,
            acceleration_probability: 0.0005,
            deceleration_probability: 0.0002,
            contraction_probability: 0.001,
        }
    }
}

impl SimulatorConfig {
    pub fn with_sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate_hz = hz;
        self
    }

    pub fn with_fhr_baseline(mut self, bpm: f64) -> Self {
        self.fhr_baseline = bpm;
        self
    }

    pub fn with_episode_probabilities(mut self, acceleration: f64, deceleration: f64, contraction: f64) -> Self {
        self.acceleration_probability = acceleration;
        self.deceleration_probability = deceleration;
        self.contraction_probability = contraction;
        self
    }
}

/// Episodes completed so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorStats {
    pub accelerations: usize,
    pub decelerations: usize,
    pub contractions: usize,
}

/// Aligned FHR and UC samples for one time span
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedChunk {
    pub fhr: Vec<Sample>,
    pub uc: Vec<Sample>,
    pub sample_rate_hz: f64,
}

impl SimulatedChunk {
    /// Validate into analysis-ready series
    pub fn into_series(self) -> Result<(TimeSeries, TimeSeries)> {
        Ok((
            TimeSeries::new(Signal::Fhr, self.fhr, self.sample_rate_hz)?,
            TimeSeries::new(Signal::Uc, self.uc, self.sample_rate_hz)?,
        ))
    }
}

/// Seeded, per-stream FHR/UC generator
#[derive(Debug, Clone)]
pub struct StreamSimulator {
    config: SimulatorConfig,
    seed: Seed,
    rng: ChaCha20Rng,
    /// Index of the next sample
    position: u64,
    acceleration_left: usize,
    deceleration_left: usize,
    contraction_left: usize,
    contraction_amplitude: f64,
    stats: SimulatorStats,
}

impl StreamSimulator {
    pub fn new(config: SimulatorConfig, seed: Seed) -> Self {
        StreamSimulator {
            config,
            seed,
            rng: ChaCha20Rng::from_seed(*seed.as_bytes()),
            position: 0,
            acceleration_left: 0,
            deceleration_left: 0,
            contraction_left: 0,
            contraction_amplitude: 0.0,
            stats: SimulatorStats::default(),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn stats(&self) -> SimulatorStats {
        self.stats
    }

    /// Seconds generated so far
    pub fn elapsed_secs(&self) -> f64 {
        self.position as f64 / self.config.sample_rate_hz
    }

    /// Rewind to the start of the stream
    pub fn reset(&mut self) {
        *self = StreamSimulator::new(self.config, self.seed);
    }

    /// Generate the next `duration_secs` of both channels
    pub fn next_chunk(&mut self, duration_secs: f64) -> SimulatedChunk {
        let rate = self.config.sample_rate_hz;
        let count = (duration_secs * rate).max(0.0) as usize;
        let mut fhr = Vec::with_capacity(count);
        let mut uc = Vec::with_capacity(count);

        for _ in 0..count {
            let time = self.position as f64 / rate;
            fhr.push(Sample::new(time, self.next_fhr()));
            uc.push(Sample::new(time, self.next_uc()));
            self.position += 1;
        }

        SimulatedChunk { fhr, uc, sample_rate_hz: rate }
    }

    fn next_fhr(&mut self) -> f64 {
        let rate = self.config.sample_rate_hz;
        let mut value = self.config.fhr_baseline + self.normal(self.config.fhr_noise_sd);

        if self.acceleration_left > 0 {
            value += 15.0 + self.normal(3.0);
            self.acceleration_left -= 1;
            if self.acceleration_left == 0 {
                self.stats.accelerations += 1;
            }
        } else if self.rng.gen::<f64>() < self.config.acceleration_probability {
            self.acceleration_left = crate::samples_for(ACCELERATION_SECS, rate);
        }

        if self.deceleration_left > 0 {
            value -= 20.0 + self.normal(5.0);
            self.deceleration_left -= 1;
            if self.deceleration_left == 0 {
                self.stats.decelerations += 1;
            }
        } else if self.rng.gen::<f64>() < self.config.deceleration_probability {
            self.deceleration_left = crate::samples_for(DECELERATION_SECS, rate);
        }

        round2(value.clamp(80.0, 200.0))
    }

    fn next_uc(&mut self) -> f64 {
        let length = crate::samples_for(CONTRACTION_SECS, self.config.sample_rate_hz);
        let mut value = self.config.uc_baseline + self.normal(self.config.uc_noise_sd);

        if self.contraction_left > 0 {
            // Half sine: rises from tone to peak and back
            let progress = self.contraction_left as f64 / length as f64;
            value += self.contraction_amplitude * (std::f64::consts::PI * progress).sin();
            self.contraction_left -= 1;
            if self.contraction_left == 0 {
                self.stats.contractions += 1;
            }
        } else if self.rng.gen::<f64>() < self.config.contraction_probability {
            self.contraction_left = length;
            self.contraction_amplitude = self.rng.gen_range(20.0..60.0);
        }

        round2(value.clamp(0.0, 100.0))
    }

    /// Gaussian noise via Box-Muller
    fn normal(&mut self, sd: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        sd * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
