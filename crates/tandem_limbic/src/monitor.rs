//! Arousal Monitor - surprise × salience with an overload penalty
//!
//! Arousal only spikes when surprise and salience are elevated together:
//!
//! ```text
//! surprise_boost = 1 + |error| × surprise_sensitivity
//! salience_boost = 1 + |reward| × salience_sensitivity
//! raw            = base × surprise_boost × salience_boost × time_pressure
//! stress_penalty = 1 / (1 + ((raw − threshold) / threshold)²)
//! arousal        = clamp(raw × stress_penalty, 0, 1)
//! ```
//!
//! The penalty is evaluated on the instantaneous `raw` value, not on a
//! smoothed history. The running baseline kept here is bookkeeping only.

use serde::{Deserialize, Serialize};
use tandem_core::{
    ensure_finite, ArousalConfig, Domain, MonitorConfig, Result, StepBudget, StressCurve,
};

/// Breakdown of one arousal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArousalComponents {
    pub surprise_boost: f64,
    pub salience_boost: f64,
    pub time_pressure: f64,
    pub raw: f64,
    pub stress_penalty: f64,
    pub arousal: f64,
}

impl ArousalComponents {
    /// Evaluate the arousal formula. Inputs must already be finite.
    pub fn evaluate(config: &MonitorConfig, error: f64, reward: f64, time_pressure: f64) -> Self {
        let surprise_boost = 1.0 + error.abs() * config.surprise_sensitivity;
        let salience_boost = 1.0 + reward.abs() * config.salience_sensitivity;
        let raw = config.base_arousal * surprise_boost * salience_boost * time_pressure;

        let threshold = config.stress_threshold;
        let stress_penalty = match config.stress_curve {
            StressCurve::OneSided if raw <= threshold => 1.0,
            _ => {
                let excess = (raw - threshold) / threshold;
                1.0 / (1.0 + excess * excess)
            }
        };

        Self {
            surprise_boost,
            salience_boost,
            time_pressure,
            raw,
            stress_penalty,
            arousal: (raw * stress_penalty).clamp(0.0, 1.0),
        }
    }
}

/// Summary of every arousal value a monitor has produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArousalStatistics {
    pub count: u64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "final")]
    pub last: f64,
}

/// Welford accumulator behind `ArousalStatistics`.
#[derive(Debug, Clone, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.last = x;
    }

    fn summary(&self, fallback: f64) -> ArousalStatistics {
        if self.count == 0 {
            return ArousalStatistics {
                count: 0,
                mean: fallback,
                std: 0.0,
                min: fallback,
                max: fallback,
                last: fallback,
            };
        }
        ArousalStatistics {
            count: self.count,
            mean: self.mean,
            // Population standard deviation.
            std: (self.m2 / self.count as f64).sqrt(),
            min: self.min,
            max: self.max,
            last: self.last,
        }
    }
}

/// Arousal tracker for a single domain.
#[derive(Debug, Clone)]
pub struct ArousalMonitor {
    domain: Domain,
    config: MonitorConfig,

    /// Latest arousal in [0, 1].
    current: f64,

    /// Arousal before the latest update.
    previous: f64,

    /// Exponential moving average of arousal.
    baseline: f64,

    /// EMA factor (0 = frozen, 1 = instant).
    smoothing: f64,

    last_components: Option<ArousalComponents>,
    stats: RunningStats,
}

impl ArousalMonitor {
    /// Monitor with the default baseline smoothing.
    pub fn new(domain: Domain, config: MonitorConfig) -> Result<Self> {
        Self::with_smoothing(domain, config, ArousalConfig::default().baseline_smoothing)
    }

    pub fn with_smoothing(domain: Domain, config: MonitorConfig, smoothing: f64) -> Result<Self> {
        config.validate()?;
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(tandem_core::TandemError::InvalidConfiguration(format!(
                "baseline smoothing must be in [0, 1], got {smoothing}"
            )));
        }
        let resting = config.base_arousal.clamp(0.0, 1.0);
        Ok(Self {
            domain,
            config,
            current: resting,
            previous: resting,
            baseline: resting,
            smoothing,
            last_components: None,
            stats: RunningStats::default(),
        })
    }

    /// Update from this domain's prediction error and reward, with no time
    /// pressure.
    pub fn update(&mut self, prediction_error: f64, reward: f64) -> Result<f64> {
        self.update_with_pressure(prediction_error, reward, 1.0)
    }

    /// Update with urgency rising as the episode's step budget runs out.
    pub fn update_timed(
        &mut self,
        prediction_error: f64,
        reward: f64,
        budget: StepBudget,
    ) -> Result<f64> {
        let elapsed = 1.0 - budget.remaining_fraction();
        let pressure = 1.0 + elapsed * self.config.time_pressure_factor;
        self.update_with_pressure(prediction_error, reward, pressure)
    }

    fn update_with_pressure(
        &mut self,
        prediction_error: f64,
        reward: f64,
        pressure: f64,
    ) -> Result<f64> {
        let error = ensure_finite("prediction_error", prediction_error)?;
        let reward = ensure_finite("reward", reward)?;

        let components = ArousalComponents::evaluate(&self.config, error, reward, pressure);

        self.previous = self.current;
        self.current = components.arousal;
        self.baseline =
            self.baseline * (1.0 - self.smoothing) + components.arousal * self.smoothing;
        self.last_components = Some(components);
        self.stats.push(components.arousal);

        if components.stress_penalty < 0.5 {
            tracing::trace!(
                domain = %self.domain,
                raw = components.raw,
                penalty = components.stress_penalty,
                "arousal overload damped"
            );
        }

        Ok(components.arousal)
    }

    /// Return arousal to its resting level. Statistics are kept.
    pub fn reset(&mut self) {
        let resting = self.config.base_arousal.clamp(0.0, 1.0);
        self.current = resting;
        self.previous = resting;
        self.baseline = resting;
        self.last_components = None;
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn last_components(&self) -> Option<&ArousalComponents> {
        self.last_components.as_ref()
    }

    pub fn statistics(&self) -> ArousalStatistics {
        self.stats.summary(self.config.base_arousal.clamp(0.0, 1.0))
    }

    /// Arousal-scaled learning rate: `base × (1 + arousal)`.
    pub fn learning_rate(&self, base: f64) -> f64 {
        base * (1.0 + self.current)
    }

    /// Arousal-scaled exploration rate, capped at 1.
    pub fn exploration_rate(&self, base_epsilon: f64) -> f64 {
        (base_epsilon * (1.0 + self.current)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::TandemError;

    fn monitor() -> ArousalMonitor {
        ArousalMonitor::new(Domain::State, MonitorConfig::default()).unwrap()
    }

    #[test]
    fn test_formula_matches_hand_computation() {
        let cfg = MonitorConfig::default();
        let c = ArousalComponents::evaluate(&cfg, 2.0, -1.0, 1.0);

        // 0.3 × (1 + 2×0.5) × (1 + 1×0.3) = 0.78
        assert!((c.surprise_boost - 2.0).abs() < 1e-12);
        assert!((c.salience_boost - 1.3).abs() < 1e-12);
        assert!((c.raw - 0.78).abs() < 1e-12);
        let excess: f64 = (0.78 - 0.8) / 0.8;
        let penalty = 1.0 / (1.0 + excess * excess);
        assert!((c.stress_penalty - penalty).abs() < 1e-12);
        assert!((c.arousal - 0.78 * penalty).abs() < 1e-12);
    }

    #[test]
    fn test_one_sided_curve_ignores_low_raw() {
        let cfg = MonitorConfig {
            stress_curve: StressCurve::OneSided,
            ..Default::default()
        };
        let calm = ArousalComponents::evaluate(&cfg, 0.0, 0.0, 1.0);
        assert_eq!(calm.stress_penalty, 1.0);
        assert!((calm.arousal - 0.3).abs() < 1e-12);

        let symmetric = ArousalComponents::evaluate(&MonitorConfig::default(), 0.0, 0.0, 1.0);
        assert!(symmetric.arousal < calm.arousal);

        let hot = ArousalComponents::evaluate(&cfg, 10.0, 5.0, 1.0);
        assert!(hot.stress_penalty < 1.0);
    }

    #[test]
    fn test_multiplicative_needs_both_signals() {
        let cfg = MonitorConfig {
            stress_curve: StressCurve::OneSided,
            stress_threshold: 100.0,
            ..Default::default()
        };
        let surprise_only = ArousalComponents::evaluate(&cfg, 1.0, 0.0, 1.0).raw;
        let salience_only = ArousalComponents::evaluate(&cfg, 0.0, 1.0, 1.0).raw;
        let both = ArousalComponents::evaluate(&cfg, 1.0, 1.0, 1.0).raw;
        assert!(both > surprise_only + salience_only - cfg.base_arousal);
    }

    #[test]
    fn test_update_tracks_previous_and_baseline() {
        let mut m = monitor();
        let resting = m.current();
        let a = m.update(3.0, 1.0).unwrap();
        assert_eq!(m.previous(), resting);
        assert_eq!(m.current(), a);
        assert!((m.baseline() - (resting * 0.8 + a * 0.2)).abs() < 1e-12);
        assert!(m.last_components().is_some());
    }

    #[test]
    fn test_rejects_non_finite_signals() {
        let mut m = monitor();
        let before = m.current();
        assert!(matches!(
            m.update(f64::NAN, 0.0),
            Err(TandemError::InvalidSignal {
                name: "prediction_error",
                ..
            })
        ));
        assert!(matches!(
            m.update(0.0, f64::INFINITY),
            Err(TandemError::InvalidSignal { name: "reward", .. })
        ));
        assert_eq!(m.current(), before);
        assert_eq!(m.statistics().count, 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = MonitorConfig {
            salience_sensitivity: -1.0,
            ..Default::default()
        };
        assert!(ArousalMonitor::new(Domain::Agent, bad).is_err());
        let bad = MonitorConfig {
            stress_threshold: -0.5,
            ..Default::default()
        };
        assert!(ArousalMonitor::new(Domain::Agent, bad).is_err());
        let too_smooth =
            ArousalMonitor::with_smoothing(Domain::Agent, MonitorConfig::default(), 1.5);
        assert!(too_smooth.is_err());
    }

    #[test]
    fn test_time_pressure_raises_arousal_late_in_episode() {
        let cfg = MonitorConfig {
            stress_curve: StressCurve::OneSided,
            ..Default::default()
        };
        let mut early = ArousalMonitor::new(Domain::State, cfg).unwrap();
        let mut late = ArousalMonitor::new(Domain::State, cfg).unwrap();
        let budget = |used| StepBudget { used, limit: 50 };
        let a = early.update_timed(0.5, 0.1, budget(1)).unwrap();
        let b = late.update_timed(0.5, 0.1, budget(49)).unwrap();
        assert!(b > a);
        assert!(late.last_components().unwrap().time_pressure > 1.0);
    }

    #[test]
    fn test_reset_keeps_statistics() {
        let mut m = monitor();
        m.update(4.0, 5.0).unwrap();
        m.update(0.0, 0.1).unwrap();
        m.reset();
        assert_eq!(m.current(), 0.3);
        assert_eq!(m.statistics().count, 2);
    }

    #[test]
    fn test_statistics() {
        let mut m = monitor();
        let empty = m.statistics();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, 0.3);

        let values: Vec<f64> = [0.0, 1.0, 2.0, 3.0]
            .iter()
            .map(|e| m.update(*e, 0.0).unwrap())
            .collect();
        let s = m.statistics();
        let mean = values.iter().sum::<f64>() / 4.0;
        assert_eq!(s.count, 4);
        assert!((s.mean - mean).abs() < 1e-12);
        assert_eq!(s.last, values[3]);
        assert!(s.min <= s.mean && s.mean <= s.max);

        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["final"], values[3]);
        assert!(json.get("last").is_none());
    }

    #[test]
    fn test_default_smoothing_follows_config() {
        let smoothing = ArousalConfig::default().baseline_smoothing;
        let mut m = monitor();
        let mut explicit =
            ArousalMonitor::with_smoothing(Domain::State, MonitorConfig::default(), smoothing)
                .unwrap();
        m.update(2.0, 1.0).unwrap();
        explicit.update(2.0, 1.0).unwrap();
        assert_eq!(m.baseline(), explicit.baseline());
    }

    #[test]
    fn test_modulation_helpers() {
        let mut m = monitor();
        m.update(2.0, 1.0).unwrap();
        let a = m.current();
        assert!((m.learning_rate(0.1) - 0.1 * (1.0 + a)).abs() < 1e-12);
        assert!(m.exploration_rate(0.9) <= 1.0);
        assert!(m.exploration_rate(0.1) >= 0.1);
    }
}
