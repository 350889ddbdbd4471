use crate::error::{invalid_config, Result as CoreResult};
use crate::types::{Mood, Position};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    })
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemConfig {
    pub environment: EnvironmentConfig,
    pub arousal: ArousalConfig,
    pub integration: IntegrationConfig,
    pub training: TrainingConfig,
}

impl TandemConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: TandemConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from path, or use defaults with env overrides when the file does
    /// not exist. A file that exists but fails to parse or validate is an
    /// error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Ok(cfg) => Ok(cfg),
            Err(e) if is_not_found(&e) => {
                tracing::info!("Config file {} not found, using defaults", path.as_ref().display());
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TANDEM_AGENT") {
            match v.parse() {
                Ok(kind) => self.training.agent = kind,
                Err(_) => tracing::warn!("Ignoring unknown TANDEM_AGENT value '{}'", v),
            }
        }
        if let Ok(v) = std::env::var("TANDEM_EPISODES") {
            if let Ok(n) = v.parse() {
                self.training.episodes = n;
            }
        }
        if let Ok(v) = std::env::var("TANDEM_STRATEGY") {
            match v.to_lowercase().as_str() {
                "weighted" => self.integration.strategy = StrategyKind::Weighted,
                "gated" => self.integration.strategy = StrategyKind::Gated,
                other => tracing::warn!("Ignoring unknown TANDEM_STRATEGY value '{}'", other),
            }
        }
        if let Ok(v) = std::env::var("TANDEM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.integration.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("TANDEM_MOOD_CYCLE_LENGTH") {
            if let Ok(n) = v.parse() {
                self.environment.mood_cycle_length = n;
            }
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.environment.validate()?;
        self.arousal.validate()?;
        self.integration.validate()?;
        self.training.validate()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Where the agent is placed on `reset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    /// Always `start_position`.
    #[default]
    Fixed,
    /// A uniformly chosen grid corner other than the goal.
    RandomCorner,
    /// Any cell other than the goal and the NPC.
    RandomCell,
}

/// What counts as meeting the NPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Stepping onto the NPC cell interacts; so does `Interact` while adjacent.
    #[default]
    Contact,
    /// Only `Interact` while adjacent interacts.
    Adjacent,
}

/// Order in which ground-truth mood advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodCycle {
    /// Friendly → Neutral → Hostile → Friendly.
    #[default]
    RoundRobin,
    /// A different mood drawn from the environment's seeded RNG.
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub grid_size: i32,
    pub npc_position: Position,
    pub goal_position: Position,
    pub start: StartMode,
    pub start_position: Position,
    pub interaction: InteractionMode,
    /// Completed episodes per mood transition.
    pub mood_cycle_length: u64,
    pub mood_cycle: MoodCycle,
    pub initial_mood: Mood,
    pub episode_step_limit: u32,
    /// Hostile interactions within one episode that end it.
    pub hostile_interaction_limit: u32,
    /// Completed-episode counter at construction.
    pub starting_episode: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            npc_position: Position::new(2, 2),
            goal_position: Position::new(4, 4),
            start: StartMode::Fixed,
            start_position: Position::new(0, 0),
            interaction: InteractionMode::Contact,
            mood_cycle_length: 75,
            mood_cycle: MoodCycle::RoundRobin,
            initial_mood: Mood::Neutral,
            episode_step_limit: 50,
            hostile_interaction_limit: 3,
            starting_episode: 0,
        }
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.grid_size < 2 {
            return Err(invalid_config(format!("grid_size must be >= 2, got {}", self.grid_size)));
        }
        for (name, pos) in [
            ("npc_position", self.npc_position),
            ("goal_position", self.goal_position),
            ("start_position", self.start_position),
        ] {
            if !pos.in_bounds(self.grid_size) {
                return Err(invalid_config(format!(
                    "{name} {pos} outside {0}x{0} grid",
                    self.grid_size
                )));
            }
        }
        if self.npc_position == self.goal_position {
            return Err(invalid_config("npc_position must differ from goal_position"));
        }
        if self.start == StartMode::Fixed
            && (self.start_position == self.goal_position
                || self.start_position == self.npc_position)
        {
            return Err(invalid_config("start_position must differ from goal and npc positions"));
        }
        if self.mood_cycle_length == 0 {
            return Err(invalid_config("mood_cycle_length must be >= 1"));
        }
        if self.episode_step_limit == 0 {
            return Err(invalid_config("episode_step_limit must be >= 1"));
        }
        if self.hostile_interaction_limit == 0 {
            return Err(invalid_config("hostile_interaction_limit must be >= 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Arousal
// ============================================================================

/// Shape of the overload penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressCurve {
    /// `1 / (1 + ((raw - t) / t)^2)` on every call.
    #[default]
    Symmetric,
    /// Same penalty, applied only once `raw` exceeds the threshold.
    OneSided,
}

/// Per-domain arousal constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub base_arousal: f64,
    pub surprise_sensitivity: f64,
    pub salience_sensitivity: f64,
    pub stress_threshold: f64,
    pub time_pressure_factor: f64,
    pub stress_curve: StressCurve,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_arousal: 0.3,
            surprise_sensitivity: 0.5,
            salience_sensitivity: 0.3,
            stress_threshold: 0.8,
            time_pressure_factor: 0.2,
            stress_curve: StressCurve::Symmetric,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> CoreResult<()> {
        let finite_non_negative = [
            ("base_arousal", self.base_arousal),
            ("surprise_sensitivity", self.surprise_sensitivity),
            ("salience_sensitivity", self.salience_sensitivity),
            ("time_pressure_factor", self.time_pressure_factor),
        ];
        for (name, v) in finite_non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid_config(format!("{name} must be finite and >= 0, got {v}")));
            }
        }
        if !self.stress_threshold.is_finite() || self.stress_threshold <= 0.0 {
            return Err(invalid_config(format!(
                "stress_threshold must be finite and > 0, got {}",
                self.stress_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArousalConfig {
    pub state: MonitorConfig,
    pub agent: MonitorConfig,
    /// Reset both monitors to baseline whenever an episode begins.
    pub reset_arousal_on_episode_start: bool,
    /// EMA factor for the monitors' running baseline (0 = frozen, 1 = instant).
    pub baseline_smoothing: f64,
}

impl Default for ArousalConfig {
    fn default() -> Self {
        Self {
            state: MonitorConfig::default(),
            agent: MonitorConfig::default(),
            reset_arousal_on_episode_start: true,
            baseline_smoothing: 0.2,
        }
    }
}

impl ArousalConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.state.validate()?;
        self.agent.validate()?;
        if !(0.0..=1.0).contains(&self.baseline_smoothing) {
            return Err(invalid_config(format!(
                "baseline_smoothing must be in [0, 1], got {}",
                self.baseline_smoothing
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Integration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Weighted,
    Gated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub strategy: StrategyKind,
    /// Softmax temperature, weighted strategy only.
    pub temperature: f64,
    /// Minimum arousal gap for hard selection, gated strategy only.
    pub gate_threshold: f64,
    /// (state, agent) weights for the fixed-integration agent.
    pub fixed_weights: [f64; 2],
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Weighted,
            temperature: 1.0,
            gate_threshold: 0.2,
            fixed_weights: [0.5, 0.5],
        }
    }
}

impl IntegrationConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(invalid_config(format!(
                "temperature must be finite and > 0, got {}",
                self.temperature
            )));
        }
        if !self.gate_threshold.is_finite() || self.gate_threshold < 0.0 {
            return Err(invalid_config(format!(
                "gate_threshold must be finite and >= 0, got {}",
                self.gate_threshold
            )));
        }
        let [s, a] = self.fixed_weights;
        if !s.is_finite() || !a.is_finite() || s < 0.0 || a < 0.0 || s + a <= 0.0 {
            return Err(invalid_config(format!(
                "fixed_weights must be non-negative with a positive sum, got [{s}, {a}]"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Monolithic,
    Fixed,
    #[default]
    Arousal,
}

impl AgentKind {
    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Monolithic => "monolithic",
            AgentKind::Fixed => "fixed",
            AgentKind::Arousal => "arousal",
        }
    }
}

impl std::str::FromStr for AgentKind {
    type Err = crate::error::TandemError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "monolithic" => Ok(AgentKind::Monolithic),
            "fixed" => Ok(AgentKind::Fixed),
            "arousal" => Ok(AgentKind::Arousal),
            other => Err(invalid_config(format!("unknown agent kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub agent: AgentKind,
    pub episodes: u64,
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
    pub seeds: Vec<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            agent: AgentKind::Arousal,
            episodes: 500,
            learning_rate: 0.1,
            discount: 0.95,
            epsilon: 0.1,
            seeds: vec![0],
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> CoreResult<()> {
        for (name, v) in [
            ("learning_rate", self.learning_rate),
            ("discount", self.discount),
            ("epsilon", self.epsilon),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid_config(format!("{name} must be in [0, 1], got {v}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
