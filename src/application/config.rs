// Request Configuration
//
// A request is a TOML document: the options of one generation run, and for
// the command line front end, the already-validated player records.

use crate::domain::stacking::MAX_STACK_POSITIONS;
use crate::domain::{
    LineupConstraints, Player, RosterSlot, RosterTemplate, Site, SolverSettings, StackingRule,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Options of one lineup generation request.
///
/// `salary_cap` and `max_players_per_team` fall back to the roster preset of
/// `site` when omitted. A custom `roster` replaces the preset's slots.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RequestConfig {
    pub lineup_count: usize,
    pub site: Site,
    pub roster: Option<Vec<RosterSlot>>,
    pub salary_cap: Option<u32>,
    pub salary_floor: u32,
    pub max_exposure: f64,
    pub max_pair_exposure: f64,
    pub max_players_per_team: Option<usize>,
    pub stacking_rules: Vec<StackingRule>,
    /// Objective jitter and diversification aggressiveness, in [0, 1].
    pub randomness: f64,
    pub max_repeating_players: Option<usize>,
    /// Solver calls allowed for the whole batch; three per lineup if unset.
    pub max_attempts: Option<usize>,
    pub seed: Option<u64>,
    pub diversify: bool,
    /// Player ids forced into every lineup while under their cap.
    pub locked: Vec<String>,
    /// Player ids never used.
    pub excluded: Vec<String>,
    pub solver: SolverSettings,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            lineup_count: 1,
            site: Site::default(),
            roster: None,
            salary_cap: None,
            salary_floor: 0,
            max_exposure: 1.0,
            max_pair_exposure: 1.0,
            max_players_per_team: None,
            stacking_rules: Vec::new(),
            randomness: 0.0,
            max_repeating_players: None,
            max_attempts: None,
            seed: None,
            diversify: true,
            locked: Vec::new(),
            excluded: Vec::new(),
            solver: SolverSettings::default(),
        }
    }
}

impl RequestConfig {
    pub fn new(lineup_count: usize) -> Self {
        Self {
            lineup_count,
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lineup_count == 0 {
            return Err(invalid("lineup_count must be greater than 0"));
        }
        for (name, value) in [
            ("max_exposure", self.max_exposure),
            ("max_pair_exposure", self.max_pair_exposure),
            ("randomness", self.randomness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if matches!(&self.roster, Some(slots) if slots.is_empty()) {
            return Err(invalid("roster must have at least one slot"));
        }
        if let Some(slot) = self
            .roster
            .iter()
            .flatten()
            .find(|slot| slot.positions.is_empty())
        {
            return Err(invalid(format!("roster slot '{}' accepts no position", slot.name)));
        }
        if let Some(slot) = self.roster.iter().flatten().find(|slot| {
            [slot.salary_multiplier, slot.points_multiplier]
                .iter()
                .any(|m| !m.is_finite() || *m <= 0.0)
        }) {
            return Err(invalid(format!(
                "roster slot '{}' needs positive multipliers",
                slot.name
            )));
        }
        if let Some(rule) = self
            .stacking_rules
            .iter()
            .find(|rule| rule.distinct_positions() > MAX_STACK_POSITIONS)
        {
            return Err(invalid(format!(
                "stacking rule {rule:?} names {} distinct positions, at most {} are supported",
                rule.distinct_positions(),
                MAX_STACK_POSITIONS
            )));
        }

        let cap = self.salary_cap();
        if self.salary_floor > cap {
            return Err(invalid(format!(
                "salary_floor {} exceeds salary_cap {}",
                self.salary_floor, cap
            )));
        }
        if self.max_players_per_team == Some(0) {
            return Err(invalid("max_players_per_team must be at least 1"));
        }
        if self.max_attempts == Some(0) {
            return Err(invalid("max_attempts must be at least 1"));
        }
        if let Some(seconds) = self.solver.time_limit_seconds {
            if seconds.is_nan() || seconds <= 0.0 {
                return Err(invalid("solver.time_limit_seconds must be positive"));
            }
        }
        Ok(())
    }

    pub fn salary_cap(&self) -> u32 {
        self.salary_cap.unwrap_or_else(|| self.site.roster().salary_cap)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
            .unwrap_or_else(|| self.lineup_count.saturating_mul(3))
    }

    /// Roster layout of the request with its cap and team limit resolved.
    pub fn roster_template(&self) -> RosterTemplate {
        let preset = self.site.roster();
        RosterTemplate {
            slots: self.roster.clone().unwrap_or(preset.slots),
            salary_cap: self.salary_cap.unwrap_or(preset.salary_cap),
            max_players_per_team: self.max_players_per_team.or(preset.max_players_per_team),
        }
    }

    /// Hard constraints every lineup of the request must satisfy.
    pub fn lineup_constraints(&self) -> LineupConstraints {
        let template = self.roster_template();
        let mut constraints = LineupConstraints::new(self.salary_floor, template.salary_cap)
            .with_max_players_per_team(template.max_players_per_team)
            .with_max_repeating_players(self.max_repeating_players);
        constraints.stacking_rules = self.stacking_rules.clone();
        constraints
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// A request file: options under `[request]` plus `[[players]]` records.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestDocument {
    #[serde(default)]
    pub request: RequestConfig,
    pub players: Vec<Player>,
}

impl RequestDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let document: Self = toml::from_str(s)?;
        document.request.validate()?;
        Ok(document)
    }
}
