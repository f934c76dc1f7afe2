// Game configuration, loadable from JSON

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::physics::DEFAULT_GRAVITY;

/// Configuration loading/validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happens to overhangs that have fallen far enough
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverhangPolicy {
    /// Remove the record and release its body
    #[default]
    Despawn,
    /// Release the body but keep the record as static decoration
    Freeze,
}

/// How attract mode reacts when the autopilot misses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttractMissPolicy {
    /// Tear down the tower and reseed it
    #[default]
    Restart,
    /// Drop the missed layer and keep stacking on what is left
    Continue,
}

/// What the autopilot's precision offset is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotAnchor {
    /// World zero on the sliding axis
    #[default]
    Origin,
    /// Center of the layer underneath
    PreviousLayer,
}

/// Tunables for one game session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width and depth of the foundation
    pub box_size: f32,
    /// Height of every layer
    pub box_height: f32,
    /// Slide speed of the moving layer (units/second)
    pub layer_speed: f32,
    /// New layers start this far back on their axis
    pub spawn_offset: f32,
    /// Sliding past this coordinate counts as a miss
    pub runaway_bound: f32,
    /// Downward acceleration for falling debris
    pub gravity: f32,
    /// Mass of an overhang with the full foundation footprint
    pub overhang_mass: f32,
    pub overhang_policy: OverhangPolicy,
    /// Overhangs are despawned below `-despawn_depth * box_height`
    pub despawn_depth: f32,
    /// Overhangs are frozen below `-rest_depth * box_height` (freeze policy)
    pub rest_depth: f32,
    /// Seconds an overhang may stay simulated before being retired
    pub overhang_max_age: f32,
    /// Autopilot precision is rolled in `[-robot_max_error, robot_max_error]`
    pub robot_max_error: f32,
    pub autopilot_anchor: AutopilotAnchor,
    pub attract_miss: AttractMissPolicy,
    /// Camera target sits this far above the settled stack
    pub camera_offset: f32,
    /// Seed for the autopilot RNG
    pub seed: u64,
    /// Where the binary keeps the best score
    pub best_score_file: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            box_size: 3.0,
            box_height: 1.0,
            layer_speed: 8.0,
            spawn_offset: 10.0,
            runaway_bound: 10.0,
            gravity: DEFAULT_GRAVITY,
            overhang_mass: 5.0,
            overhang_policy: OverhangPolicy::Despawn,
            despawn_depth: 20.0,
            rest_depth: 5.0,
            overhang_max_age: 8.0,
            robot_max_error: 0.5,
            autopilot_anchor: AutopilotAnchor::Origin,
            attract_miss: AttractMissPolicy::Restart,
            camera_offset: 4.0,
            seed: 0x5EED,
            best_score_file: PathBuf::from("best_score.json"),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the simulation can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("box_size", self.box_size),
            ("box_height", self.box_height),
            ("layer_speed", self.layer_speed),
            ("spawn_offset", self.spawn_offset),
            ("runaway_bound", self.runaway_bound),
            ("gravity", self.gravity),
            ("overhang_mass", self.overhang_mass),
            ("despawn_depth", self.despawn_depth),
            ("rest_depth", self.rest_depth),
            ("overhang_max_age", self.overhang_max_age),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }

        if !(self.robot_max_error.is_finite() && self.robot_max_error >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "robot_max_error",
                reason: format!("must not be negative, got {}", self.robot_max_error),
            });
        }

        if self.runaway_bound < self.spawn_offset {
            return Err(ConfigError::Invalid {
                field: "runaway_bound",
                reason: format!(
                    "{} would flag freshly spawned layers at -{}",
                    self.runaway_bound, self.spawn_offset
                ),
            });
        }

        Ok(())
    }

    /// Height below which despawn-policy overhangs are removed
    pub fn despawn_y(&self) -> f32 {
        -self.despawn_depth * self.box_height
    }

    /// Height below which freeze-policy overhangs stop simulating
    pub fn rest_y(&self) -> f32 {
        -self.rest_depth * self.box_height
    }
}
