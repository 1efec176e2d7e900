//! Benchmark presets of the reaching task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{BackendConfig, EnvironmentConfig, StartPosition, TaskConfig};
use crate::fence::FenceBounds;

/// Target sphere radius of the easy task, meters.
pub const BIG_TARGET: f64 = 0.05;
pub const SMALL_TARGET: f64 = 0.015;
pub const CLOSE_TARGET_DISTANCE: f64 = 0.2;
pub const FAR_TARGET_DISTANCE: f64 = 1.0;

/// The real arm publishes joint state at roughly 50 Hz.
pub const CONTROL_TIMESTEP: f64 = 0.02;
pub const DEFAULT_TIME_LIMIT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Big, close target; home start.
    Easy,
    /// Small, far target; home start.
    Medium,
    /// Small, far target; random start.
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn task_config(self, random_seed: Option<u64>) -> TaskConfig {
        let (target_size, max_target_distance, start_position) = match self {
            Difficulty::Easy => (BIG_TARGET, CLOSE_TARGET_DISTANCE, StartPosition::Home),
            Difficulty::Medium => (SMALL_TARGET, FAR_TARGET_DISTANCE, StartPosition::Home),
            Difficulty::Hard => (SMALL_TARGET, FAR_TARGET_DISTANCE, StartPosition::Random),
        };
        TaskConfig {
            target_size,
            max_target_distance,
            start_position,
            random_seed,
            ..TaskConfig::default()
        }
    }

    pub fn environment_config(
        self,
        backend: BackendConfig,
        fence: FenceBounds,
        random_seed: Option<u64>,
    ) -> EnvironmentConfig {
        EnvironmentConfig {
            backend,
            task: self.task_config(random_seed),
            fence,
            time_limit: DEFAULT_TIME_LIMIT,
            control_timestep: CONTROL_TIMESTEP,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown difficulty '{s}', expected easy, medium or hard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let easy = Difficulty::Easy.task_config(None);
        assert_eq!(easy.target_size, 0.05);
        assert_eq!(easy.max_target_distance, 0.2);
        assert_eq!(easy.start_position, StartPosition::Home);

        let medium = Difficulty::Medium.task_config(Some(1));
        assert_eq!(medium.target_size, 0.015);
        assert_eq!(medium.max_target_distance, 1.0);
        assert_eq!(medium.random_seed, Some(1));

        let hard = Difficulty::Hard.task_config(None);
        assert_eq!(hard.start_position, StartPosition::Random);
    }

    #[test]
    fn environment_presets_validate() {
        for d in Difficulty::ALL {
            let config = d.environment_config(BackendConfig::default(), FenceBounds::default(), None);
            assert!(config.validate().is_ok(), "{d}");
            assert_eq!(config.control_timestep, 0.02);
        }
    }

    #[test]
    fn parses_names() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
