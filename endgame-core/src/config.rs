//! Generator configuration loaded from TOML.
//!
//! ```toml
//! [target]
//! item_level = 325
//! quality = 4
//! difficulty = 3
//! phase = 1
//! seed = 42
//!
//! [reference]
//! min_level = 0
//! max_level = 0
//!
//! [raid]
//! fire_resistance = true
//! entries = [17063, 16802]
//! ```

use crate::error::{EndgameError, Result};
use crate::models::LevelBand;
use crate::stats::difficulty_start_level;
use serde::Deserialize;
use std::path::Path;

/// What generated items are scaled to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    pub item_level: i32,
    pub quality: i32,
    pub difficulty: i32,
    pub phase: i32,
    pub seed: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            item_level: 325,
            quality: 4,
            difficulty: 3,
            phase: 1,
            seed: 42,
        }
    }
}

/// Level window for reference item lookups. 0 leaves a bound open.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    pub min_level: i32,
    pub max_level: i32,
}

impl ReferenceConfig {
    pub fn band(&self) -> LevelBand {
        LevelBand::new(self.min_level, self.max_level)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RaidConfig {
    pub fire_resistance: bool,
    pub entries: Vec<i32>,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            fire_resistance: true,
            entries: Vec::new(),
        }
    }
}

/// Complete generator configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub target: TargetConfig,
    pub reference: ReferenceConfig,
    pub raid: RaidConfig,
}

impl GeneratorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EndgameError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read generator config from {:?}: {}", path, e),
            ))
        })?;

        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            EndgameError::Parse(format!("Failed to parse generator config TOML: {}", e))
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if difficulty_start_level(self.target.difficulty).is_none() {
            return Err(EndgameError::Config(format!(
                "difficulty must be 3, 4 or 5, got {}",
                self.target.difficulty
            )));
        }
        if !(0..=5).contains(&self.target.quality) {
            return Err(EndgameError::Config(format!(
                "quality must be between 0 and 5, got {}",
                self.target.quality
            )));
        }
        if self.target.item_level <= 0 {
            return Err(EndgameError::Config(format!(
                "item level must be positive, got {}",
                self.target.item_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_raid_defaults() {
        let config = GeneratorConfig::from_str("").unwrap();
        assert_eq!(config.target.item_level, 325);
        assert_eq!(config.target.quality, 4);
        assert_eq!(config.target.difficulty, 3);
        assert_eq!(config.target.seed, 42);
        assert!(config.raid.fire_resistance);
        assert_eq!(config.reference.band(), LevelBand::default());
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            [target]
            item_level = 305
            difficulty = 4

            [raid]
            entries = [1, 2, 3]
        "#;
        let config = GeneratorConfig::from_str(toml).unwrap();
        assert_eq!(config.target.item_level, 305);
        assert_eq!(config.target.quality, 4);
        assert_eq!(config.raid.entries, vec![1, 2, 3]);
        assert!(config.raid.fire_resistance);
    }

    #[test]
    fn test_bad_difficulty_is_config_error() {
        let result = GeneratorConfig::from_str("[target]\ndifficulty = 7\n");
        assert!(matches!(result, Err(EndgameError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = GeneratorConfig::from_str("[target\n");
        assert!(matches!(result, Err(EndgameError::Parse(_))));
    }
}
