//! Game configuration.
//!
//! A `GameConfig` is built once per session and handed to the board engine and
//! the command history at construction. It can be deserialized from JSON; any
//! field left out falls back to its default.

use crate::error::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How long before the move settles the merges settle.
pub const MERGE_LEAD: Duration = Duration::from_millis(10);

/// Colours used to draw one tile tier. Presentation only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileStyle {
    pub background: String,
    pub text: String,
}

impl TileStyle {
    pub fn new(background: &str, text: &str) -> Self {
        TileStyle {
            background: background.to_string(),
            text: text.to_string(),
        }
    }

    /// Background colour as an RGB triple, if it is a valid `#rrggbb` string.
    pub fn background_rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.background)
    }

    /// Text colour as an RGB triple, if it is a valid `#rrggbb` string.
    pub fn text_rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.text)
    }
}

fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn default_tiers() -> Vec<TileStyle> {
    const DARK_TEXT: &str = "#776e65";
    const LIGHT_TEXT: &str = "#f9f6f2";
    vec![
        TileStyle::new("#eee4da", DARK_TEXT),  // 2
        TileStyle::new("#ede0c8", DARK_TEXT),  // 4
        TileStyle::new("#f2b179", LIGHT_TEXT), // 8
        TileStyle::new("#f59563", LIGHT_TEXT), // 16
        TileStyle::new("#f67c5f", LIGHT_TEXT), // 32
        TileStyle::new("#f65e3b", LIGHT_TEXT), // 64
        TileStyle::new("#edcf72", LIGHT_TEXT), // 128
        TileStyle::new("#edcc61", LIGHT_TEXT), // 256
        TileStyle::new("#edc850", LIGHT_TEXT), // 512
        TileStyle::new("#edc53f", LIGHT_TEXT), // 1024
        TileStyle::new("#edc22e", LIGHT_TEXT), // 2048
    ]
}

fn default_obstacle_style() -> TileStyle {
    TileStyle::new("#3c3a32", "#f9f6f2")
}

/// Recognized game options.
///
/// # Examples
/// ```
/// use merge_puzzle::config::GameConfig;
///
/// let config = GameConfig::from_json_str(r#"{ "width": 5, "undo_capacity": 4 }"#).unwrap();
/// assert_eq!(config.width, 5);
/// assert_eq!(config.height, 4);
/// assert_eq!(config.undo_capacity, 4);
/// assert_eq!(config.max_tier(), 10);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    /// Number of moves that can be undone (and redone).
    pub undo_capacity: usize,
    /// Duration of the move animation, in seconds.
    pub animation_duration: f64,
    /// Chance that an existing obstacle moves to a new cell on each spawn.
    pub obstacle_relocation_chance: f64,
    pub tiers: Vec<TileStyle>,
    pub obstacle_style: TileStyle,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: 4,
            height: 4,
            undo_capacity: 3,
            animation_duration: 0.1,
            obstacle_relocation_chance: 0.1,
            tiers: default_tiers(),
            obstacle_style: default_obstacle_style(),
        }
    }
}

impl GameConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(s)?;
        config.validate()
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks that the options describe a playable game.
    pub fn validate(self) -> Result<Self> {
        // A single row or column can jam behind the obstacle while not full.
        if self.width < 2 || self.height < 2 {
            return Err(GameError::InvalidConfig(format!(
                "grid must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        if self.undo_capacity == 0 {
            return Err(GameError::InvalidConfig(
                "undo capacity must be at least 1".to_string(),
            ));
        }
        if Duration::try_from_secs_f64(self.animation_duration).is_err() {
            return Err(GameError::InvalidConfig(format!(
                "animation duration must be a non-negative number of seconds, got {}",
                self.animation_duration
            )));
        }
        if !(0.0..=1.0).contains(&self.obstacle_relocation_chance) {
            return Err(GameError::InvalidConfig(format!(
                "obstacle relocation chance must be within [0, 1], got {}",
                self.obstacle_relocation_chance
            )));
        }
        if self.tiers.is_empty() {
            return Err(GameError::InvalidConfig(
                "tier table must not be empty".to_string(),
            ));
        }
        for (i, style) in self
            .tiers
            .iter()
            .chain(std::iter::once(&self.obstacle_style))
            .enumerate()
        {
            if style.background_rgb().is_none() || style.text_rgb().is_none() {
                return Err(GameError::InvalidConfig(format!(
                    "style {} has a malformed colour, expected #rrggbb",
                    i
                )));
            }
        }
        Ok(self)
    }

    /// Number of cells on the grid.
    pub fn size(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Highest tier index a tile can reach.
    pub fn max_tier(&self) -> usize {
        self.tiers.len().saturating_sub(1)
    }

    /// Delay after which a move settles.
    pub fn move_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.animation_duration).unwrap_or(Duration::ZERO)
    }

    /// Delay after which a merge settles. Always precedes the move settling.
    pub fn merge_delay(&self) -> Duration {
        self.move_delay().saturating_sub(MERGE_LEAD)
    }

    /// Style for a tier index, clamped to the table.
    pub fn tier_style(&self, tier: usize) -> &TileStyle {
        &self.tiers[tier.min(self.max_tier())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default().validate().unwrap();
        assert_eq!(config.size(), 16);
        assert_eq!(config.undo_capacity, 3);
        assert_eq!(config.move_delay(), Duration::from_millis(100));
        assert_eq!(config.merge_delay(), Duration::from_millis(90));
        assert_eq!(config.max_tier(), 10);
    }

    #[test]
    fn test_merge_delay_saturates() {
        let config = GameConfig {
            animation_duration: 0.0,
            ..GameConfig::default()
        };
        assert_eq!(config.merge_delay(), Duration::ZERO);
        assert!(config.merge_delay() <= config.move_delay());
    }

    #[test]
    fn test_rejects_single_line_grid() {
        for (width, height) in [(1, 1), (1, 4), (4, 1), (0, 4)] {
            let config = GameConfig {
                width,
                height,
                ..GameConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("at least 2x2"), "{}x{}", width, height);
        }

        let smallest = GameConfig {
            width: 2,
            height: 2,
            ..GameConfig::default()
        };
        assert!(smallest.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = GameConfig {
            undo_capacity: 0,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_chance_and_duration() {
        let config = GameConfig {
            obstacle_relocation_chance: 1.5,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            animation_duration: f64::NAN,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_colour() {
        let mut config = GameConfig::default();
        config.tiers[3].background = "orange".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("style 3"));
    }

    #[test]
    fn test_json_partial_override() {
        let config =
            GameConfig::from_json_str(r#"{"height": 6, "animation_duration": 0.25}"#).unwrap();
        assert_eq!(config.width, 4);
        assert_eq!(config.height, 6);
        assert_eq!(config.move_delay(), Duration::from_millis(250));
        assert_eq!(config.tiers.len(), 11);
    }

    #[test]
    fn test_json_invalid_document() {
        assert!(matches!(
            GameConfig::from_json_str("{ width: }"),
            Err(GameError::Json(_))
        ));
    }

    #[test]
    fn test_tier_style_clamps() {
        let config = GameConfig::default();
        assert_eq!(config.tier_style(0).background, "#eee4da");
        assert_eq!(config.tier_style(99), config.tier_style(10));
        assert_eq!(config.tier_style(0).text_rgb(), Some((0x77, 0x6e, 0x65)));
    }
}
