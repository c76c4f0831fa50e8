//! Match rules that vary between matches.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed, Fixed};

/// Board size and starting economy.
///
/// # Example RON
///
/// ```ron
/// RulesConfig(width: 40, height: 30, starting_resources: 150)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Board width in cells.
    pub width: i32,
    /// Board height in cells.
    pub height: i32,
    /// Resources each player starts with, in whole units.
    pub starting_resources: u32,
    /// Amount of the pile placed under each mothership, in whole units.
    pub starting_pile: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            starting_resources: 100,
            starting_pile: 200,
        }
    }
}

impl RulesConfig {
    /// Parse rules from RON text; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed text and
    /// [`GameError::InvalidState`] for a non-positive board dimension.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let rules: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        if rules.width <= 0 || rules.height <= 0 {
            return Err(GameError::InvalidState(format!(
                "board must be at least 1x1, got {}x{}",
                rules.width, rules.height
            )));
        }
        Ok(rules)
    }

    /// Starting stockpile as a fixed-point amount.
    #[must_use]
    pub fn starting_resources(&self) -> Fixed {
        fixed(i32::try_from(self.starting_resources).unwrap_or(i32::MAX))
    }

    /// Starting pile size as a fixed-point amount.
    #[must_use]
    pub fn starting_pile(&self) -> Fixed {
        fixed(i32::try_from(self.starting_pile).unwrap_or(i32::MAX))
    }
}
