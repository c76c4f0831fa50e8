//! Players: blueprint catalog, resource stockpile and research.

use serde::{Deserialize, Serialize};

use crate::data::UnitBlueprint;
use crate::ids::{PlayerNumber, TeamNumber};
use crate::math::{fixed_serde, research_fraction, Fixed};

/// A participant in the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Player number, unique within the match.
    pub number: PlayerNumber,
    /// Team number.
    pub team: TeamNumber,
    /// Display name.
    pub name: String,
    /// Blueprints this player may produce.
    pub blueprints: Vec<UnitBlueprint>,
    /// Stockpiled resources.
    #[serde(with = "fixed_serde")]
    pub resources: Fixed,
    /// Accumulated research points.
    pub research: u32,
}

impl Player {
    /// Create a player with no resources or research.
    #[must_use]
    pub fn new(
        number: PlayerNumber,
        team: TeamNumber,
        name: impl Into<String>,
        blueprints: Vec<UnitBlueprint>,
    ) -> Self {
        Self {
            number,
            team,
            name: name.into(),
            blueprints,
            resources: Fixed::ZERO,
            research: 0,
        }
    }

    /// `1 - (199/200)^research`.
    #[must_use]
    pub fn research_fraction(&self) -> Fixed {
        research_fraction(self.research)
    }

    /// Whether research has reached the blueprint's threshold.
    #[must_use]
    pub fn is_unlocked(&self, blueprint: &UnitBlueprint) -> bool {
        self.research_fraction() >= blueprint.research_threshold()
    }

    /// Find a blueprint by name.
    #[must_use]
    pub fn blueprint(&self, name: &str) -> Option<&UnitBlueprint> {
        self.blueprints.iter().find(|b| b.name == name)
    }

    /// The blueprint this player starts the match with.
    #[must_use]
    pub fn mothership(&self) -> Option<&UnitBlueprint> {
        self.blueprints.iter().find(|b| b.mothership)
    }

    /// Check if the stockpile covers `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: Fixed) -> bool {
        self.resources >= cost
    }

    /// Deduct `cost` if affordable; returns whether it was deducted.
    pub fn spend(&mut self, cost: Fixed) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.resources -= cost;
        true
    }

    /// Add research points.
    pub fn add_research(&mut self, amount: u32) {
        self.research = self.research.saturating_add(amount);
    }
}
