//! Team catalog: every blueprint a team may field.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::blueprint::UnitBlueprint;
use crate::error::{GameError, Result};

/// Complete team definition.
///
/// # Example RON
///
/// ```ron
/// Catalog(
///     team: "red",
///     blueprints: [
///         UnitBlueprint(name: "mothership", size: 3, mothership: true, ...),
///         UnitBlueprint(name: "scout", size: 1, ...),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Team name.
    pub team: String,
    /// Blueprints in catalog order.
    pub blueprints: Vec<UnitBlueprint>,
}

impl Catalog {
    /// Parse and validate a catalog from RON text.
    ///
    /// `source_name` labels the text in error messages (usually a path).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a catalog
    /// and [`GameError::InvalidCatalog`] if it breaks a catalog rule.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidCatalog {
                name: catalog.team,
                errors,
            });
        }

        tracing::debug!(
            team = %catalog.team,
            blueprints = catalog.blueprints.len(),
            "Loaded catalog from {source_name}"
        );
        Ok(catalog)
    }

    /// Find a blueprint by name.
    #[must_use]
    pub fn blueprint(&self, name: &str) -> Option<&UnitBlueprint> {
        self.blueprints.iter().find(|b| b.name == name)
    }

    /// The first blueprint flagged as the mothership.
    #[must_use]
    pub fn mothership(&self) -> Option<&UnitBlueprint> {
        self.blueprints.iter().find(|b| b.mothership)
    }

    /// Blueprints other than the mothership, in catalog order.
    pub fn regular_units(&self) -> impl Iterator<Item = &UnitBlueprint> {
        let mothership = self.mothership().map(|b| b.name.as_str());
        self.blueprints
            .iter()
            .filter(move |b| Some(b.name.as_str()) != mothership)
    }

    /// Check catalog rules, returning every violation found.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut names = BTreeSet::new();

        for blueprint in &self.blueprints {
            let name = &blueprint.name;
            if name.is_empty() {
                errors.push("Blueprint with empty name".to_string());
            }
            if !names.insert(name.as_str()) {
                errors.push(format!("Duplicate blueprint '{name}'"));
            }
            if blueprint.size <= 0 {
                errors.push(format!("Blueprint '{name}' has non-positive size {}", blueprint.size));
            }
            if blueprint.parts.is_empty() {
                errors.push(format!("Blueprint '{name}' has no parts"));
            }
            if blueprint.production_cost == 0 {
                errors.push(format!("Blueprint '{name}' has zero production cost"));
            }
            if blueprint.research_threshold_percent > 100 {
                errors.push(format!(
                    "Blueprint '{name}' needs {}% research, which is unreachable",
                    blueprint.research_threshold_percent
                ));
            }
            for (index, part) in blueprint.parts.iter().enumerate() {
                if part.size <= 0 {
                    errors.push(format!("Blueprint '{name}' part {index} has non-positive size"));
                }
                if part.quality_percent == 0 {
                    errors.push(format!("Blueprint '{name}' part {index} has zero quality"));
                }
            }
        }

        match self.blueprints.iter().filter(|b| b.mothership).count() {
            0 => errors.push(format!("Team '{}' has no mothership", self.team)),
            1 => {}
            n => errors.push(format!("Team '{}' has {n} motherships", self.team)),
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        Catalog(
            team: "red",
            blueprints: [
                UnitBlueprint(
                    name: "mothership",
                    size: 3,
                    production_cost: 100,
                    mothership: true,
                    parts: [
                        PartSpec(kind: Producer, size: 3),
                        PartSpec(kind: EnergyCore, size: 3),
                        PartSpec(kind: Collector, size: 2),
                    ],
                ),
                UnitBlueprint(
                    name: "scout",
                    size: 1,
                    production_cost: 10,
                    research_threshold_percent: 5,
                    parts: [
                        PartSpec(kind: Locomotor(Knight), size: 1),
                        PartSpec(kind: EnergyCore, size: 1, quality_percent: 120),
                    ],
                ),
            ],
        )
    "#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_ron_str("red.ron", CATALOG).unwrap();
        assert_eq!(catalog.team, "red");
        assert_eq!(catalog.blueprints.len(), 2);
        assert_eq!(catalog.mothership().unwrap().name, "mothership");
        assert_eq!(catalog.blueprint("scout").unwrap().size, 1);
        let regular: Vec<_> = catalog.regular_units().map(|b| b.name.as_str()).collect();
        assert_eq!(regular, vec!["scout"]);
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = Catalog::from_ron_str("broken.ron", "Catalog(team: 3)").unwrap_err();
        match err {
            GameError::DataParseError { source_name, .. } => assert_eq!(source_name, "broken.ron"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut catalog = Catalog::from_ron_str("red.ron", CATALOG).unwrap();
        catalog.blueprints[1].size = 0;
        catalog.blueprints[1].parts[0].quality_percent = 0;
        catalog.blueprints[0].mothership = false;
        let errors = catalog.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut catalog = Catalog::from_ron_str("red.ron", CATALOG).unwrap();
        let copy = catalog.blueprints[1].clone();
        catalog.blueprints.push(copy);
        assert!(catalog.validate().iter().any(|e| e.contains("Duplicate")));
    }
}
