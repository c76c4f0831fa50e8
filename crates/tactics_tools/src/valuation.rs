//! Team valuation.
//!
//! Scores a catalog so teams can be compared before a match. Valuation is
//! tooling only and never feeds resolution, so it works in `f64`.

use serde::Serialize;

use tactics_core::data::{Catalog, PartSpec, PartSpecKind, UnitBlueprint};

use crate::error::{Result, ToolsError};

/// Cost of one part inside a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartValue {
    /// Part kind, with its shape for movers and weapons.
    pub kind: String,
    /// Part size.
    pub size: i32,
    /// Quality multiplier.
    pub quality: f64,
    /// Contribution to the base cost.
    pub cost: f64,
}

/// Cost breakdown of one blueprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitValue {
    /// Blueprint name.
    pub name: String,
    /// `10 · size^1.5`.
    pub size_cost: f64,
    /// Per-part costs.
    pub parts: Vec<PartValue>,
    /// Size cost plus part costs.
    pub base_cost: f64,
    /// Cost after the mothership or research and production adjustments.
    pub adjusted_cost: f64,
}

/// Valuation of a whole team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamValuation {
    /// Team name.
    pub team: String,
    /// The mothership, valued on its own.
    pub mothership: UnitValue,
    /// Every other blueprint.
    pub units: Vec<UnitValue>,
    /// Sum of the other blueprints' adjusted costs.
    pub others_sum: f64,
    /// Final score.
    pub team_value: f64,
}

fn quality(spec: &PartSpec) -> f64 {
    f64::from(spec.quality_percent) / 100.0
}

fn kind_label(kind: PartSpecKind) -> String {
    match kind {
        PartSpecKind::Locomotor(shape) => format!("Locomotor ({shape:?})"),
        PartSpecKind::Armament(shape) => format!("Armament ({shape:?})"),
        other => format!("{other:?}"),
    }
}

/// Parts bigger than their unit cost extra; quality scales everything.
#[must_use]
pub fn part_cost(unit_size: i32, spec: &PartSpec) -> f64 {
    let oversize = f64::from((spec.size - unit_size).max(0));
    (10.0 + oversize * 4.0) * (quality(spec) + 0.5)
}

fn breakdown(blueprint: &UnitBlueprint) -> UnitValue {
    let size_cost = 10.0 * f64::from(blueprint.size).powf(1.5);
    let parts: Vec<PartValue> = blueprint
        .parts
        .iter()
        .map(|spec| PartValue {
            kind: kind_label(spec.kind),
            size: spec.size,
            quality: quality(spec),
            cost: part_cost(blueprint.size, spec),
        })
        .collect();
    let base_cost = size_cost + parts.iter().map(|p| p.cost).sum::<f64>();
    UnitValue {
        name: blueprint.name.clone(),
        size_cost,
        parts,
        base_cost,
        adjusted_cost: base_cost,
    }
}

/// Size cost plus every part's cost.
#[must_use]
pub fn base_cost(blueprint: &UnitBlueprint) -> f64 {
    breakdown(blueprint).base_cost
}

/// Motherships are pushed away from a base of 100.
#[must_use]
pub fn mothership_cost(base: f64) -> f64 {
    base + (base - 100.0) * 0.5
}

/// Regular units are discounted by their research threshold and charged
/// for how much material they pack per point of production cost.
#[must_use]
pub fn unit_cost(blueprint: &UnitBlueprint, base: f64) -> f64 {
    let threshold = f64::from(blueprint.research_threshold_percent) / 100.0;
    let expected_threshold = 1.0 - 0.95_f64.powf(base);
    let material = f64::from(blueprint.size + blueprint.part_size_sum());
    base * (expected_threshold / (threshold + 1.0)) + material / f64::from(blueprint.production_cost) * base
}

/// Value a catalog.
///
/// # Errors
///
/// Returns [`ToolsError::NoMothership`] if no blueprint is flagged as the
/// mothership.
pub fn valuate(catalog: &Catalog) -> Result<TeamValuation> {
    let mothership = catalog.mothership().ok_or_else(|| ToolsError::NoMothership {
        team: catalog.team.clone(),
    })?;
    let mut mothership_value = breakdown(mothership);
    mothership_value.adjusted_cost = mothership_cost(mothership_value.base_cost);

    let units: Vec<UnitValue> = catalog
        .regular_units()
        .map(|blueprint| {
            let mut value = breakdown(blueprint);
            value.adjusted_cost = unit_cost(blueprint, value.base_cost);
            value
        })
        .collect();

    let others_sum: f64 = units.iter().map(|u| u.adjusted_cost).sum();
    let team_value = others_sum * 11.0 / (6.0 + units.len() as f64);
    tracing::debug!(team = %catalog.team, team_value, "Team valuated");

    Ok(TeamValuation {
        team: catalog.team.clone(),
        mothership: mothership_value,
        units,
        others_sum,
        team_value,
    })
}

impl UnitValue {
    fn write_text(&self, out: &mut String, label: &str) {
        out.push_str(&format!("Valuating {} ({label})...\n", self.name));
        out.push_str(&format!("  Size cost: {:.2}\n", self.size_cost));
        for part in &self.parts {
            out.push_str(&format!(
                "    {} Size: {} Quality: {:.2} Cost: {:.2}\n",
                part.kind, part.size, part.quality, part.cost
            ));
        }
        out.push_str(&format!("  Base cost: {:.2}\n", self.base_cost));
        out.push_str(&format!("  Adjusted cost: {:.2}\n", self.adjusted_cost));
    }
}

impl TeamValuation {
    /// Human-readable breakdown.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("Team '{}'\n", self.team);
        self.mothership.write_text(&mut out, "mothership");
        for unit in &self.units {
            unit.write_text(&mut out, "regular");
        }
        out.push_str(&format!("Sum of regular units: {:.2}\n", self.others_sum));
        out.push_str(&format!("Team value: {:.2}\n", self.team_value));
        out
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ToolsError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
