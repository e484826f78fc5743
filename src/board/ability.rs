//! Ability definitions
//!
//! Abilities are deserialized from roster data through [`AbilityData`]; the
//! conversion classifies effect text once so analysis never re-parses strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::effects::{classify_effects, ControlFlags, EffectClass, EffectKeywords};
use crate::board::hex::HexCoord;

/// Damage types and their baseline effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Pierce,
    Slash,
    Crush,
    Shock,
    Burn,
    Frost,
    Poison,
    Sonic,
    Mental,
    Pure,
}

impl DamageType {
    pub fn from_key(key: &str) -> Option<DamageType> {
        match key.to_ascii_lowercase().as_str() {
            "pierce" => Some(DamageType::Pierce),
            "slash" => Some(DamageType::Slash),
            "crush" => Some(DamageType::Crush),
            "shock" => Some(DamageType::Shock),
            "burn" => Some(DamageType::Burn),
            "frost" => Some(DamageType::Frost),
            "poison" => Some(DamageType::Poison),
            "sonic" => Some(DamageType::Sonic),
            "mental" => Some(DamageType::Mental),
            "pure" => Some(DamageType::Pure),
            _ => None,
        }
    }

    /// Effectiveness multiplier used when predicting damage value
    pub fn modifier(&self) -> f32 {
        match self {
            DamageType::Pierce => 1.2,
            DamageType::Slash => 1.1,
            DamageType::Crush => 1.3,
            DamageType::Shock => 1.15,
            DamageType::Burn => 1.25,
            DamageType::Frost => 1.1,
            DamageType::Poison => 1.2,
            DamageType::Sonic => 1.15,
            DamageType::Mental => 1.25,
            DamageType::Pure => 1.0,
        }
    }
}

/// A damage entry: a flat number or a formula such as `"12 × creature size"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DamageValue {
    Flat(f32),
    Formula(String),
}

impl DamageValue {
    /// Numeric contribution of this entry
    ///
    /// Formulas contribute their leading constant only; the multiplier is not
    /// resolved. Text without a leading number contributes 0.
    pub fn amount(&self) -> f32 {
        match self {
            DamageValue::Flat(v) if v.is_finite() => *v,
            DamageValue::Flat(_) => 0.0,
            DamageValue::Formula(text) => leading_number(text).unwrap_or(0.0),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, DamageValue::Flat(_))
    }
}

/// Parse the leading numeric token of a string
pub fn leading_number(text: &str) -> Option<f32> {
    let trimmed = text.trim_start();
    let mut seen_dot = false;
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| {
            let keep = match c {
                '0'..='9' => true,
                '-' => i == 0,
                '.' => !std::mem::replace(&mut seen_dot, true),
                _ => false,
            };
            !keep
        })
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Resource costs paid when the ability is used
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityCosts {
    pub energy: f32,
    pub plasma: f32,
}

/// Regular and upgraded reach of an ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRange {
    pub regular: u32,
    #[serde(default)]
    pub upgraded: Option<u32>,
}

impl Default for AbilityRange {
    fn default() -> Self {
        Self {
            regular: 1,
            upgraded: None,
        }
    }
}

/// Which side an ability may target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetTeam {
    #[default]
    Enemy,
    Ally,
    Any,
}

/// Raw ability record as it appears in roster files
#[derive(Debug, Clone, Deserialize)]
pub struct AbilityData {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub damages: BTreeMap<String, DamageValue>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub costs: AbilityCosts,
    #[serde(default)]
    pub range: Option<AbilityRange>,
    /// Target hexes relative to the caster
    #[serde(default)]
    pub pattern: Vec<HexCoord>,
    #[serde(default)]
    pub target_team: TargetTeam,
    #[serde(default)]
    pub upgraded: bool,
    #[serde(default)]
    pub used: bool,
}

/// A unit ability with its effect text already classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AbilityData")]
pub struct Ability {
    pub title: String,
    pub desc: String,
    pub damages: BTreeMap<String, DamageValue>,
    pub effects: Vec<String>,
    pub costs: AbilityCosts,
    pub range: Option<AbilityRange>,
    pub pattern: Vec<HexCoord>,
    pub target_team: TargetTeam,
    pub upgraded: bool,
    pub used: bool,
    class: EffectClass,
}

impl From<AbilityData> for Ability {
    fn from(data: AbilityData) -> Self {
        let class = classify_effects(&data.effects);
        Self {
            title: data.title,
            desc: data.desc,
            damages: data.damages,
            effects: data.effects,
            costs: data.costs,
            range: data.range,
            pattern: data.pattern,
            target_team: data.target_team,
            upgraded: data.upgraded,
            used: data.used,
            class,
        }
    }
}

impl Ability {
    /// Minimal single-target ability, mostly useful in tests
    pub fn new(title: impl Into<String>) -> Self {
        Self::from(AbilityData {
            title: title.into(),
            desc: String::new(),
            damages: BTreeMap::new(),
            effects: Vec::new(),
            costs: AbilityCosts::default(),
            range: None,
            pattern: Vec::new(),
            target_team: TargetTeam::default(),
            upgraded: false,
            used: false,
        })
    }

    pub fn with_damage(mut self, key: &str, value: DamageValue) -> Self {
        self.damages.insert(key.to_string(), value);
        self
    }

    pub fn with_effect(mut self, text: impl Into<String>) -> Self {
        self.effects.push(text.into());
        self.class = classify_effects(&self.effects);
        self
    }

    pub fn with_range(mut self, regular: u32, upgraded: Option<u32>) -> Self {
        self.range = Some(AbilityRange { regular, upgraded });
        self
    }

    pub fn with_pattern(mut self, pattern: Vec<HexCoord>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_costs(mut self, energy: f32, plasma: f32) -> Self {
        self.costs = AbilityCosts { energy, plasma };
        self
    }

    pub fn control(&self) -> ControlFlags {
        self.class.control
    }

    pub fn keywords(&self) -> EffectKeywords {
        self.class.keywords
    }

    pub fn has_damage(&self) -> bool {
        !self.damages.is_empty()
    }

    /// Sum of every damage entry (formulas contribute their leading constant)
    pub fn total_damage(&self) -> f32 {
        self.damages.values().map(DamageValue::amount).sum()
    }

    /// Sum of numeric damage entries weighted by damage-type effectiveness
    pub fn weighted_damage(&self) -> f32 {
        self.damages
            .iter()
            .filter(|(_, v)| v.is_flat())
            .map(|(k, v)| {
                let modifier = DamageType::from_key(k).map_or(1.0, |t| t.modifier());
                v.amount() * modifier
            })
            .sum()
    }

    /// Range in effect: upgraded reach when upgraded, never below 1
    pub fn effective_range(&self) -> u32 {
        let range = match self.range {
            Some(r) if self.upgraded => r.upgraded.unwrap_or(r.regular),
            Some(r) => r.regular,
            None => 1,
        };
        range.max(1)
    }

    /// Longest reach the ability can ever have
    pub fn max_range(&self) -> u32 {
        self.range
            .map(|r| r.upgraded.unwrap_or(r.regular).max(r.regular))
            .unwrap_or(0)
    }

    /// Number of hexes the ability hits; single-target when no pattern
    pub fn hexes_affected(&self) -> u32 {
        (self.pattern.len() as u32).max(1)
    }

    /// Absolute hexes covered by the pattern when cast from `origin`
    pub fn affected_hexes(&self, origin: HexCoord) -> Vec<HexCoord> {
        self.pattern.iter().map(|offset| origin + *offset).collect()
    }

    /// Melee abilities reach exactly one hex
    pub fn is_melee(&self) -> bool {
        self.range.map_or(false, |r| r.regular == 1)
    }
}
