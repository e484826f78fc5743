//! Board model: hexes, units, abilities and the read-only game view

pub mod ability;
pub mod battlefield;
pub mod effects;
pub mod hex;
pub mod unit;
pub mod view;

pub use ability::{Ability, AbilityCosts, AbilityData, AbilityRange, DamageType, DamageValue, TargetTeam};
pub use battlefield::{Battlefield, PlayerPool, Roster};
pub use effects::{classify_effects, classify_text, ControlFlags, EffectClass, EffectKeywords};
pub use hex::{HexCoord, HexDirection};
pub use unit::{Masteries, Unit, UnitData, UnitStats};
pub use view::GameView;
