//! Effect-text classification
//!
//! Ability and status effects arrive as free text. They are classified once,
//! when the data is loaded, into flag sets that the analyzers test directly.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Control effects an ability or status can impose
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ControlFlags: u16 {
        const FROZEN = 1 << 0;
        /// Only ever set together with FROZEN
        const CRYOSTASIS = 1 << 1;
        const DIZZY = 1 << 2;
        const IMMOBILIZE = 1 << 3;
        const TRAP = 1 << 4;
        const DELAYED = 1 << 5;
        const HINDERED = 1 << 6;
        const MATERIALIZATION_SICKNESS = 1 << 7;
        const NO_ACTION = 1 << 8;
    }
}

bitflags! {
    /// Non-control keywords the tactical analyzers care about
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EffectKeywords: u32 {
        /// push, pull, teleport, swap
        const FORCED_MOVEMENT = 1 << 0;
        /// push, pull, swap (teleport is not a setup for allies)
        const REPOSITION = 1 << 1;
        /// buff, heal, shield, protect
        const SUPPORT = 1 << 2;
        const BUFF = 1 << 3;
        /// vulnerable, weakness
        const AMPLIFY = 1 << 4;
        /// trap, immobilize, pull, push
        const SETUP = 1 << 5;
        /// execute, bonus
        const FINISHER = 1 << 6;
        const CHAIN = 1 << 7;
        /// trap, wall, field, zone
        const ZONE = 1 << 8;
        /// shield, dodge
        const DEFENSIVE = 1 << 9;
        /// immobilize, root, trap
        const PINNING = 1 << 10;
        const COUNTER = 1 << 11;
        /// drain, siphon
        const DRAIN = 1 << 12;
        /// slowed, dizzy
        const SLOWED = 1 << 13;
        const CONTROL_WORD = 1 << 14;
        /// trap, buff
        const COMBO_SETUP = 1 << 15;
    }
}

impl ControlFlags {
    /// Names of the set flags in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Result of classifying one or more effect descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectClass {
    pub control: ControlFlags,
    pub keywords: EffectKeywords,
}

impl EffectClass {
    pub fn union(self, other: EffectClass) -> EffectClass {
        EffectClass {
            control: self.control | other.control,
            keywords: self.keywords | other.keywords,
        }
    }
}

/// Classify a list of effect descriptions
pub fn classify_effects<S: AsRef<str>>(effects: &[S]) -> EffectClass {
    let class = effects
        .iter()
        .map(|e| classify_raw(e.as_ref()))
        .fold(EffectClass::default(), EffectClass::union);
    EffectClass {
        control: normalize_control(class.control),
        ..class
    }
}

/// Classify one effect description by keyword
///
/// Matching is substring-based over the lower-cased text. Text matching no
/// keyword yields empty flag sets.
pub fn classify_text(text: &str) -> EffectClass {
    let class = classify_raw(text);
    EffectClass {
        control: normalize_control(class.control),
        ..class
    }
}

fn classify_raw(text: &str) -> EffectClass {
    let s = text.to_lowercase();
    let has = |needle: &str| s.contains(needle);

    let mut control = ControlFlags::empty();
    if has("frozen") {
        control |= ControlFlags::FROZEN;
    }
    if has("immobilize") || has("root") || has("cannot move") {
        control |= ControlFlags::IMMOBILIZE;
    }
    if has("trap") {
        control |= ControlFlags::TRAP;
    }
    if has("dizzy") {
        control |= ControlFlags::DIZZY;
    }
    if has("delay") {
        control |= ControlFlags::DELAYED;
    }
    if has("hinder") {
        control |= ControlFlags::HINDERED;
    }
    if has("materializationsickness") || has("materialization sickness") {
        control |= ControlFlags::MATERIALIZATION_SICKNESS;
    }
    if has("noaction") || has("no action") {
        control |= ControlFlags::NO_ACTION;
    }
    if has("cryostasis") {
        control |= ControlFlags::CRYOSTASIS;
    }

    let mut keywords = EffectKeywords::empty();
    let push_pull = has("push") || has("pull");
    if push_pull || has("teleport") || has("swap") {
        keywords |= EffectKeywords::FORCED_MOVEMENT;
    }
    if push_pull || has("swap") {
        keywords |= EffectKeywords::REPOSITION;
    }
    if has("buff") || has("heal") || has("shield") || has("protect") {
        keywords |= EffectKeywords::SUPPORT;
    }
    if has("buff") {
        keywords |= EffectKeywords::BUFF;
    }
    if has("vulnerable") || has("weakness") {
        keywords |= EffectKeywords::AMPLIFY;
    }
    if has("trap") || has("immobilize") || push_pull {
        keywords |= EffectKeywords::SETUP;
    }
    if has("execute") || has("bonus") {
        keywords |= EffectKeywords::FINISHER;
    }
    if has("chain") {
        keywords |= EffectKeywords::CHAIN;
    }
    if has("trap") || has("wall") || has("field") || has("zone") {
        keywords |= EffectKeywords::ZONE;
    }
    if has("shield") || has("dodge") {
        keywords |= EffectKeywords::DEFENSIVE;
    }
    if has("immobilize") || has("root") || has("trap") {
        keywords |= EffectKeywords::PINNING;
    }
    if has("counter") {
        keywords |= EffectKeywords::COUNTER;
    }
    if has("drain") || has("siphon") {
        keywords |= EffectKeywords::DRAIN;
    }
    if has("slowed") || has("dizzy") {
        keywords |= EffectKeywords::SLOWED;
    }
    if has("control") {
        keywords |= EffectKeywords::CONTROL_WORD;
    }
    if has("trap") || has("buff") {
        keywords |= EffectKeywords::COMBO_SETUP;
    }

    EffectClass { control, keywords }
}

/// Enforce cryostasis-implies-frozen over a flag set from any source
pub fn normalize_control(flags: ControlFlags) -> ControlFlags {
    if flags.contains(ControlFlags::CRYOSTASIS) && !flags.contains(ControlFlags::FROZEN) {
        flags - ControlFlags::CRYOSTASIS
    } else {
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cryostasis_requires_frozen() {
        let alone = classify_effects(&["Cryostasis"]);
        assert!(alone.control.is_empty());

        let with_frozen = classify_effects(&["Frozen", "cryostasis"]);
        assert!(with_frozen.control.contains(ControlFlags::FROZEN | ControlFlags::CRYOSTASIS));
    }

    #[test]
    fn test_immobilize_synonyms() {
        for text in ["Immobilized for one turn", "Rooted", "Target cannot move"] {
            let class = classify_text(text);
            assert!(class.control.contains(ControlFlags::IMMOBILIZE), "{}", text);
        }
    }

    #[test]
    fn test_unclassified_text_is_empty() {
        let class = classify_text("Looks menacing");
        assert!(class.control.is_empty());
        assert!(class.keywords.is_empty());
    }

    #[test]
    fn test_trap_is_zone_setup_and_pinning() {
        let class = classify_text("Leaves a trap");
        assert!(class.control.contains(ControlFlags::TRAP));
        assert!(class
            .keywords
            .contains(EffectKeywords::ZONE | EffectKeywords::SETUP | EffectKeywords::PINNING));
    }

    #[test]
    fn test_teleport_forces_movement_but_is_not_reposition() {
        let class = classify_text("Teleport target");
        assert!(class.keywords.contains(EffectKeywords::FORCED_MOVEMENT));
        assert!(!class.keywords.contains(EffectKeywords::REPOSITION));
    }

    #[test]
    fn test_normalize_strips_orphan_cryostasis() {
        assert_eq!(normalize_control(ControlFlags::CRYOSTASIS), ControlFlags::empty());
        let both = ControlFlags::FROZEN | ControlFlags::CRYOSTASIS;
        assert_eq!(normalize_control(both), both);
    }

    #[test]
    fn test_flag_names() {
        let flags = ControlFlags::FROZEN | ControlFlags::TRAP;
        assert_eq!(flags.names(), vec!["FROZEN", "TRAP"]);
    }
}
