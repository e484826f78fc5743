//! Sliding-window pattern detection over a profile's recent history

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::ability::AbilityThreatResult;
use crate::core::types::clamp01;

/// The recurring behaviors the detector knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "High Damage Output")]
    HighDamage,
    #[serde(rename = "Burst Damage")]
    BurstDamage,
    #[serde(rename = "Sustained Damage")]
    SustainedDamage,
    #[serde(rename = "Control Chain")]
    ControlChain,
    #[serde(rename = "Control + Damage Combo")]
    ControlDamageCombo,
    #[serde(rename = "Area Control")]
    AreaControl,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::HighDamage => "High Damage Output",
            PatternKind::BurstDamage => "Burst Damage",
            PatternKind::SustainedDamage => "Sustained Damage",
            PatternKind::ControlChain => "Control Chain",
            PatternKind::ControlDamageCombo => "Control + Damage Combo",
            PatternKind::AreaControl => "Area Control",
        }
    }

    pub fn counter_measures(&self) -> [&'static str; 3] {
        match self {
            PatternKind::HighDamage => [
                "Increase defense",
                "Keep distance",
                "Use damage reduction abilities",
            ],
            PatternKind::BurstDamage => [
                "Spread units",
                "Use defensive cooldowns early",
                "Counter-engage after burst",
            ],
            PatternKind::SustainedDamage => [
                "Focus healing",
                "Rotate defensive abilities",
                "Disengage when possible",
            ],
            PatternKind::ControlChain => [
                "Use crowd control breaks",
                "Maintain distance",
                "Counter with immunity abilities",
            ],
            PatternKind::ControlDamageCombo => [
                "Save defensive cooldowns",
                "Position defensively",
                "Counter-engage after combo",
            ],
            PatternKind::AreaControl => [
                "Split forces",
                "Use mobility abilities",
                "Control alternate zones",
            ],
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A detected recurring behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPattern {
    pub pattern: PatternKind,
    /// Share of the window showing the behavior, always above the floor
    pub frequency: f32,
    pub effectiveness: f32,
    pub counter_measures: Vec<String>,
}

impl ThreatPattern {
    fn new(pattern: PatternKind, count: usize, window: usize, effectiveness: f32) -> Self {
        Self {
            pattern,
            frequency: count as f32 / window as f32,
            effectiveness: clamp01(effectiveness),
            counter_measures: pattern.counter_measures().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Windowed detector for the six pattern kinds
#[derive(Debug, Clone, Copy)]
pub struct PatternDetector {
    /// Entries examined, newest last
    pub window: usize,
    /// Patterns at or below this frequency are dropped
    pub frequency_floor: f32,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self {
            window: 10,
            frequency_floor: 0.3,
        }
    }
}

fn damage(r: &&AbilityThreatResult) -> f32 {
    r.damage
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

fn variance(values: &[f32]) -> f32 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32
}

/// Entries sitting at least `min_len` deep into a run of matching entries
fn run_count<F: Fn(&AbilityThreatResult) -> bool>(window: &[&AbilityThreatResult], min_len: usize, pred: F) -> usize {
    let mut run = 0;
    let mut count = 0;
    for r in window {
        if pred(r) {
            run += 1;
            if run >= min_len {
                count += 1;
            }
        } else {
            run = 0;
        }
    }
    count
}

impl PatternDetector {
    pub fn new(window: usize, frequency_floor: f32) -> Self {
        Self {
            window: window.max(1),
            frequency_floor,
        }
    }

    /// Patterns found in the newest `window` entries of `history`
    pub fn detect(&self, history: &[&AbilityThreatResult]) -> Vec<ThreatPattern> {
        let start = history.len().saturating_sub(self.window);
        let window = &history[start..];
        if window.is_empty() {
            return Vec::new();
        }
        let n = window.len();
        let damages: Vec<f32> = window.iter().map(damage).collect();
        let mut found = Vec::new();

        let high = damages.iter().filter(|d| **d > 20.0).count();
        if high >= 3 {
            found.push(ThreatPattern::new(
                PatternKind::HighDamage,
                high,
                n,
                (mean(&damages) / 50.0).min(1.0),
            ));
        }

        let bursts = damages
            .windows(2)
            .filter(|pair| pair[1] > pair[0] * 2.0 && pair[1] > 30.0)
            .count();
        if bursts > 0 {
            let peak = damages.iter().copied().fold(0.0, f32::max);
            found.push(ThreatPattern::new(
                PatternKind::BurstDamage,
                bursts,
                n,
                (peak / 100.0).min(1.0),
            ));
        }

        let sustained = run_count(window, 3, |r| r.damage > 10.0);
        if sustained > 0 {
            let effectiveness = (mean(&damages) / 30.0) * (1.0 - variance(&damages) / 100.0);
            found.push(ThreatPattern::new(
                PatternKind::SustainedDamage,
                sustained,
                n,
                effectiveness.min(1.0),
            ));
        }

        let chain = run_count(window, 2, |r| r.has_control());
        if chain > 0 {
            let flags: u32 = window.iter().map(|r| r.control_count()).sum();
            found.push(ThreatPattern::new(
                PatternKind::ControlChain,
                chain,
                n,
                (flags as f32 / (n as f32 * 2.0)).min(1.0),
            ));
        }

        let mut combos = 0;
        let mut best_combo: f32 = 0.0;
        for pair in window.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let heavy = current.damage > 15.0;
            if heavy && (current.has_control() || previous.has_control()) {
                combos += 1;
            }
            if heavy && current.has_control() {
                best_combo = best_combo
                    .max(current.damage / 100.0 + current.control_count() as f32 / 3.0);
            }
        }
        if combos > 0 {
            found.push(ThreatPattern::new(
                PatternKind::ControlDamageCombo,
                combos,
                n,
                best_combo.min(1.0),
            ));
        }

        let area = window
            .iter()
            .filter(|r| r.hexes_affected > 2 && r.has_control())
            .count();
        if area > 0 {
            let widest = window
                .iter()
                .map(|r| r.hexes_affected as f32 / 6.0)
                .fold(0.0, f32::max);
            found.push(ThreatPattern::new(
                PatternKind::AreaControl,
                area,
                n,
                widest.min(1.0),
            ));
        }

        found.retain(|p| p.frequency > self.frequency_floor);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::effects::ControlFlags;

    fn hit(damage: f32) -> AbilityThreatResult {
        AbilityThreatResult::basic(damage)
    }

    fn controlled(damage: f32, flags: ControlFlags) -> AbilityThreatResult {
        AbilityThreatResult {
            control_effects: flags,
            ..AbilityThreatResult::basic(damage)
        }
    }

    fn detect(history: &[AbilityThreatResult]) -> Vec<ThreatPattern> {
        let refs: Vec<&AbilityThreatResult> = history.iter().collect();
        PatternDetector::default().detect(&refs)
    }

    fn find(patterns: &[ThreatPattern], kind: PatternKind) -> Option<&ThreatPattern> {
        patterns.iter().find(|p| p.pattern == kind)
    }

    #[test]
    fn test_ten_identical_high_hits() {
        let history = vec![hit(25.0); 10];
        let patterns = detect(&history);
        let high = find(&patterns, PatternKind::HighDamage).unwrap();
        assert_eq!(high.frequency, 1.0);
        assert!((high.effectiveness - 0.5).abs() < 1e-6);
        assert_eq!(high.counter_measures.len(), 3);

        let sustained = find(&patterns, PatternKind::SustainedDamage).unwrap();
        assert!((sustained.frequency - 0.8).abs() < 1e-6);
        assert!(find(&patterns, PatternKind::BurstDamage).is_none());
    }

    #[test]
    fn test_only_the_window_is_examined() {
        let mut history = vec![hit(50.0); 10];
        history.extend(vec![hit(0.0); 10]);
        assert!(detect(&history).is_empty());
    }

    #[test]
    fn test_low_frequency_patterns_dropped() {
        let mut history = vec![hit(0.0); 7];
        history.extend(vec![hit(25.0); 3]);
        let patterns = detect(&history);
        // 3 of 10 is not above the floor
        assert!(find(&patterns, PatternKind::HighDamage).is_none());
    }

    #[test]
    fn test_burst_damage() {
        let history = vec![hit(5.0), hit(40.0), hit(5.0), hit(60.0)];
        let patterns = detect(&history);
        let burst = find(&patterns, PatternKind::BurstDamage).unwrap();
        assert_eq!(burst.frequency, 0.5);
        assert!((burst.effectiveness - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_control_chain_and_combo() {
        let frozen = ControlFlags::FROZEN;
        let history = vec![
            controlled(0.0, frozen),
            hit(20.0),
            controlled(0.0, frozen),
            hit(20.0),
            controlled(0.0, frozen),
            hit(20.0),
        ];
        let patterns = detect(&history);
        let combo = find(&patterns, PatternKind::ControlDamageCombo).unwrap();
        assert_eq!(combo.frequency, 0.5);
        assert!(find(&patterns, PatternKind::ControlChain).is_none());

        let chained = vec![controlled(20.0, frozen | ControlFlags::TRAP); 4];
        let patterns = detect(&chained);
        let chain = find(&patterns, PatternKind::ControlChain).unwrap();
        assert_eq!(chain.frequency, 0.75);
        assert_eq!(chain.effectiveness, 1.0);
        let combo = find(&patterns, PatternKind::ControlDamageCombo).unwrap();
        assert!((combo.effectiveness - 0.8666667).abs() < 1e-5);
    }

    #[test]
    fn test_area_control() {
        let wide = AbilityThreatResult {
            hexes_affected: 3,
            ..controlled(0.0, ControlFlags::TRAP)
        };
        let history = vec![wide.clone(), wide, hit(0.0)];
        let patterns = detect(&history);
        let area = find(&patterns, PatternKind::AreaControl).unwrap();
        assert!((area.frequency - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(area.effectiveness, 0.5);
    }

    #[test]
    fn test_empty_history() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn test_pattern_names_serialize() {
        let json = serde_json::to_string(&PatternKind::ControlDamageCombo).unwrap();
        assert_eq!(json, "\"Control + Damage Combo\"");
        assert_eq!(PatternKind::AreaControl.to_string(), "Area Control");
    }
}
