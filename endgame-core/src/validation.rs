//! Role-aware item validation and auto-repair.
//!
//! Validation never fails: it produces a report of errors and warnings plus a
//! diagnostic score. Callers decide whether to repair, reject or accept.

use crate::models::{ItemRecord, StatSlot};
use crate::roles::ClassRole;
use crate::stats::{quality_multiplier, scaling_exponent, stat};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub const MANA_REGEN_CAP: i32 = 60;
pub const MANA_REGEN_WARNING: i32 = 45;
pub const DEFENSE_CAP: i32 = 80;
const MINIMUM_STATS: usize = 4;
const FILLER_STATS: [i32; 4] = [stat::STAMINA, stat::INTELLECT, stat::AGILITY, stat::STRENGTH];

pub const SPELL_TRINKET_SPELLS: [i32; 5] = [60493, 60485, 49622, 33953, 60063];
pub const MELEE_TRINKET_SPELLS: [i32; 6] = [67672, 58901, 60436, 60313, 60487, 60442];
pub const TANK_TRINKET_SPELLS: [i32; 3] = [67653, 60180, 60258];

/// Item category used for stat count and stamina rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    Trinket,
    Neck,
    Ring,
    Weapon,
    Armor,
}

impl ItemKind {
    pub fn of(item: &ItemRecord) -> Self {
        match item.inventory_type {
            0 => Self::Trinket,
            2 => Self::Neck,
            11 => Self::Ring,
            13 | 17 | 21 | 22 => Self::Weapon,
            _ => Self::Armor,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Trinket => "trinket",
            Self::Neck => "neck",
            Self::Ring => "ring",
            Self::Weapon => "weapon",
            Self::Armor => "armor",
        }
    }

    pub fn expects_stamina(self) -> bool {
        self == Self::Armor
    }

    pub fn stat_count_range(self) -> StatCountRange {
        match self {
            Self::Trinket => StatCountRange::new(2, 2, 2),
            Self::Ring | Self::Neck => StatCountRange::new(3, 4, 4),
            Self::Weapon => StatCountRange::new(3, 5, 4),
            Self::Armor => StatCountRange::new(5, 6, 6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatCountRange {
    pub min: usize,
    pub max: usize,
    pub optimal: usize,
}

impl StatCountRange {
    pub fn new(min: usize, max: usize, optimal: usize) -> Self {
        Self { min, max, optimal }
    }
}

/// Stats a role must, should and may carry.
#[derive(Debug, Clone, Copy)]
pub struct StatPriority {
    pub primary: &'static [i32],
    pub secondary: &'static [i32],
    pub tertiary: &'static [i32],
}

impl ClassRole {
    pub fn stat_priority(self) -> Option<StatPriority> {
        let (primary, secondary, tertiary): (&'static [i32], &'static [i32], &'static [i32]) = match self {
            Self::StrengthMelee => (&[4, 7], &[31, 37, 32, 36], &[44]),
            Self::AgilityMelee => (&[3, 7], &[31, 32, 38, 36], &[44, 37]),
            Self::Ranged => (&[3, 38], &[31, 32, 44, 36], &[7]),
            Self::Mage => (&[45, 5], &[31, 32, 36], &[6, 43]),
            Self::Healer => (&[45, 5], &[43, 32, 36], &[6, 7]),
            Self::Tank => (&[7, 12], &[13, 14, 31, 37], &[4, 3]),
            Self::Generic => return None,
        };
        Some(StatPriority { primary, secondary, tertiary })
    }

    /// Stat that must dominate the item for this role.
    pub fn power_stat(self) -> Option<i32> {
        match self {
            Self::Mage | Self::Healer => Some(stat::SPELL_POWER),
            Self::Generic => None,
            _ => Some(stat::ATTACK_POWER),
        }
    }

    pub fn trinket_spells(self) -> &'static [i32] {
        match self {
            Self::Mage | Self::Healer => &SPELL_TRINKET_SPELLS,
            Self::Tank => &TANK_TRINKET_SPELLS,
            _ => &MELEE_TRINKET_SPELLS,
        }
    }
}

/// A single validation finding.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationIssue {
    #[error("unknown class role {0}")]
    UnknownRole(i32),
    #[error("missing primary stat {0}")]
    MissingPrimaryStat(i32),
    #[error("stat {stat_type} ({value}) exceeds limit of {cap}")]
    CapExceeded { stat_type: i32, value: i32, cap: i32 },
    #[error("mana regeneration ({0}) is high")]
    ManaRegenHigh(i32),
    #[error("stat {0} should be the highest stat")]
    PowerStatNotDominant(i32),
    #[error("item should have stamina")]
    MissingStamina,
    #[error("item carries stamina it should not")]
    UnexpectedStamina,
    #[error("{kind} items need at least {min} stats, found {found}")]
    TooFewStats { kind: &'static str, min: usize, found: usize },
    #[error("{kind} items allow at most {max} stats, found {found}")]
    TooManyStats { kind: &'static str, max: usize, found: usize },
    #[error("{kind} items optimally have {optimal} stats, found {found}")]
    BelowOptimalStats { kind: &'static str, optimal: usize, found: usize },
    #[error("trinket has no spell")]
    MissingTrinketSpell,
    #[error("trinket spell {0} does not suit the role")]
    UnsuitedTrinketSpell(i32),
}

impl ValidationIssue {
    /// Points taken off the score.
    pub fn penalty(&self) -> i32 {
        match self {
            Self::UnknownRole(_) => 100,
            Self::MissingPrimaryStat(_) | Self::MissingTrinketSpell => 20,
            Self::CapExceeded { .. } => 15,
            Self::PowerStatNotDominant(_) | Self::TooFewStats { .. } => 10,
            Self::ManaRegenHigh(_)
            | Self::MissingStamina
            | Self::TooManyStats { .. }
            | Self::UnsuitedTrinketSpell(_) => 5,
            Self::BelowOptimalStats { .. } => 3,
            Self::UnexpectedStamina => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub role: ClassRole,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub score: i32,
}

impl ValidationReport {
    fn new(role: ClassRole) -> Self {
        Self { role, errors: Vec::new(), warnings: Vec::new(), score: 100 }
    }

    fn error(&mut self, issue: ValidationIssue) {
        self.score -= issue.penalty();
        self.errors.push(issue);
    }

    fn warning(&mut self, issue: ValidationIssue) {
        self.score -= issue.penalty();
        self.warnings.push(issue);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ItemRecord {
    /// Positive stats keyed by type.
    fn current_stats(&self) -> BTreeMap<i32, i32> {
        self.occupied_stats()
            .filter(|s| s.value > 0)
            .map(|s| (s.stat_type, s.value))
            .collect()
    }

    fn first_spell_id(&self) -> Option<i32> {
        self.spells.iter().find(|s| !s.is_empty()).map(|s| s.spell_id)
    }

    pub fn validate(&self, role: ClassRole) -> ValidationReport {
        let mut report = ValidationReport::new(role);
        let Some(priority) = role.stat_priority() else {
            report.errors.push(ValidationIssue::UnknownRole(role.code()));
            report.score = 0;
            return report;
        };

        let stats = self.current_stats();
        let kind = ItemKind::of(self);

        for &required in priority.primary {
            let applies = required != stat::STAMINA || kind.expects_stamina();
            if applies && !stats.contains_key(&required) {
                report.error(ValidationIssue::MissingPrimaryStat(required));
            }
        }

        if let Some(&mana_regen) = stats.get(&stat::MANA_REGENERATION) {
            if mana_regen > MANA_REGEN_CAP {
                report.error(ValidationIssue::CapExceeded {
                    stat_type: stat::MANA_REGENERATION,
                    value: mana_regen,
                    cap: MANA_REGEN_CAP,
                });
            } else if mana_regen > MANA_REGEN_WARNING {
                report.warning(ValidationIssue::ManaRegenHigh(mana_regen));
            }
        }
        if let Some(&defense) = stats.get(&stat::DEFENSE_RATING) {
            if defense > DEFENSE_CAP {
                report.error(ValidationIssue::CapExceeded {
                    stat_type: stat::DEFENSE_RATING,
                    value: defense,
                    cap: DEFENSE_CAP,
                });
            }
        }

        let highest = stats.values().copied().max().unwrap_or(0);
        if let Some(power) = role.power_stat() {
            if stats.get(&power).is_some_and(|&value| value < highest) {
                report.error(ValidationIssue::PowerStatNotDominant(power));
            }
        }

        let has_stamina = stats.contains_key(&stat::STAMINA);
        if kind.expects_stamina() && !has_stamina {
            report.warning(ValidationIssue::MissingStamina);
        } else if !kind.expects_stamina() && has_stamina {
            report.warning(ValidationIssue::UnexpectedStamina);
        }

        let range = kind.stat_count_range();
        let found = stats.len();
        if found < range.min {
            report.error(ValidationIssue::TooFewStats { kind: kind.name(), min: range.min, found });
        } else if found > range.max {
            report.warning(ValidationIssue::TooManyStats { kind: kind.name(), max: range.max, found });
        } else if found < range.optimal {
            report.warning(ValidationIssue::BelowOptimalStats {
                kind: kind.name(),
                optimal: range.optimal,
                found,
            });
        }

        if kind == ItemKind::Trinket {
            match self.first_spell_id() {
                None => report.error(ValidationIssue::MissingTrinketSpell),
                Some(spell_id) if !role.trinket_spells().contains(&spell_id) => {
                    report.warning(ValidationIssue::UnsuitedTrinketSpell(spell_id))
                }
                Some(_) => {}
            }
        }

        report
    }

    /// Clamp a stat to `cap`. Returns whether anything changed.
    pub fn cap_stat(&mut self, stat_type: i32, cap: i32) -> bool {
        match self
            .stats
            .iter_mut()
            .find(|s| s.stat_type == stat_type && s.value > cap)
        {
            Some(slot) => {
                debug!("Capped {} on {} from {} to {}", crate::stats::stat_name(stat_type), self.entry, slot.value, cap);
                slot.value = cap;
                true
            }
            None => false,
        }
    }

    /// Apply the hard caps.
    pub fn cap_stats(&mut self) -> bool {
        let mana = self.cap_stat(stat::MANA_REGENERATION, MANA_REGEN_CAP);
        let defense = self.cap_stat(stat::DEFENSE_RATING, DEFENSE_CAP);
        mana || defense
    }

    /// Write the role's power stat into the first empty slot when the item
    /// lacks it.
    pub fn add_missing_key_stat<R: Rng + ?Sized>(&mut self, role: ClassRole, rng: &mut R) -> bool {
        let Some(power) = role.power_stat() else {
            return false;
        };
        if self.has_stat(power) {
            return false;
        }
        let item_level = self.item_level.unwrap_or(0);
        let quality = self.quality.unwrap_or(0);
        let Some(slot) = self.stats.iter_mut().find(|s| s.is_empty()) else {
            return false;
        };

        let base = rng.gen_range(350..=500) as f64;
        let value = (base * scaling_exponent(power) * item_level as f64 / 100.0 * quality_multiplier(quality)) as i32;
        *slot = StatSlot::new(power, value);
        self.stats_count += 1;
        debug!("Added {} {} to {}", crate::stats::stat_name(power), value, self.entry);
        true
    }

    /// Give a trinket a spell from its role's pool. Returns the chosen spell.
    pub fn assign_trinket_spell<R: Rng + ?Sized>(&mut self, role: ClassRole, rng: &mut R) -> Option<i32> {
        if ItemKind::of(self) != ItemKind::Trinket {
            return None;
        }
        let pool = role.trinket_spells();
        let spell_id = pool[rng.gen_range(0..pool.len())];
        self.spells[0].spell_id = spell_id;
        Some(spell_id)
    }

    /// Cap mana regeneration, make the power stat dominant and top up thin
    /// items with filler stats.
    pub fn enforce_stat_requirements(&mut self) {
        let mut stats: Vec<StatSlot> = self
            .occupied_stats()
            .filter(|s| s.value != 0)
            .copied()
            .collect();

        for slot in stats.iter_mut() {
            if slot.stat_type == stat::MANA_REGENERATION && slot.value > MANA_REGEN_CAP {
                slot.value = MANA_REGEN_CAP;
            }
        }

        let highest = stats.iter().map(|s| s.value).max().unwrap_or(0);
        let power = [stat::SPELL_POWER, stat::ATTACK_POWER]
            .into_iter()
            .find(|power| stats.iter().any(|s| s.stat_type == *power));
        if let Some(power) = power {
            for slot in stats.iter_mut().filter(|s| s.stat_type == power && s.value < highest) {
                slot.value = highest + 10;
            }
        }

        let kind = ItemKind::of(self);
        if kind != ItemKind::Ring && kind != ItemKind::Trinket {
            let filler_value = self.item_level.unwrap_or(100) / 2;
            for filler in FILLER_STATS {
                if stats.len() >= MINIMUM_STATS {
                    break;
                }
                if !stats.iter().any(|s| s.stat_type == filler) {
                    stats.push(StatSlot::new(filler, filler_value));
                }
            }
        }

        self.stats = Default::default();
        for (target, slot) in self.stats.iter_mut().zip(&stats) {
            *target = *slot;
        }
        self.stats_count = stats.len().min(self.stats.len()) as i32;
    }
}
