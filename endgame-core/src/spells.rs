//! Spell-to-stat conversion and spell magnitude scaling.
//!
//! Auras that grant a flat stat are folded into the item's stat budget.
//! Anything else stays a live spell and is rescaled as a new record.

use crate::error::{EndgameError, Result};
use crate::models::{SpellRecord, SPELL_EFFECT_COUNT};
use crate::stats::{cost_modifier, spell_id_bump, stat, tier_modifier};
use tracing::debug;

/// Spell effect kinds.
pub mod effect {
    pub const SCHOOL_DAMAGE: i32 = 2;
    pub const APPLY_AURA: i32 = 6;
    pub const HEALTH_LEECH: i32 = 9;
    pub const HEAL: i32 = 10;
    pub const ENERGIZE: i32 = 30;
    pub const APPLY_AREA_AURA: i32 = 35;
}

/// Aura kinds.
pub mod aura {
    pub const PERIODIC_DAMAGE: i32 = 3;
    pub const PERIODIC_HEAL: i32 = 8;
    pub const MOD_DAMAGE_DONE: i32 = 13;
    pub const DAMAGE_SHIELD: i32 = 15;
    pub const MOD_RESISTANCE: i32 = 22;
    pub const MOD_STAT: i32 = 29;
    pub const MOD_INCREASE_HEALTH: i32 = 34;
    pub const PROC_TRIGGER_SPELL: i32 = 42;
    pub const MOD_POWER_REGEN: i32 = 85;
    pub const MOD_ATTACK_POWER: i32 = 99;
    pub const MOD_RATING_LEGACY: i32 = 123;
    pub const MOD_RANGED_ATTACK_POWER: i32 = 124;
    pub const MOD_HEALING_DONE: i32 = 135;
    pub const MOD_RATING: i32 = 189;
}

const DIRECT_EFFECTS: [i32; 3] = [effect::SCHOOL_DAMAGE, effect::HEALTH_LEECH, effect::HEAL];

const STAT_AURAS: [i32; 12] = [
    aura::PERIODIC_DAMAGE,
    aura::PERIODIC_HEAL,
    aura::MOD_DAMAGE_DONE,
    aura::DAMAGE_SHIELD,
    aura::MOD_RESISTANCE,
    aura::MOD_STAT,
    aura::MOD_INCREASE_HEALTH,
    aura::MOD_POWER_REGEN,
    aura::MOD_ATTACK_POWER,
    aura::MOD_RANGED_ATTACK_POWER,
    aura::MOD_HEALING_DONE,
    aura::MOD_RATING,
];

const POWER_AURAS: [i32; 4] = [
    aura::MOD_ATTACK_POWER,
    aura::MOD_RANGED_ATTACK_POWER,
    aura::MOD_DAMAGE_DONE,
    aura::MOD_HEALING_DONE,
];

const DIRECT_MULTIPLIER: f64 = 2.5;
const PERIODIC_DAMAGE_MULTIPLIER: f64 = 2.0;
const DAMAGE_SHIELD_MULTIPLIER: f64 = 1.5;
const POWER_AURA_MULTIPLIER: f64 = 2.0;
const POWER_AURA_EXPONENT: f64 = 1.3;

/// Whether the aura kind belongs to the recognized stat-aura set.
pub fn is_stat_aura(aura_kind: i32) -> bool {
    STAT_AURAS.contains(&aura_kind)
}

/// Stat granted by a recognized aura, if it maps onto one directly.
pub fn aura_stat_type(aura_kind: i32) -> Option<i32> {
    match aura_kind {
        aura::PERIODIC_HEAL => Some(stat::HEALTH_REGEN),
        aura::MOD_DAMAGE_DONE => Some(stat::SPELL_POWER),
        aura::MOD_STAT => Some(stat::STRENGTH),
        aura::MOD_POWER_REGEN => Some(stat::MANA_REGENERATION),
        aura::MOD_ATTACK_POWER => Some(stat::ATTACK_POWER),
        aura::MOD_RANGED_ATTACK_POWER => Some(stat::ATTACK_POWER),
        aura::MOD_HEALING_DONE => Some(stat::SPELL_POWER),
        _ => None,
    }
}

/// Infer the rating a catch-all rating aura modifies from its description.
/// Returns 0 when nothing matches.
pub fn stat_from_description(description: &str) -> i32 {
    const KEYWORDS: [(&str, i32); 10] = [
        ("critical strike", stat::CRIT_RATING),
        ("dodge", stat::DODGE_RATING),
        ("parry", stat::PARRY_RATING),
        ("hit rating", stat::HIT_RATING),
        ("haste rating", stat::HASTE_RATING),
        ("expertise rating", stat::EXPERTISE_RATING),
        ("defense rating", stat::DEFENSE_RATING),
        ("block rating", stat::BLOCK_RATING),
        ("armor penetration", stat::ARMOR_PENETRATION),
        ("spell penetration", stat::SPELL_PENETRATION),
    ];

    KEYWORDS
        .iter()
        .find(|(keyword, _)| description.contains(keyword))
        .map(|(_, stat_type)| *stat_type)
        .unwrap_or(0)
}

/// A stat extracted from a spell aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedStat {
    pub stat_type: i32,
    pub value: i32,
    pub budget: i32,
}

impl ConvertedStat {
    pub fn new(stat_type: i32, value: i32) -> Self {
        // Magnitude first so negative values round away from zero too.
        let budget = (value.unsigned_abs() as f64 * cost_modifier(stat_type)).ceil() as i32;
        Self {
            stat_type,
            value,
            budget,
        }
    }
}

/// Lazy sequence of the stats a spell converts into. Cloning restarts it.
#[derive(Debug, Clone)]
pub struct StatConversions<'a> {
    spell: &'a SpellRecord,
    next_slot: usize,
    seen: Vec<i32>,
    description_done: bool,
}

impl<'a> StatConversions<'a> {
    fn new(spell: &'a SpellRecord) -> Self {
        Self {
            spell,
            next_slot: 0,
            seen: Vec::with_capacity(SPELL_EFFECT_COUNT),
            description_done: false,
        }
    }

    fn from_description(&mut self) -> Option<ConvertedStat> {
        self.description_done = true;
        let first = &self.spell.effects[0];
        let rating_aura = first.aura == aura::MOD_RATING || first.aura == aura::MOD_RATING_LEGACY;
        if first.effect != effect::APPLY_AURA || !rating_aura {
            return None;
        }

        let stat_type = stat_from_description(&self.spell.description);
        if stat_type == 0 {
            debug!(
                "No rating keyword in description of spell {} ({}), dropping",
                self.spell.name, self.spell.id
            );
            return None;
        }
        Some(ConvertedStat::new(stat_type, first.max_value()))
    }
}

impl Iterator for StatConversions<'_> {
    type Item = ConvertedStat;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_slot < SPELL_EFFECT_COUNT {
            let effect = self.spell.effects[self.next_slot];
            self.next_slot += 1;

            if !is_stat_aura(effect.aura) {
                continue;
            }
            let Some(stat_type) = aura_stat_type(effect.aura) else {
                continue;
            };
            // Equivalent buffs on one spell count once.
            if self.seen.contains(&stat_type) {
                continue;
            }
            self.seen.push(stat_type);
            return Some(ConvertedStat::new(stat_type, effect.max_value()));
        }

        if self.description_done {
            return None;
        }
        self.from_description()
    }
}

/// Result of a scaling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellScaleOutcome {
    Scaled,
    NotApplicable,
}

/// Spell-side quality factor (Rare 1.2, Epic 1.3, Legendary 1.4).
pub fn spell_quality_factor(quality: i32) -> f64 {
    match quality {
        3 => 1.20,
        4 => 1.30,
        5 => 1.40,
        _ => 1.0,
    }
}

impl SpellRecord {
    /// Stats this spell converts into, or `None` when it carries neither a
    /// first effect nor a first aura.
    pub fn stat_conversions(&self) -> Option<StatConversions<'_>> {
        let first = &self.effects[0];
        if first.effect == 0 && first.aura == 0 {
            return None;
        }
        Some(StatConversions::new(self))
    }

    pub fn convert_to_stats(&self) -> Vec<ConvertedStat> {
        self.stat_conversions()
            .map(|conversions| conversions.collect())
            .unwrap_or_default()
    }

    /// True only when every effect is empty or a plain aura wrapper and at
    /// least one aura is a recognized stat aura.
    pub fn can_be_converted(&self) -> bool {
        if self
            .effects
            .iter()
            .any(|e| e.effect != 0 && e.effect != effect::APPLY_AURA)
        {
            return false;
        }

        self.effects
            .iter()
            .any(|e| e.aura != 0 && is_stat_aura(e.aura))
    }

    pub fn has_trigger_aura(&self) -> bool {
        self.effects.iter().any(|e| e.aura == aura::PROC_TRIGGER_SPELL)
    }

    fn mentions_mana(&self) -> bool {
        self.description.contains("mana") || self.description.contains("Mana")
    }

    /// Rescale every effect slot from `from_level` to `to_level`.
    pub fn force_scale(
        &mut self,
        from_level: i32,
        to_level: i32,
        quality: i32,
        tier: i32,
    ) -> Result<SpellScaleOutcome> {
        if from_level <= 0 {
            return Err(EndgameError::InvalidDomain(format!(
                "cannot scale spell {} from item level {}",
                self.id, from_level
            )));
        }

        let base_factor = to_level as f64 / from_level as f64
            * spell_quality_factor(quality)
            * tier_modifier(tier);
        let mentions_mana = self.mentions_mana();
        let mut scaled = false;

        for slot in self.effects.iter_mut() {
            if slot.base_points == 0 {
                continue;
            }

            let multiplier = match (slot.effect, slot.aura) {
                (e, _) if DIRECT_EFFECTS.contains(&e) => DIRECT_MULTIPLIER,
                // Flat non-mana restores are left alone.
                (effect::ENERGIZE, _) if mentions_mana => 1.0,
                (effect::APPLY_AREA_AURA, _) => 1.0,
                (effect::APPLY_AURA, aura::PERIODIC_DAMAGE) => PERIODIC_DAMAGE_MULTIPLIER,
                (effect::APPLY_AURA, aura::DAMAGE_SHIELD) => DAMAGE_SHIELD_MULTIPLIER,
                (effect::APPLY_AURA, a) if is_stat_aura(a) => 1.0,
                _ => continue,
            };

            slot.base_points = (slot.base_points as f64 * base_factor * multiplier) as i32;
            scaled = true;
        }

        if !scaled {
            debug!("No scaling rule for spell {} ({})", self.name, self.id);
            return Ok(SpellScaleOutcome::NotApplicable);
        }
        Ok(SpellScaleOutcome::Scaled)
    }

    /// Rescale attack/spell power auras on the steeper item stat curve.
    ///
    /// This is the standalone path for comparing a power aura against item
    /// stats at another level. Item scaling does not call it: live spells on
    /// an item go through [`SpellRecord::scaled_copy`], which force-scales
    /// every effect slot.
    pub fn scale_stat_aura(
        &mut self,
        from_level: i32,
        to_level: i32,
        quality: i32,
    ) -> Result<SpellScaleOutcome> {
        if from_level <= 0 {
            return Err(EndgameError::InvalidDomain(format!(
                "cannot scale spell {} from item level {}",
                self.id, from_level
            )));
        }

        let ratio = (to_level as f64 / from_level as f64).powf(POWER_AURA_EXPONENT);
        let factor = POWER_AURA_MULTIPLIER * ratio * spell_quality_factor(quality);
        let mut scaled = false;

        for slot in self.effects.iter_mut() {
            let wrapper = slot.effect == effect::APPLY_AURA || slot.effect == effect::APPLY_AREA_AURA;
            if !wrapper || !POWER_AURAS.contains(&slot.aura) {
                continue;
            }
            slot.base_points = (slot.base_points as f64 * factor) as i32;
            scaled = true;
        }

        Ok(if scaled {
            SpellScaleOutcome::Scaled
        } else {
            SpellScaleOutcome::NotApplicable
        })
    }

    /// Force-scaled copy of this spell under its quality-bumped id. The
    /// receiver is left untouched.
    pub fn scaled_copy(
        &self,
        from_level: i32,
        to_level: i32,
        quality: i32,
        tier: i32,
    ) -> Result<Option<SpellRecord>> {
        let mut copy = self.clone();
        match copy.force_scale(from_level, to_level, quality, tier)? {
            SpellScaleOutcome::Scaled => {
                copy.id = spell_id_bump(quality) + self.id;
                Ok(Some(copy))
            }
            SpellScaleOutcome::NotApplicable => Ok(None),
        }
    }
}
