//! Item stat budget scaling.
//!
//! An item's raw stat slots and the stats its spells convert into are pooled
//! into one budget keyed by stat type, rescaled along a level-ratio power
//! curve, merged, dampened and written back into the physical slots.

use crate::error::{EndgameError, Result};
use crate::models::{ItemRecord, SpellRecord, SpellSlot, StatSlot, SPELL_SLOT_COUNT, STAT_SLOT_COUNT};
use crate::spells::ConvertedStat;
use crate::stats::{
    self, stat, cost_modifier, quality_multiplier, scaling_exponent, slot_multiplier,
    tier_for_item_level, tier_modifier, CATCH_UP_BONUS, ITEM_CLASS_ARMOR, ITEM_CLASS_WEAPON,
};
use crate::store::ItemStore;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

lazy_static! {
    static ref FIRE_THEME: Regex = Regex::new(
        r"(?i)flame|fire|salamander|crimson|burning|blazing|infernal|molten|ember|igniting|flamewalker|flameguard"
    )
    .expect("fire theme pattern is valid");
}

const FIRE_RES_BASE: f64 = 10.0;
const FIRE_RES_MAX: f64 = 25.0;
const FIRE_RES_EXISTING_FACTOR: f64 = 1.5;

const MYTHIC_PREFIXES: [&str; 6] = ["Mythic", "Powerful", "Stalwart", "Venerated", "Mighty", "Unyielding"];
const LEGENDARY_PREFIXES: [&str; 7] = [
    "Legendary", "Fabled", "Exalted", "Magnificent", "Pristine", "Supreme", "Glorious",
];
const ASCENDANT_PREFIXES: [&str; 10] = [
    "Ascendant", "Godlike", "Celestial", "Transcendant", "Divine", "Omnipotent", "Demonforged",
    "Immortal", "Omniscient", "Ethereal",
];

/// Where a budget entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatSource {
    Item,
    Spell,
}

/// One stat's share of an item's budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStat {
    pub stat_type: i32,
    pub value: i32,
    pub adj_value: f64,
    pub percent: f64,
    pub source: StatSource,
}

/// A spell attached to a given item spell slot.
#[derive(Debug, Clone)]
pub struct AttachedSpell {
    pub slot: usize,
    pub spell: SpellRecord,
}

/// What a scaling pass did besides rewriting stats.
#[derive(Debug, Clone, Default)]
pub struct ScaleReport {
    pub from_level: i32,
    pub to_level: i32,
    /// Spell ids folded into stats and removed from the item.
    pub converted_spells: Vec<i32>,
    /// Rescaled spell copies now referenced by the item. They must be
    /// persisted alongside it.
    pub derived_spells: Vec<SpellRecord>,
    pub dps: Option<f64>,
}

/// Rescale one stat value from `from_level` to `to_level`.
pub fn scale_stat_value(
    value: i32,
    stat_type: i32,
    from_level: i32,
    to_level: i32,
    quality: i32,
    difficulty: i32,
) -> i32 {
    let level_ratio = to_level as f64 * stats::LEVEL_RATIO_BIAS / from_level as f64;
    let mut scaled = value as f64 * level_ratio.powf(scaling_exponent(stat_type));

    if difficulty == stats::DIFFICULTY_MYTHIC {
        scaled *= quality_multiplier(quality);
    } else if quality == 5 {
        // Higher tiers already carry their quality in the source item.
        scaled *= stats::LEGENDARY_OFF_TIER_FACTOR;
    }

    scaled.ceil() as i32
}

/// Fold the lower of two competing power stats into the higher one.
pub fn merge_power_stats(budget: &mut BTreeMap<i32, ItemStat>) {
    for other in [stat::ATTACK_POWER, stat::RANGED_ATTACK_POWER] {
        let (Some(power), Some(spell_power)) = (
            budget.get(&other).map(|s| s.value),
            budget.get(&stat::SPELL_POWER).map(|s| s.value),
        ) else {
            continue;
        };

        let (keep, drop) = if power > spell_power {
            (other, stat::SPELL_POWER)
        } else {
            (stat::SPELL_POWER, other)
        };
        let folded = budget.remove(&drop).map(|s| s.value).unwrap_or(0);
        if let Some(kept) = budget.get_mut(&keep) {
            kept.value += folded;
        }
        debug!("Merged {} into {}", stats::stat_name(drop), stats::stat_name(keep));
    }
}

fn dampen(stat_type: i32, value: i32) -> i32 {
    let damp = |v: i32, factor: f64| (v as f64 * factor).round() as i32;
    match stat_type {
        stat::MANA_REGENERATION => damp(value, stats::MANA_REGEN_DAMPENER),
        stat::DEFENSE_RATING => damp(
            damp(value, stats::DEFENSE_DAMPENER),
            stats::DEFENSE_SECOND_DAMPENER,
        ),
        stat::DODGE_RATING => damp(value, stats::DODGE_DAMPENER),
        stat::HIT_RATING => damp(value, stats::HIT_DAMPENER),
        _ => value,
    }
}

/// Random name prefix for a generated difficulty tier.
pub fn difficulty_prefix<R: Rng + ?Sized>(difficulty: i32, rng: &mut R) -> Option<&'static str> {
    let words: &[&'static str] = match difficulty {
        stats::DIFFICULTY_MYTHIC => &MYTHIC_PREFIXES,
        stats::DIFFICULTY_LEGENDARY => &LEGENDARY_PREFIXES,
        stats::DIFFICULTY_ASCENDANT => &ASCENDANT_PREFIXES,
        _ => return None,
    };
    Some(words[rng.gen_range(0..words.len())])
}

impl ItemRecord {
    /// Pool raw stats and spell-derived stats into one budget keyed by stat
    /// type. Zero-valued slots are left out. A later source for the same stat
    /// type replaces an earlier one.
    pub fn stat_budget(&self, spell_stats: &[ConvertedStat]) -> BTreeMap<i32, ItemStat> {
        let mut budget = BTreeMap::new();
        let mut total = 0.0;

        for slot in self.occupied_stats().filter(|s| s.value != 0) {
            let adj_value = slot.value as f64 / cost_modifier(slot.stat_type);
            total += adj_value;
            budget.insert(
                slot.stat_type,
                ItemStat {
                    stat_type: slot.stat_type,
                    value: slot.value,
                    adj_value,
                    percent: 0.0,
                    source: StatSource::Item,
                },
            );
        }

        for converted in spell_stats {
            let adj_value = converted.budget as f64;
            total += adj_value;
            budget.insert(
                converted.stat_type,
                ItemStat {
                    stat_type: converted.stat_type,
                    value: converted.value,
                    adj_value,
                    percent: 0.0,
                    source: StatSource::Spell,
                },
            );
        }

        if total > 0.0 {
            for entry in budget.values_mut() {
                entry.percent = (entry.adj_value / total * 100.0).round() / 100.0;
            }
        }
        budget
    }

    /// Highest valued primary stat (types 3 through 7) as `(type, value)`.
    /// Returns `(0, 0)` when the item carries none.
    pub fn primary_stat(&self) -> (i32, i32) {
        self.occupied_stats()
            .filter(|s| (stat::AGILITY..=stat::STAMINA).contains(&s.stat_type) && s.value != 0)
            .fold((0, 0), |best, s| if s.value > best.1 { (s.stat_type, s.value) } else { best })
    }

    /// Sorted stat types carried by the item, including spell-derived ones.
    pub fn stat_list(&self, spell_stats: &[ConvertedStat]) -> Vec<i32> {
        let mut list: Vec<i32> = spell_stats.iter().map(|s| s.stat_type).collect();
        list.extend(
            self.occupied_stats()
                .filter(|s| s.value != 0)
                .map(|s| s.stat_type),
        );
        list.sort_unstable();
        list
    }

    /// Replace every reference to `old_id` with `new_id`.
    pub fn update_spell_id(&mut self, old_id: i32, new_id: i32) -> bool {
        let mut updated = false;
        for slot in self.spells.iter_mut().filter(|s| s.spell_id == old_id) {
            slot.spell_id = new_id;
            updated = true;
        }
        updated
    }

    /// Move occupied spell slots forward so there are no gaps.
    pub fn compact_spells(&mut self) {
        let occupied: Vec<SpellSlot> = self.spells.iter().copied().filter(|s| !s.is_empty()).collect();
        self.spells = [SpellSlot::default(); SPELL_SLOT_COUNT];
        for (target, slot) in self.spells.iter_mut().zip(occupied) {
            *target = slot;
        }
    }

    pub fn clear_spells(&mut self) {
        self.spells = [SpellSlot::default(); SPELL_SLOT_COUNT];
    }

    /// Overwrite this item's stat layout with a reference item's.
    pub fn apply_stats(&mut self, reference: &ItemRecord) {
        self.stats = reference.stats;
        self.stats_count = reference.occupied_stats().count() as i32;
        self.item_level = reference.item_level;
        if reference.armor > 0 {
            self.armor = reference.armor;
        }
    }

    pub fn copy_spells_from(&mut self, reference: &ItemRecord) {
        self.spells = reference.spells;
    }

    /// Lift stats by the gear phase modifier and catch-up bonus, pricing
    /// cheap stats up by the inverse of their cost.
    pub fn apply_tier_modifiers(&mut self, phase: i32) {
        let tier = tier_modifier(phase);
        for slot in self.stats.iter_mut().filter(|s| !s.is_empty() && s.value != 0) {
            let inverse_cost = 1.0 / cost_modifier(slot.stat_type);
            slot.value = (slot.value as f64 * tier * inverse_cost * CATCH_UP_BONUS) as i32;
        }
    }

    /// Scale existing fire resistance or grant some to fire themed items.
    /// Returns the new value when it changed.
    pub fn apply_fire_resistance(&mut self) -> Option<i32> {
        if self.name.is_empty() {
            return None;
        }

        if self.resistances.fire > 0 {
            let scaled = (self.resistances.fire as f64 * FIRE_RES_EXISTING_FACTOR) as i32;
            self.resistances.fire = scaled;
            return Some(scaled);
        }

        if !FIRE_THEME.is_match(&self.name) {
            return None;
        }

        let normalized = ((slot_multiplier(self.inventory_type) - 0.3) / 0.7).clamp(0.0, 1.0);
        let fire = (FIRE_RES_BASE + (FIRE_RES_MAX - FIRE_RES_BASE) * normalized).round() as i32;
        self.resistances.fire = fire;
        Some(fire)
    }

    /// Load the spells referenced by this item. Lookup failures are logged and
    /// the slot is skipped.
    pub fn attached_spells<S: ItemStore + ?Sized>(&self, store: &S) -> Vec<AttachedSpell> {
        self.spells
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .filter_map(|(slot, s)| match store.fetch_spell(s.spell_id) {
                Ok(spell) => Some(AttachedSpell { slot, spell }),
                Err(e) => {
                    warn!("Failed to load spell {} for item {}: {}", s.spell_id, self.entry, e);
                    None
                }
            })
            .collect()
    }

    /// Stat list including stats converted from attached spells.
    pub fn stat_list_with_spells<S: ItemStore + ?Sized>(&self, store: &S) -> Vec<i32> {
        let spell_stats: Vec<ConvertedStat> = self
            .attached_spells(store)
            .iter()
            .flat_map(|a| a.spell.convert_to_stats())
            .collect();
        self.stat_list(&spell_stats)
    }

    pub fn scale_item<S: ItemStore + ?Sized>(
        &mut self,
        store: &S,
        item_level: i32,
        quality: i32,
    ) -> Result<ScaleReport> {
        let attached = self.attached_spells(store);
        self.scale_with_spells(&attached, item_level, quality)
    }

    /// Rescale the item to `item_level` and at least `quality`.
    pub fn scale_with_spells(
        &mut self,
        attached: &[AttachedSpell],
        item_level: i32,
        quality: i32,
    ) -> Result<ScaleReport> {
        let from_level = self.item_level_or_err()?;
        let current_quality = self.quality_or_err()?;
        if from_level <= 0 {
            return Err(EndgameError::InvalidDomain(format!(
                "item {} has item level {}",
                self.entry, from_level
            )));
        }
        let is_weapon = self.class == ITEM_CLASS_WEAPON && self.min_dmg1 > 0.0;
        if is_weapon {
            // Fail before mutating anything.
            self.weapon_delay()?;
            self.dps_modifier()?;
        }

        self.item_level = Some(item_level);
        let quality = current_quality.max(quality);
        self.quality = Some(quality);

        info!(
            "Scaling item {} ({}) from level {} to {} at quality {}",
            self.name, self.entry, from_level, item_level, quality
        );

        let mut report = ScaleReport {
            from_level,
            to_level: item_level,
            ..Default::default()
        };

        let mut spell_stats = Vec::new();
        let mut live_spells = Vec::new();
        for attached_spell in attached {
            let converted = attached_spell.spell.convert_to_stats();
            if attached_spell.spell.can_be_converted() && !converted.is_empty() {
                debug!(
                    "Spell {} ({}) converts into {} stats",
                    attached_spell.spell.name,
                    attached_spell.spell.id,
                    converted.len()
                );
                spell_stats.extend(converted);
                report.converted_spells.push(attached_spell.spell.id);
                self.set_spell(attached_spell.slot, SpellSlot::default())?;
            } else {
                live_spells.push(&attached_spell.spell);
            }
        }

        let mut budget = self.stat_budget(&spell_stats);
        let difficulty = self.difficulty;
        for entry in budget.values_mut() {
            let original = entry.value;
            entry.value = scale_stat_value(
                entry.value,
                entry.stat_type,
                from_level,
                item_level,
                quality,
                difficulty,
            );
            if entry.stat_type == stat::SPELL_POWER && entry.value < stats::SPELL_POWER_FLOOR {
                entry.value = (entry.value as f64 * stats::SPELL_POWER_FLOOR_MULTIPLIER).round() as i32;
            }
            debug!(
                "Scaled {} from {} to {} ({:.2} of budget)",
                stats::stat_name(entry.stat_type),
                original,
                entry.value,
                entry.percent
            );
        }
        merge_power_stats(&mut budget);
        self.write_stats(&budget);

        if is_weapon {
            let before = self.dps().ok();
            let dps = self.scale_dps(from_level, item_level)?;
            debug!("DPS {:?} -> {:.1}", before, dps);
            report.dps = Some(dps);
        }
        if self.class == ITEM_CLASS_ARMOR {
            self.scale_armor(item_level)?;
        }

        self.compact_spells();

        let tier = tier_for_item_level(item_level);
        for spell in live_spells {
            if spell.has_trigger_aura() {
                debug!("Leaving trigger spell {} ({}) unscaled", spell.name, spell.id);
                continue;
            }
            match spell.scaled_copy(from_level, item_level, quality, tier) {
                Ok(Some(copy)) => {
                    self.update_spell_id(spell.id, copy.id);
                    report.derived_spells.push(copy);
                }
                Ok(None) => debug!("Spell {} ({}) has nothing to scale", spell.name, spell.id),
                Err(e) => warn!("Failed to scale spell {}: {}", spell.id, e),
            }
        }

        Ok(report)
    }

    /// Clear every stat slot and write the budget back with dampeners applied.
    fn write_stats(&mut self, budget: &BTreeMap<i32, ItemStat>) {
        self.stats = [StatSlot::default(); STAT_SLOT_COUNT];
        let mut written = 0;
        for (target, entry) in self.stats.iter_mut().zip(budget.values()) {
            *target = StatSlot::new(entry.stat_type, dampen(entry.stat_type, entry.value));
            written += 1;
        }
        if budget.len() > STAT_SLOT_COUNT {
            warn!(
                "Item {} has {} stats, only {} fit",
                self.entry,
                budget.len(),
                STAT_SLOT_COUNT
            );
        }
        self.stats_count = written;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpellEffect;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn leather_chest() -> ItemRecord {
        let mut item = ItemRecord::new(100, "Test Tunic");
        item.class = ITEM_CLASS_ARMOR;
        item.subclass = Some(2);
        item.inventory_type = 5;
        item.item_level = Some(60);
        item.quality = Some(3);
        item.armor = 200;
        item.stats[0] = StatSlot::new(stat::AGILITY, 20);
        item.stats[1] = StatSlot::new(stat::STAMINA, 15);
        item.stats_count = 2;
        item
    }

    fn power_spell(id: i32, aura_kind: i32, base: i32) -> SpellRecord {
        let mut spell = SpellRecord::new(id, format!("Power {}", id));
        spell.effects[0] = SpellEffect {
            effect: 6,
            base_points: base,
            die_sides: 1,
            aura: aura_kind,
            bonus_multiplier: 0.0,
        };
        spell
    }

    fn assert_slot_invariants(item: &ItemRecord) {
        let occupied: Vec<i32> = item.occupied_stats().map(|s| s.stat_type).collect();
        assert_eq!(occupied.len() as i32, item.stats_count);
        let mut unique = occupied.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), occupied.len());
    }

    #[test]
    fn test_scale_stat_value_mythic_applies_quality() {
        // 10 * (1.0795)^1.0 * 1.5 = 16.19 -> 17
        assert_eq!(scale_stat_value(10, stat::STRENGTH, 100, 100, 4, 3), 17);
        // Off tier: no quality factor unless legendary.
        assert_eq!(scale_stat_value(10, stat::STRENGTH, 100, 100, 4, 4), 11);
        assert_eq!(scale_stat_value(10, stat::STRENGTH, 100, 100, 5, 4), 14);
    }

    #[test]
    fn test_stat_budget_percents() {
        let item = leather_chest();
        let budget = item.stat_budget(&[ConvertedStat::new(stat::ATTACK_POWER, 30)]);
        // Agility 20, Stamina 15, AP budget 15 -> total 50.
        assert_eq!(budget[&stat::AGILITY].percent, 0.4);
        assert_eq!(budget[&stat::ATTACK_POWER].percent, 0.3);
        assert_eq!(budget[&stat::ATTACK_POWER].source, StatSource::Spell);
    }

    #[test]
    fn test_spell_stat_overrides_raw_slot() {
        let mut item = leather_chest();
        item.stats[2] = StatSlot::new(stat::ATTACK_POWER, 10);
        let budget = item.stat_budget(&[ConvertedStat::new(stat::ATTACK_POWER, 40)]);
        assert_eq!(budget.len(), 3);
        assert_eq!(budget[&stat::ATTACK_POWER].value, 40);
    }

    #[test]
    fn test_scaling_keeps_slot_invariants() {
        let mut item = leather_chest();
        item.stats[2] = StatSlot::new(stat::HIT_RATING, 10);
        item.stats[3] = StatSlot::new(stat::DEFENSE_RATING, 12);
        item.difficulty = 3;
        let report = item.scale_with_spells(&[], 200, 4).unwrap();
        assert_slot_invariants(&item);
        assert_eq!(item.stats_count, 4);
        assert_eq!(item.item_level, Some(200));
        assert_eq!(item.quality, Some(4));
        assert_eq!(report.from_level, 60);
        assert!(item.stat_value(stat::AGILITY).unwrap() > 20);
    }

    #[test]
    fn test_quality_is_never_downgraded() {
        let mut item = leather_chest();
        item.quality = Some(5);
        item.scale_with_spells(&[], 100, 3).unwrap();
        assert_eq!(item.quality, Some(5));
    }

    #[test]
    fn test_attack_and_spell_power_merge() {
        let mut item = leather_chest();
        item.stats[2] = StatSlot::new(stat::ATTACK_POWER, 40);
        item.stats[3] = StatSlot::new(stat::SPELL_POWER, 150);
        item.difficulty = 3;
        item.scale_with_spells(&[], 120, 3).unwrap();

        assert_slot_invariants(&item);
        assert!(!item.has_stat(stat::ATTACK_POWER));
        assert!(item.stat_value(stat::SPELL_POWER).unwrap() >= 150);
    }

    #[test]
    fn test_merge_folds_lower_into_higher() {
        let mut item = ItemRecord::new(1, "Merge");
        item.stats[0] = StatSlot::new(stat::RANGED_ATTACK_POWER, 90);
        item.stats[1] = StatSlot::new(stat::SPELL_POWER, 30);
        let mut budget = item.stat_budget(&[]);
        merge_power_stats(&mut budget);
        assert_eq!(budget.len(), 1);
        assert_eq!(budget[&stat::RANGED_ATTACK_POWER].value, 120);
    }

    #[test]
    fn test_low_spell_power_gets_floor() {
        let mut item = ItemRecord::new(2, "Wand of Sparks");
        item.item_level = Some(100);
        item.quality = Some(0);
        item.stats[0] = StatSlot::new(stat::SPELL_POWER, 10);
        item.scale_with_spells(&[], 100, 0).unwrap();
        // ceil(10 * 1.0795^1.05) = 11, then round(11 * 2.3785) = 26
        assert_eq!(item.stat_value(stat::SPELL_POWER), Some(26));
    }

    #[test]
    fn test_dampeners_on_write_back() {
        assert_eq!(dampen(stat::MANA_REGENERATION, 100), 85);
        assert_eq!(dampen(stat::DEFENSE_RATING, 100), 64);
        assert_eq!(dampen(stat::DODGE_RATING, 100), 75);
        assert_eq!(dampen(stat::HIT_RATING, 100), 65);
        assert_eq!(dampen(stat::STRENGTH, 100), 100);
    }

    #[test]
    fn test_converted_spell_slot_is_cleared_and_compacted() {
        let mut item = leather_chest();
        item.spells[0] = SpellSlot { spell_id: 11, trigger: 1 };
        item.spells[1] = SpellSlot { spell_id: 12, trigger: 2 };

        let mut damage = SpellRecord::new(12, "Fiery Hit");
        damage.effects[0] = SpellEffect { effect: 2, base_points: 50, die_sides: 10, aura: 0, bonus_multiplier: 0.0 };

        let attached = vec![
            AttachedSpell { slot: 0, spell: power_spell(11, 99, 29) },
            AttachedSpell { slot: 1, spell: damage },
        ];
        let report = item.scale_with_spells(&attached, 120, 4).unwrap();

        assert_eq!(report.converted_spells, vec![11]);
        assert!(item.has_stat(stat::ATTACK_POWER));
        assert_eq!(report.derived_spells.len(), 1);
        assert_eq!(report.derived_spells[0].id, 31_000_012);
        assert_eq!(item.spells[0].spell_id, 31_000_012);
        assert!(item.spells[1].is_empty());
        assert!(item.spells[2].is_empty());
    }

    #[test]
    fn test_trigger_spell_stays_unscaled() {
        let mut item = leather_chest();
        item.spells[0] = SpellSlot { spell_id: 21, trigger: 1 };
        let mut trigger = SpellRecord::new(21, "Chance on hit");
        trigger.effects[0] = SpellEffect { effect: 6, base_points: 0, die_sides: 0, aura: 42, bonus_multiplier: 0.0 };
        let report = item
            .scale_with_spells(&[AttachedSpell { slot: 0, spell: trigger }], 120, 4)
            .unwrap();
        assert!(report.derived_spells.is_empty());
        assert_eq!(item.spells[0].spell_id, 21);
    }

    #[test]
    fn test_missing_item_level_is_reported() {
        let mut item = leather_chest();
        item.item_level = None;
        assert!(matches!(
            item.scale_with_spells(&[], 100, 4),
            Err(EndgameError::MissingField(_))
        ));
    }

    #[test]
    fn test_bad_weapon_delay_leaves_item_untouched() {
        let mut sword = ItemRecord::new(10, "Test Sword");
        sword.class = ITEM_CLASS_WEAPON;
        sword.subclass = Some(7);
        sword.item_level = Some(60);
        sword.quality = Some(3);
        sword.min_dmg1 = 50.0;
        sword.max_dmg1 = 70.0;
        sword.delay = Some(0);
        sword.stats[0] = StatSlot::new(stat::STAMINA, 10);
        sword.stats_count = 1;
        let before = sword.clone();

        assert!(matches!(
            sword.scale_with_spells(&[], 200, 4),
            Err(EndgameError::InvalidDomain(_))
        ));
        assert_eq!(sword, before);
    }

    #[test]
    fn test_zero_valued_slots_are_not_budgeted() {
        let mut item = leather_chest();
        item.stats[2] = StatSlot::new(stat::HIT_RATING, 0);
        item.stats_count = 3;

        let budget = item.stat_budget(&[]);
        assert!(!budget.contains_key(&stat::HIT_RATING));
        assert_eq!(budget[&stat::AGILITY].percent, 0.57);

        item.scale_with_spells(&[], 100, 3).unwrap();
        assert!(!item.has_stat(stat::HIT_RATING));
        assert_eq!(item.stats_count, 2);
    }

    #[test]
    fn test_primary_stat() {
        let mut item = ItemRecord::new(3, "Primary");
        item.stats[0] = StatSlot::new(stat::STRENGTH, 20);
        item.stats[1] = StatSlot::new(stat::AGILITY, 30);
        item.stats[2] = StatSlot::new(stat::INTELLECT, 15);
        item.stats[3] = StatSlot::new(stat::ATTACK_POWER, 90);
        assert_eq!(item.primary_stat(), (stat::AGILITY, 30));
        assert_eq!(ItemRecord::new(4, "Empty").primary_stat(), (0, 0));
    }

    #[test]
    fn test_stat_list_is_sorted_and_includes_spells() {
        let item = leather_chest();
        let list = item.stat_list(&[ConvertedStat::new(stat::ATTACK_POWER, 10)]);
        assert_eq!(list, vec![stat::AGILITY, stat::STAMINA, stat::ATTACK_POWER]);
    }

    #[test]
    fn test_update_spell_id() {
        let mut item = ItemRecord::new(5, "Spells");
        item.spells[0].spell_id = 7;
        item.spells[2].spell_id = 7;
        assert!(item.update_spell_id(7, 8));
        assert_eq!(item.spells[2].spell_id, 8);
        assert!(!item.update_spell_id(99, 8));
    }

    #[test]
    fn test_apply_stats_from_reference() {
        let mut item = leather_chest();
        let mut reference = ItemRecord::new(9, "Reference");
        reference.stats[0] = StatSlot::new(stat::STRENGTH, 50);
        reference.item_level = Some(80);
        reference.armor = 0;
        item.apply_stats(&reference);
        assert_eq!(item.stats_count, 1);
        assert_eq!(item.item_level, Some(80));
        assert_eq!(item.armor, 200);
    }

    #[test]
    fn test_tier_modifiers() {
        let mut item = ItemRecord::new(6, "Tiered");
        item.stats[0] = StatSlot::new(stat::STRENGTH, 10);
        item.stats[1] = StatSlot::new(stat::ATTACK_POWER, 10);
        item.apply_tier_modifiers(1);
        assert_eq!(item.stats[0].value, 15);
        assert_eq!(item.stats[1].value, 30);
    }

    #[test]
    fn test_fire_resistance() {
        let mut existing = ItemRecord::new(7, "Plain Boots");
        existing.resistances.fire = 10;
        assert_eq!(existing.apply_fire_resistance(), Some(15));

        let mut themed = ItemRecord::new(8, "Molten Chestguard");
        themed.inventory_type = 5;
        assert_eq!(themed.apply_fire_resistance(), Some(25));

        let mut plain = ItemRecord::new(9, "Plain Boots");
        assert_eq!(plain.apply_fire_resistance(), None);
    }

    #[test]
    fn test_difficulty_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let prefix = difficulty_prefix(4, &mut rng).unwrap();
        assert!(LEGENDARY_PREFIXES.contains(&prefix));
        assert!(difficulty_prefix(2, &mut rng).is_none());
    }
}
