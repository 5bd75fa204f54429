//! Data models for item and spell records.

use crate::error::{EndgameError, Result};
use serde::{Deserialize, Serialize};

pub const STAT_SLOT_COUNT: usize = 10;
pub const SPELL_SLOT_COUNT: usize = 3;
pub const SPELL_EFFECT_COUNT: usize = 3;

/// One physical (type, value) stat slot. Type 0 marks the slot as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatSlot {
    pub stat_type: i32,
    pub value: i32,
}

impl StatSlot {
    pub fn new(stat_type: i32, value: i32) -> Self {
        Self { stat_type, value }
    }

    pub fn is_empty(&self) -> bool {
        self.stat_type == 0
    }
}

/// A spell reference attached to an item. Id 0 marks the slot as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellSlot {
    pub spell_id: i32,
    pub trigger: i32,
}

impl SpellSlot {
    pub fn is_empty(&self) -> bool {
        self.spell_id <= 0
    }
}

/// Elemental resistances carried by an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resistances {
    pub holy: i32,
    pub fire: i32,
    pub nature: i32,
    pub frost: i32,
    pub shadow: i32,
    pub arcane: i32,
}

/// Working copy of an item. Plain value semantics: cloning yields a fully
/// independent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub entry: i32,
    pub name: String,
    pub class: i32,
    pub subclass: Option<i32>,
    pub inventory_type: i32,
    pub material: i32,
    pub item_level: Option<i32>,
    pub quality: Option<i32>,
    pub stats: [StatSlot; STAT_SLOT_COUNT],
    pub stats_count: i32,
    pub spells: [SpellSlot; SPELL_SLOT_COUNT],
    pub armor: i32,
    pub min_dmg1: f64,
    pub max_dmg1: f64,
    pub min_dmg2: f64,
    pub max_dmg2: f64,
    /// Weapon speed in milliseconds.
    pub delay: Option<i32>,
    pub resistances: Resistances,
    /// Difficulty tier the item is being generated for. Not part of the
    /// source data.
    #[serde(default)]
    pub difficulty: i32,
}

impl ItemRecord {
    pub fn new(entry: i32, name: impl Into<String>) -> Self {
        Self {
            entry,
            name: name.into(),
            class: 0,
            subclass: None,
            inventory_type: 0,
            material: 0,
            item_level: None,
            quality: None,
            stats: [StatSlot::default(); STAT_SLOT_COUNT],
            stats_count: 0,
            spells: [SpellSlot::default(); SPELL_SLOT_COUNT],
            armor: 0,
            min_dmg1: 0.0,
            max_dmg1: 0.0,
            min_dmg2: 0.0,
            max_dmg2: 0.0,
            delay: None,
            resistances: Resistances::default(),
            difficulty: 0,
        }
    }

    pub fn stat(&self, index: usize) -> Option<&StatSlot> {
        self.stats.get(index)
    }

    pub fn set_stat(&mut self, index: usize, slot: StatSlot) -> Result<()> {
        let target = self.stats.get_mut(index).ok_or_else(|| {
            EndgameError::InvalidDomain(format!("stat slot {} out of range", index))
        })?;
        *target = slot;
        Ok(())
    }

    pub fn spell(&self, index: usize) -> Option<&SpellSlot> {
        self.spells.get(index)
    }

    pub fn set_spell(&mut self, index: usize, slot: SpellSlot) -> Result<()> {
        let target = self.spells.get_mut(index).ok_or_else(|| {
            EndgameError::InvalidDomain(format!("spell slot {} out of range", index))
        })?;
        *target = slot;
        Ok(())
    }

    /// Non-empty stat slots in slot order.
    pub fn occupied_stats(&self) -> impl Iterator<Item = &StatSlot> {
        self.stats.iter().filter(|s| !s.is_empty())
    }

    /// Value of the first slot carrying `stat_type`.
    pub fn stat_value(&self, stat_type: i32) -> Option<i32> {
        self.occupied_stats()
            .find(|s| s.stat_type == stat_type)
            .map(|s| s.value)
    }

    pub fn has_stat(&self, stat_type: i32) -> bool {
        self.occupied_stats().any(|s| s.stat_type == stat_type)
    }

    pub fn item_level_or_err(&self) -> Result<i32> {
        self.item_level
            .ok_or_else(|| EndgameError::MissingField(format!("item_level on item {}", self.entry)))
    }

    pub fn quality_or_err(&self) -> Result<i32> {
        self.quality
            .ok_or_else(|| EndgameError::MissingField(format!("quality on item {}", self.entry)))
    }

    pub fn subclass_or_err(&self) -> Result<i32> {
        self.subclass
            .ok_or_else(|| EndgameError::MissingField(format!("subclass on item {}", self.entry)))
    }

    pub fn delay_or_err(&self) -> Result<i32> {
        self.delay
            .ok_or_else(|| EndgameError::MissingField(format!("delay on item {}", self.entry)))
    }
}

/// One of a spell's three effect descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpellEffect {
    pub effect: i32,
    pub base_points: i32,
    pub die_sides: i32,
    pub aura: i32,
    pub bonus_multiplier: f64,
}

impl SpellEffect {
    /// Deterministic maximum magnitude of the effect.
    pub fn max_value(&self) -> i32 {
        if self.base_points < 0 {
            self.base_points - self.die_sides
        } else {
            self.base_points + self.die_sides
        }
    }
}

/// A spell definition as read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellRecord {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub aura_description: String,
    pub effects: [SpellEffect; SPELL_EFFECT_COUNT],
}

impl SpellRecord {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            aura_description: String::new(),
            effects: [SpellEffect::default(); SPELL_EFFECT_COUNT],
        }
    }
}

/// Inclusive item level window for reference lookups. A bound of 0 is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelBand {
    pub min: i32,
    pub max: i32,
}

impl LevelBand {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, item_level: i32) -> bool {
        (self.min == 0 || item_level >= self.min) && (self.max == 0 || item_level <= self.max)
    }
}
