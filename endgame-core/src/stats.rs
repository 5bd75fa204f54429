//! Static stat model: stat identifiers and the modifier tables every scaler reads.
//!
//! All lookups are total. Keys the tables do not know fall back to a neutral
//! value (usually 1.0) so that new stat types coming from source data never
//! abort a scaling pass.

/// Stat type identifiers as stored in item stat slots.
pub mod stat {
    pub const MANA: i32 = 0;
    pub const HEALTH: i32 = 1;
    pub const AGILITY: i32 = 3;
    pub const STRENGTH: i32 = 4;
    pub const INTELLECT: i32 = 5;
    pub const SPIRIT: i32 = 6;
    pub const STAMINA: i32 = 7;
    pub const DEFENSE_RATING: i32 = 12;
    pub const DODGE_RATING: i32 = 13;
    pub const PARRY_RATING: i32 = 14;
    pub const BLOCK_RATING: i32 = 15;
    pub const HIT_MELEE_RATING: i32 = 16;
    pub const HIT_RANGED_RATING: i32 = 17;
    pub const HIT_SPELL_RATING: i32 = 18;
    pub const CRIT_MELEE_RATING: i32 = 19;
    pub const CRIT_RANGED_RATING: i32 = 20;
    pub const CRIT_SPELL_RATING: i32 = 21;
    pub const HASTE_MELEE_RATING: i32 = 28;
    pub const HASTE_RANGED_RATING: i32 = 29;
    pub const HASTE_SPELL_RATING: i32 = 30;
    pub const HIT_RATING: i32 = 31;
    pub const CRIT_RATING: i32 = 32;
    pub const RESILIENCE_RATING: i32 = 35;
    pub const HASTE_RATING: i32 = 36;
    pub const EXPERTISE_RATING: i32 = 37;
    pub const ATTACK_POWER: i32 = 38;
    pub const RANGED_ATTACK_POWER: i32 = 39;
    pub const FERAL_ATTACK_POWER: i32 = 40;
    pub const SPELL_HEALING_DONE: i32 = 41;
    pub const SPELL_DAMAGE_DONE: i32 = 42;
    pub const MANA_REGENERATION: i32 = 43;
    pub const ARMOR_PENETRATION: i32 = 44;
    pub const SPELL_POWER: i32 = 45;
    pub const HEALTH_REGEN: i32 = 46;
    pub const SPELL_PENETRATION: i32 = 47;
    pub const BLOCK_VALUE: i32 = 48;
}

/// Item classes used by the scalers.
pub const ITEM_CLASS_WEAPON: i32 = 2;
pub const ITEM_CLASS_ARMOR: i32 = 4;

/// Armor subclasses.
pub const ARMOR_CLOTH: i32 = 1;
pub const ARMOR_LEATHER: i32 = 2;
pub const ARMOR_MAIL: i32 = 3;
pub const ARMOR_PLATE: i32 = 4;

/// Difficulty tiers.
pub const DIFFICULTY_MYTHIC: i32 = 3;
pub const DIFFICULTY_LEGENDARY: i32 = 4;
pub const DIFFICULTY_ASCENDANT: i32 = 5;

/// Multiplier that pulls low spell power rolls up to attack power levels.
pub const SPELL_POWER_FLOOR_MULTIPLIER: f64 = 2.3785;
/// Spell power below this value receives the floor multiplier.
pub const SPELL_POWER_FLOOR: i32 = 100;
/// Level ratio bias applied to every stat rescale.
pub const LEVEL_RATIO_BIAS: f64 = 1.0795;
/// Quality factor used outside the mythic tier for legendary items.
pub const LEGENDARY_OFF_TIER_FACTOR: f64 = 1.25;
/// Bonus applied with tier modifiers to lift older gear.
pub const CATCH_UP_BONUS: f64 = 1.5;

pub const MANA_REGEN_DAMPENER: f64 = 0.85;
pub const DEFENSE_DAMPENER: f64 = 0.85;
pub const DEFENSE_SECOND_DAMPENER: f64 = 0.75;
pub const DODGE_DAMPENER: f64 = 0.75;
pub const HIT_DAMPENER: f64 = 0.65;

/// Price of one point of a stat relative to a primary stat.
pub fn cost_modifier(stat_type: i32) -> f64 {
    match stat_type {
        38..=42 => 0.5,
        43 => 2.5,
        45 => 0.5,
        47 => 2.0,
        48 => 0.65,
        _ => 1.0,
    }
}

/// Budget multiplier for item quality (Common 0 through Artifact 5).
pub fn quality_multiplier(quality: i32) -> f64 {
    match quality {
        1 => 1.1,
        2 => 1.2,
        3 => 1.3,
        4 => 1.5,
        5 => 1.7,
        _ => 1.0,
    }
}

/// Armor material multiplier keyed by armor subclass.
pub fn material_multiplier(subclass: i32) -> Option<f64> {
    match subclass {
        1 => Some(1.2),
        2 => Some(2.2),
        3 => Some(4.75),
        4 => Some(9.0),
        6 => Some(20.0),
        _ => None,
    }
}

/// Share of the item budget a given inventory slot receives.
pub fn slot_multiplier(inventory_type: i32) -> f64 {
    match inventory_type {
        1 => 0.813,
        3 => 0.75,
        6 => 0.562,
        7 => 0.875,
        8 => 0.688,
        9 => 0.437,
        10 => 0.625,
        13 | 22 => 0.42,
        14 | 16 | 23 => 0.56,
        15 | 25 | 26 => 0.32,
        _ => 1.0,
    }
}

/// Exponent applied to the level ratio when a stat is rescaled.
pub fn scaling_exponent(stat_type: i32) -> f64 {
    match stat_type {
        stat::ATTACK_POWER | stat::RANGED_ATTACK_POWER => 1.10,
        stat::SPELL_POWER => 1.05,
        stat::MANA_REGENERATION => 0.90,
        12..=37 | stat::ARMOR_PENETRATION => 0.95,
        _ => 1.0,
    }
}

/// Gear phase multiplier used by tier modifiers and spell force-scaling.
pub fn tier_modifier(tier: i32) -> f64 {
    match tier {
        2 => 1.1,
        3 => 1.2,
        4 => 1.3,
        5 => 1.4,
        _ => 1.0,
    }
}

/// Item level an item is scaled to for a given difficulty.
pub fn difficulty_start_level(difficulty: i32) -> Option<i32> {
    match difficulty {
        DIFFICULTY_MYTHIC => Some(280),
        DIFFICULTY_LEGENDARY => Some(305),
        DIFFICULTY_ASCENDANT => Some(330),
        _ => None,
    }
}

/// Offset added to an item entry when a generated copy is stored.
pub fn item_entry_bump(difficulty: i32) -> i32 {
    match difficulty {
        DIFFICULTY_LEGENDARY => 21_000_000,
        DIFFICULTY_ASCENDANT => 22_000_000,
        _ => 20_000_000,
    }
}

/// Offset added to a spell id when a scaled copy is stored. Each quality owns
/// a disjoint range so copies never collide.
pub fn spell_id_bump(quality: i32) -> i32 {
    match quality {
        4 => 31_000_000,
        5 => 32_000_000,
        _ => 30_000_000,
    }
}

/// Coarse tier band derived from an item level.
pub fn tier_for_item_level(item_level: i32) -> i32 {
    match item_level {
        l if l >= 200 => 5,
        l if l >= 175 => 4,
        l if l >= 150 => 3,
        l if l >= 125 => 2,
        _ => 1,
    }
}

pub fn stat_name(stat_type: i32) -> &'static str {
    match stat_type {
        0 => "Mana",
        1 => "Health",
        3 => "Agility",
        4 => "Strength",
        5 => "Intellect",
        6 => "Spirit",
        7 => "Stamina",
        12 => "Defense Rating",
        13 => "Dodge Rating",
        14 => "Parry Rating",
        15 => "Block Rating",
        16 => "Melee Hit Rating",
        17 => "Ranged Hit Rating",
        18 => "Spell Hit Rating",
        19 => "Melee Crit Rating",
        20 => "Ranged Crit Rating",
        21 => "Spell Crit Rating",
        28 => "Melee Haste Rating",
        29 => "Ranged Haste Rating",
        30 => "Spell Haste Rating",
        31 => "Hit Rating",
        32 => "Crit Rating",
        35 => "Resilience Rating",
        36 => "Haste Rating",
        37 => "Expertise Rating",
        38 => "Attack Power",
        39 => "Ranged Attack Power",
        40 => "Feral Attack Power",
        41 => "Spell Healing Done",
        42 => "Spell Damage Done",
        43 => "Mana Regeneration",
        44 => "Armor Penetration",
        45 => "Spell Power",
        46 => "Health Regeneration",
        47 => "Spell Penetration",
        48 => "Block Value",
        _ => "Unknown",
    }
}
