//! Class-role classification.
//!
//! An item's role is inferred from its stats first, then from its armor or
//! weapon subclass, and finally from whichever primary stat it carries.

use crate::error::{EndgameError, Result};
use crate::models::ItemRecord;
use crate::stats::{stat, ARMOR_CLOTH, ARMOR_LEATHER, ARMOR_MAIL, ARMOR_PLATE, ITEM_CLASS_ARMOR, ITEM_CLASS_WEAPON};
use serde::{Deserialize, Serialize};
use std::fmt;

const INV_CLOAK: i32 = 16;

/// Gameplay archetype that would use an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassRole {
    StrengthMelee = 1,
    AgilityMelee = 2,
    Ranged = 3,
    Mage = 4,
    Healer = 5,
    Tank = 6,
    Generic = 7,
}

impl ClassRole {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::StrengthMelee),
            2 => Ok(Self::AgilityMelee),
            3 => Ok(Self::Ranged),
            4 => Ok(Self::Mage),
            5 => Ok(Self::Healer),
            6 => Ok(Self::Tank),
            7 => Ok(Self::Generic),
            other => Err(EndgameError::InvalidDomain(format!("unknown class role {}", other))),
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StrengthMelee => "Strength Melee",
            Self::AgilityMelee => "Agility Melee",
            Self::Ranged => "Ranged",
            Self::Mage => "Mage",
            Self::Healer => "Healer",
            Self::Tank => "Tank",
            Self::Generic => "Generic",
        }
    }

    pub fn is_caster(self) -> bool {
        matches!(self, Self::Mage | Self::Healer)
    }
}

impl fmt::Display for ClassRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ItemRecord {
    fn carries_any(&self, stat_types: &[i32]) -> bool {
        self.occupied_stats().any(|s| stat_types.contains(&s.stat_type))
    }

    /// Infer the role that would use this item.
    pub fn classify(&self) -> ClassRole {
        if self.carries_any(&[
            stat::PARRY_RATING,
            stat::DEFENSE_RATING,
            stat::BLOCK_RATING,
            stat::BLOCK_VALUE,
        ]) {
            return ClassRole::Tank;
        }
        if self.carries_any(&[stat::MANA_REGENERATION, stat::SPELL_HEALING_DONE]) {
            return ClassRole::Healer;
        }
        if self.carries_any(&[stat::SPELL_PENETRATION]) {
            return ClassRole::Mage;
        }
        if self.carries_any(&[
            stat::RANGED_ATTACK_POWER,
            stat::CRIT_RANGED_RATING,
            stat::HIT_RANGED_RATING,
        ]) {
            return ClassRole::Ranged;
        }

        if let Some(role) = self.subclass.and_then(|subclass| self.classify_by_subclass(subclass)) {
            return role;
        }

        let cascade: [(&[i32], ClassRole); 7] = [
            (&[stat::SPIRIT], ClassRole::Healer),
            (&[stat::INTELLECT], ClassRole::Mage),
            (&[stat::STRENGTH], ClassRole::StrengthMelee),
            (&[stat::AGILITY], ClassRole::AgilityMelee),
            (
                &[stat::ATTACK_POWER, stat::HASTE_MELEE_RATING, stat::CRIT_MELEE_RATING],
                ClassRole::AgilityMelee,
            ),
            (
                &[stat::SPELL_POWER, stat::CRIT_SPELL_RATING, stat::HIT_SPELL_RATING],
                ClassRole::Mage,
            ),
            (
                &[stat::RANGED_ATTACK_POWER, stat::HASTE_RANGED_RATING, stat::CRIT_RANGED_RATING],
                ClassRole::Ranged,
            ),
        ];
        if let Some((_, role)) = cascade.iter().find(|(stat_types, _)| self.carries_any(stat_types)) {
            return *role;
        }

        if self.class == ITEM_CLASS_ARMOR {
            match self.subclass {
                Some(ARMOR_CLOTH) => return ClassRole::Mage,
                Some(ARMOR_PLATE) => return ClassRole::StrengthMelee,
                Some(ARMOR_LEATHER) | Some(ARMOR_MAIL) => return ClassRole::AgilityMelee,
                _ => {}
            }
        }
        ClassRole::Generic
    }

    fn classify_by_subclass(&self, subclass: i32) -> Option<ClassRole> {
        if self.class == ITEM_CLASS_ARMOR {
            return match subclass {
                ARMOR_CLOTH if self.inventory_type != INV_CLOAK => Some(ClassRole::Mage),
                ARMOR_PLATE => Some(ClassRole::StrengthMelee),
                ARMOR_LEATHER | ARMOR_MAIL => {
                    if self.carries_any(&[
                        stat::SPELL_POWER,
                        stat::CRIT_SPELL_RATING,
                        stat::HIT_SPELL_RATING,
                        stat::INTELLECT,
                        stat::SPIRIT,
                    ]) {
                        Some(ClassRole::Mage)
                    } else {
                        Some(ClassRole::AgilityMelee)
                    }
                }
                _ => None,
            };
        }

        if self.class == ITEM_CLASS_WEAPON {
            return match subclass {
                // Fist weapons and thrown.
                13 | 16 => Some(ClassRole::AgilityMelee),
                19 => Some(ClassRole::Mage),
                // Polearms and spears.
                6 | 17 => {
                    if self.carries_any(&[stat::STRENGTH, stat::ATTACK_POWER]) {
                        Some(ClassRole::StrengthMelee)
                    } else if self.carries_any(&[stat::AGILITY]) {
                        Some(ClassRole::AgilityMelee)
                    } else {
                        Some(ClassRole::Healer)
                    }
                }
                // Bows, guns and crossbows.
                2 | 3 | 18 => {
                    if self.carries_any(&[stat::STRENGTH]) {
                        Some(ClassRole::StrengthMelee)
                    } else {
                        Some(ClassRole::Ranged)
                    }
                }
                _ => None,
            };
        }
        None
    }
}
