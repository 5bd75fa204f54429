//! Weapon damage scaling.

use crate::error::{EndgameError, Result};
use crate::models::ItemRecord;
use crate::stats::quality_multiplier;

/// Minimum damage as a percentage of the per-hit baseline.
pub const MIN_DAMAGE_SPREAD: f64 = 70.0;
/// Maximum damage as a percentage of the per-hit baseline.
pub const MAX_DAMAGE_SPREAD: f64 = 135.0;
/// Share of secondary damage taken back out of the primary range.
pub const SECONDARY_DAMAGE_OFFSET: f64 = 0.85;
const DPS_LEVEL_EXPONENT: f64 = 1.012;

/// Weapon type modifier keyed by weapon subclass.
pub fn weapon_type_modifier(subclass: i32) -> Result<f64> {
    match subclass {
        0 | 4 | 7 | 13 | 15 => Ok(0.58),
        1 | 5 | 6 | 8 | 10 | 17 => Ok(0.85),
        2 | 3 | 16 | 18 => Ok(0.70),
        19 => Ok(0.70),
        other => Err(EndgameError::InvalidDomain(format!(
            "subclass {} is not a weapon",
            other
        ))),
    }
}

/// Average DPS a weapon should reach at `new_level` when scaled from `old_level`.
pub fn target_dps(modifier: f64, old_level: i32, new_level: i32) -> f64 {
    let scaling = (new_level as f64 / old_level as f64).powf(DPS_LEVEL_EXPONENT);
    modifier * new_level as f64 * scaling
}

/// DPS the rolled damage range averages out to for a given target, before
/// the min/max rounding.
pub fn expected_dps(target: f64) -> f64 {
    target * (MIN_DAMAGE_SPREAD + MAX_DAMAGE_SPREAD) / 200.0
}

impl ItemRecord {
    pub fn dps_modifier(&self) -> Result<f64> {
        let subclass = self.subclass_or_err()?;
        let quality = self.quality_or_err()?;
        Ok(quality_multiplier(quality) * weapon_type_modifier(subclass)?)
    }

    /// Weapon speed, which must be present and positive.
    pub fn weapon_delay(&self) -> Result<i32> {
        let delay = self.delay_or_err()?;
        if delay <= 0 {
            return Err(EndgameError::InvalidDomain(format!(
                "item {} has delay {}",
                self.entry, delay
            )));
        }
        Ok(delay)
    }

    /// Current average DPS from primary damage and weapon speed, rounded to
    /// two decimals.
    pub fn dps(&self) -> Result<f64> {
        let delay = self.weapon_delay()?;
        let seconds = delay as f64 / 1000.0;
        Ok((((self.min_dmg1 + self.max_dmg1) / 2.0) / seconds * 100.0).round() / 100.0)
    }

    /// Rewrite the damage ranges for `new_level` and return the resulting DPS.
    pub fn scale_dps(&mut self, old_level: i32, new_level: i32) -> Result<f64> {
        let delay = self.weapon_delay()?;
        let modifier = self.dps_modifier()?;
        if old_level <= 0 {
            return Err(EndgameError::InvalidDomain(format!(
                "cannot scale DPS from item level {}",
                old_level
            )));
        }

        let per_hit = target_dps(modifier, old_level, new_level) * (delay as f64 / 1000.0) / 100.0;
        let mut minimum = per_hit * MIN_DAMAGE_SPREAD;
        let mut maximum = per_hit * MAX_DAMAGE_SPREAD;

        if self.min_dmg2 != 0.0 && self.max_dmg2 != 0.0 && self.min_dmg1 != 0.0 && self.max_dmg1 != 0.0 {
            let min2 = (self.min_dmg2 / self.min_dmg1 * minimum).ceil();
            let max2 = (self.max_dmg2 / self.max_dmg1 * maximum).ceil();
            self.min_dmg2 = min2;
            self.max_dmg2 = max2;
            minimum -= min2 * SECONDARY_DAMAGE_OFFSET;
            maximum -= max2 * SECONDARY_DAMAGE_OFFSET;
        }

        self.min_dmg1 = minimum.ceil();
        self.max_dmg1 = maximum.ceil();
        self.dps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ITEM_CLASS_WEAPON;

    fn sword() -> ItemRecord {
        let mut item = ItemRecord::new(200, "Test Sword");
        item.class = ITEM_CLASS_WEAPON;
        item.subclass = Some(7);
        item.quality = Some(2);
        item.item_level = Some(60);
        item.min_dmg1 = 50.0;
        item.max_dmg1 = 70.0;
        item.delay = Some(3000);
        item
    }

    #[test]
    fn test_weapon_type_modifiers() {
        assert_eq!(weapon_type_modifier(7).unwrap(), 0.58);
        assert_eq!(weapon_type_modifier(8).unwrap(), 0.85);
        assert_eq!(weapon_type_modifier(19).unwrap(), 0.70);
        assert!(matches!(weapon_type_modifier(14), Err(EndgameError::InvalidDomain(_))));
    }

    #[test]
    fn test_current_dps() {
        assert_eq!(sword().dps().unwrap(), 20.0);
    }

    #[test]
    fn test_scaled_sword_matches_target() {
        let mut item = sword();
        let modifier = item.dps_modifier().unwrap();
        let target = target_dps(modifier, 60, 70);
        let dps = item.scale_dps(60, 70).unwrap();

        assert!(dps >= target * MIN_DAMAGE_SPREAD / 100.0);
        assert!(dps <= target * MAX_DAMAGE_SPREAD / 100.0);
        // Each ceil adds at most one point per hit.
        let tolerance = 1.0 / 3.0 + 0.01;
        assert!((dps - expected_dps(target)).abs() <= tolerance);
        assert!(item.min_dmg1 < item.max_dmg1);
    }

    #[test]
    fn test_secondary_damage_keeps_ratio() {
        let mut item = sword();
        item.min_dmg2 = 10.0;
        item.max_dmg2 = 14.0;
        item.scale_dps(60, 70).unwrap();
        let ratio = item.min_dmg2 / (item.min_dmg1 + item.min_dmg2 * SECONDARY_DAMAGE_OFFSET);
        assert!((ratio - 0.2).abs() < 0.02);
    }

    #[test]
    fn test_scaling_requires_delay() {
        let mut item = sword();
        item.delay = None;
        assert!(matches!(item.scale_dps(60, 70), Err(EndgameError::MissingField(_))));
    }

    #[test]
    fn test_zero_delay_is_rejected_before_rewrite() {
        let mut item = sword();
        item.delay = Some(0);
        assert!(matches!(item.weapon_delay(), Err(EndgameError::InvalidDomain(_))));
        assert!(item.scale_dps(60, 70).is_err());
        assert_eq!(item.min_dmg1, 50.0);
        assert_eq!(item.max_dmg1, 70.0);
    }
}
