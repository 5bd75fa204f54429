//! Armor value scaling.

use crate::error::Result;
use crate::models::ItemRecord;
use crate::stats::{material_multiplier, quality_multiplier, ITEM_CLASS_ARMOR};
use tracing::{debug, warn};

/// Armor for an item level, quality and armor subclass, or `None` when the
/// subclass has no material multiplier.
pub fn armor_value(item_level: i32, quality: i32, subclass: i32) -> Option<i32> {
    let material = material_multiplier(subclass)?;
    Some((item_level as f64 * quality_multiplier(quality) * material).ceil() as i32)
}

impl ItemRecord {
    /// Rescale armor for `item_level`. Only armor class items that already
    /// carry armor are touched. Returns whether the value changed.
    pub fn scale_armor(&mut self, item_level: i32) -> Result<bool> {
        if self.class != ITEM_CLASS_ARMOR || self.armor <= 0 {
            return Ok(false);
        }
        let quality = self.quality_or_err()?;
        let subclass = self.subclass_or_err()?;

        match armor_value(item_level, quality, subclass) {
            Some(armor) => {
                debug!("Armor for {} scaled from {} to {}", self.entry, self.armor, armor);
                self.armor = armor;
                Ok(true)
            }
            None => {
                warn!("No material multiplier for armor subclass {} on item {}", subclass, self.entry);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ARMOR_PLATE;

    fn plate(armor: i32) -> ItemRecord {
        let mut item = ItemRecord::new(300, "Test Breastplate");
        item.class = ITEM_CLASS_ARMOR;
        item.subclass = Some(ARMOR_PLATE);
        item.quality = Some(4);
        item.armor = armor;
        item
    }

    #[test]
    fn test_epic_plate_at_200() {
        let mut item = plate(900);
        assert!(item.scale_armor(200).unwrap());
        assert_eq!(item.armor, 2700);
    }

    #[test]
    fn test_reapplying_is_stable() {
        let mut item = plate(900);
        item.scale_armor(200).unwrap();
        let first = item.armor;
        item.scale_armor(200).unwrap();
        assert_eq!(item.armor, first);
    }

    #[test]
    fn test_zero_armor_is_left_alone() {
        let mut item = plate(0);
        assert!(!item.scale_armor(200).unwrap());
        assert_eq!(item.armor, 0);
    }

    #[test]
    fn test_unknown_material() {
        assert_eq!(armor_value(100, 4, 5), None);
        let mut item = plate(100);
        item.subclass = Some(5);
        assert!(!item.scale_armor(200).unwrap());
        assert_eq!(item.armor, 100);
    }
}
