//! CSV ingestion for item and spell records.

use crate::database::Database;
use crate::error::Result;
use crate::models::{ItemRecord, Resistances, SpellEffect, SpellRecord, SpellSlot, StatSlot};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// One item row as exported from the world database.
#[derive(Debug, Deserialize)]
pub struct ItemRow {
    pub entry: i32,
    pub name: String,
    pub class: i32,
    pub subclass: Option<i32>,
    #[serde(default)]
    pub inventory_type: i32,
    #[serde(default)]
    pub material: i32,
    pub item_level: Option<i32>,
    pub quality: Option<i32>,
    #[serde(default)]
    pub stat_type1: i32,
    #[serde(default)]
    pub stat_value1: i32,
    #[serde(default)]
    pub stat_type2: i32,
    #[serde(default)]
    pub stat_value2: i32,
    #[serde(default)]
    pub stat_type3: i32,
    #[serde(default)]
    pub stat_value3: i32,
    #[serde(default)]
    pub stat_type4: i32,
    #[serde(default)]
    pub stat_value4: i32,
    #[serde(default)]
    pub stat_type5: i32,
    #[serde(default)]
    pub stat_value5: i32,
    #[serde(default)]
    pub stat_type6: i32,
    #[serde(default)]
    pub stat_value6: i32,
    #[serde(default)]
    pub stat_type7: i32,
    #[serde(default)]
    pub stat_value7: i32,
    #[serde(default)]
    pub stat_type8: i32,
    #[serde(default)]
    pub stat_value8: i32,
    #[serde(default)]
    pub stat_type9: i32,
    #[serde(default)]
    pub stat_value9: i32,
    #[serde(default)]
    pub stat_type10: i32,
    #[serde(default)]
    pub stat_value10: i32,
    #[serde(default)]
    pub spell_id1: i32,
    #[serde(default)]
    pub spell_trigger1: i32,
    #[serde(default)]
    pub spell_id2: i32,
    #[serde(default)]
    pub spell_trigger2: i32,
    #[serde(default)]
    pub spell_id3: i32,
    #[serde(default)]
    pub spell_trigger3: i32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub min_dmg1: f64,
    #[serde(default)]
    pub max_dmg1: f64,
    #[serde(default)]
    pub min_dmg2: f64,
    #[serde(default)]
    pub max_dmg2: f64,
    pub delay: Option<i32>,
    #[serde(default)]
    pub holy_res: i32,
    #[serde(default)]
    pub fire_res: i32,
    #[serde(default)]
    pub nature_res: i32,
    #[serde(default)]
    pub frost_res: i32,
    #[serde(default)]
    pub shadow_res: i32,
    #[serde(default)]
    pub arcane_res: i32,
    #[serde(default)]
    pub display_id: i32,
    #[serde(default)]
    pub required_level: i32,
    #[serde(default)]
    pub sell_price: i64,
}

impl ItemRow {
    pub fn into_record(self) -> ItemRecord {
        let stat_pairs = [
            (self.stat_type1, self.stat_value1),
            (self.stat_type2, self.stat_value2),
            (self.stat_type3, self.stat_value3),
            (self.stat_type4, self.stat_value4),
            (self.stat_type5, self.stat_value5),
            (self.stat_type6, self.stat_value6),
            (self.stat_type7, self.stat_value7),
            (self.stat_type8, self.stat_value8),
            (self.stat_type9, self.stat_value9),
            (self.stat_type10, self.stat_value10),
        ];

        let mut item = ItemRecord::new(self.entry, self.name);
        item.class = self.class;
        item.subclass = self.subclass;
        item.inventory_type = self.inventory_type;
        item.material = self.material;
        item.item_level = self.item_level;
        item.quality = self.quality;
        item.stats = stat_pairs.map(|(stat_type, value)| StatSlot::new(stat_type, value));
        item.stats_count = item.occupied_stats().count() as i32;
        item.spells = [
            SpellSlot { spell_id: self.spell_id1, trigger: self.spell_trigger1 },
            SpellSlot { spell_id: self.spell_id2, trigger: self.spell_trigger2 },
            SpellSlot { spell_id: self.spell_id3, trigger: self.spell_trigger3 },
        ];
        item.armor = self.armor;
        item.min_dmg1 = self.min_dmg1;
        item.max_dmg1 = self.max_dmg1;
        item.min_dmg2 = self.min_dmg2;
        item.max_dmg2 = self.max_dmg2;
        item.delay = self.delay;
        item.resistances = Resistances {
            holy: self.holy_res,
            fire: self.fire_res,
            nature: self.nature_res,
            frost: self.frost_res,
            shadow: self.shadow_res,
            arcane: self.arcane_res,
        };
        item
    }
}

/// One spell row as exported from the spell store.
#[derive(Debug, Deserialize)]
pub struct SpellRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aura_description: String,
    #[serde(default)]
    pub effect1: i32,
    #[serde(default)]
    pub effect2: i32,
    #[serde(default)]
    pub effect3: i32,
    #[serde(default)]
    pub base_points1: i32,
    #[serde(default)]
    pub base_points2: i32,
    #[serde(default)]
    pub base_points3: i32,
    #[serde(default)]
    pub die_sides1: i32,
    #[serde(default)]
    pub die_sides2: i32,
    #[serde(default)]
    pub die_sides3: i32,
    #[serde(default)]
    pub aura1: i32,
    #[serde(default)]
    pub aura2: i32,
    #[serde(default)]
    pub aura3: i32,
    #[serde(default)]
    pub bonus_multiplier1: f64,
    #[serde(default)]
    pub bonus_multiplier2: f64,
    #[serde(default)]
    pub bonus_multiplier3: f64,
}

impl SpellRow {
    pub fn into_record(self) -> SpellRecord {
        let mut spell = SpellRecord::new(self.id, self.name);
        spell.description = self.description;
        spell.aura_description = self.aura_description;
        spell.effects = [
            SpellEffect {
                effect: self.effect1,
                base_points: self.base_points1,
                die_sides: self.die_sides1,
                aura: self.aura1,
                bonus_multiplier: self.bonus_multiplier1,
            },
            SpellEffect {
                effect: self.effect2,
                base_points: self.base_points2,
                die_sides: self.die_sides2,
                aura: self.aura2,
                bonus_multiplier: self.bonus_multiplier2,
            },
            SpellEffect {
                effect: self.effect3,
                base_points: self.base_points3,
                die_sides: self.die_sides3,
                aura: self.aura3,
                bonus_multiplier: self.bonus_multiplier3,
            },
        ];
        spell
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: usize,
}

/// Import items from a headered CSV file. Malformed rows are logged and
/// skipped.
pub fn import_items_csv(db: &Database, path: &Path, quiet: u8) -> Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut summary = ImportSummary::default();
    let mut items = Vec::new();
    let mut extras = Vec::new();

    for (line, row) in reader.deserialize::<ItemRow>().enumerate() {
        summary.total_rows += 1;
        match row {
            Ok(row) => {
                extras.push((row.entry, row.display_id, row.required_level, row.sell_price));
                items.push(row.into_record());
            }
            Err(e) => {
                if quiet < 2 {
                    warn!("Skipping item row {} in {}: {}", line + 2, path.display(), e);
                }
                summary.skipped += 1;
            }
        }
    }

    summary.imported = db.insert_or_update_items(&items)?;
    for (entry, display_id, required_level, sell_price) in extras {
        db.update_item_extras(entry, display_id, required_level, sell_price)?;
    }

    if quiet == 0 {
        info!(
            "Imported {} items from {} ({} skipped)",
            summary.imported,
            path.display(),
            summary.skipped
        );
    }
    Ok(summary)
}

/// Import spells from a headered CSV file. Malformed rows are logged and
/// skipped.
pub fn import_spells_csv(db: &Database, path: &Path, quiet: u8) -> Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut summary = ImportSummary::default();
    let mut spells = Vec::new();

    for (line, row) in reader.deserialize::<SpellRow>().enumerate() {
        summary.total_rows += 1;
        match row {
            Ok(row) => spells.push(row.into_record()),
            Err(e) => {
                if quiet < 2 {
                    warn!("Skipping spell row {} in {}: {}", line + 2, path.display(), e);
                }
                summary.skipped += 1;
            }
        }
    }

    summary.imported = db.insert_or_update_spells(&spells)?;

    if quiet == 0 {
        info!(
            "Imported {} spells from {} ({} skipped)",
            summary.imported,
            path.display(),
            summary.skipped
        );
    }
    Ok(summary)
}
