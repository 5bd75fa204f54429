//! Storage collaborator used by the scalers and generators.

use crate::error::Result;
use crate::models::{ItemRecord, LevelBand, SpellRecord};

/// Record access the scaling pipeline needs. Upserts overwrite by identity and
/// leave fields the core does not model untouched.
pub trait ItemStore {
    fn fetch_item(&self, entry: i32) -> Result<ItemRecord>;

    fn fetch_spell(&self, id: i32) -> Result<SpellRecord>;

    /// Items of the same class and subclass to borrow a stat layout from.
    fn fetch_candidate_reference_items(
        &self,
        class: i32,
        subclass: i32,
        band: LevelBand,
    ) -> Result<Vec<ItemRecord>>;

    fn persist_item(&self, item: &ItemRecord) -> Result<()>;

    fn persist_spell(&self, spell: &SpellRecord) -> Result<()>;

    /// Duplicate an item row under a new entry.
    fn copy_item(&self, source: i32, dest: i32) -> Result<()>;

    /// Duplicate a spell row under a new id.
    fn copy_spell(&self, source: i32, dest: i32) -> Result<()>;

    /// Persist a scaled item together with the spell copies it references.
    fn persist_scaled(&self, item: &ItemRecord, spells: &[SpellRecord]) -> Result<()> {
        for spell in spells {
            self.persist_spell(spell)?;
        }
        self.persist_item(item)
    }

    /// Copy the `source` row under `item.entry`, then overwrite it with the
    /// scaled item and store its spell copies. Stores with transactions
    /// should apply all of it or nothing.
    fn persist_generated(&self, source: i32, item: &ItemRecord, spells: &[SpellRecord]) -> Result<()> {
        self.copy_item(source, item.entry)?;
        self.persist_scaled(item, spells)
    }
}
