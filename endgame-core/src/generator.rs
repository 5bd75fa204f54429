//! Batch item generation.
//!
//! `ScaleJob` lifts dungeon and tier items to a difficulty's start level using
//! a reference item's stat layout. `RaidGearGenerator` runs the raid profile:
//! tier modifiers, role-matched references, repairs and validation.

use crate::config::GeneratorConfig;
use crate::error::{EndgameError, Result};
use crate::items::difficulty_prefix;
use crate::models::{ItemRecord, LevelBand, SpellRecord};
use crate::roles::ClassRole;
use crate::stats::{difficulty_start_level, item_entry_bump, ITEM_CLASS_ARMOR, ITEM_CLASS_WEAPON};
use crate::store::ItemStore;
use crate::validation::{ItemKind, ValidationReport};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

/// An item that made it through a generation pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedItem {
    pub source_entry: i32,
    pub item: ItemRecord,
    /// Scaled spell copies the item references.
    pub spells: Vec<SpellRecord>,
    pub reference_entry: Option<i32>,
    pub role: Option<ClassRole>,
    pub report: Option<ValidationReport>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum GenerationResult {
    Generated(Box<GeneratedItem>),
    /// Validation still failed after repairs.
    Rejected { entry: i32, report: ValidationReport },
    /// The item could not be loaded or scaled.
    Skipped { entry: i32, reason: String },
}

impl GenerationResult {
    pub fn is_generated(&self) -> bool {
        matches!(self, GenerationResult::Generated(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, GenerationResult::Skipped { .. })
    }

    pub fn entry(&self) -> i32 {
        match self {
            GenerationResult::Generated(generated) => generated.source_entry,
            GenerationResult::Rejected { entry, .. } => *entry,
            GenerationResult::Skipped { entry, .. } => *entry,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSummary {
    pub total_processed: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl GenerationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: &GenerationResult) {
        self.total_processed += 1;
        match result {
            GenerationResult::Generated(_) => self.generated += 1,
            GenerationResult::Skipped { .. } => self.skipped += 1,
            GenerationResult::Rejected { .. } => self.failed += 1,
        }
    }
}

/// Store a generated item under its new entry. The source row is copied first
/// so columns the core does not model carry over.
pub fn persist_generated<S: ItemStore + ?Sized>(store: &S, generated: &GeneratedItem) -> Result<()> {
    store.persist_generated(generated.source_entry, &generated.item, &generated.spells)
}

/// Weapon or armor subclasses close enough to borrow references from.
pub fn similar_subclasses(class: i32, subclass: i32) -> Vec<i32> {
    let group: &[i32] = match (class, subclass) {
        (ITEM_CLASS_WEAPON, 1 | 5 | 8) => &[1, 5, 8],
        (ITEM_CLASS_WEAPON, 6 | 17) => &[6, 17],
        (ITEM_CLASS_WEAPON, 9 | 10) => &[9, 10],
        (ITEM_CLASS_WEAPON, 0 | 4 | 7 | 15) => &[0, 4, 7, 15],
        (ITEM_CLASS_WEAPON, 2 | 3 | 18) => &[2, 3, 18],
        (ITEM_CLASS_ARMOR, 2 | 3) => &[2, 3],
        _ => &[],
    };
    group.iter().copied().filter(|&s| s != subclass).collect()
}

/// Pick a reference whose stat list starts with the item's, shortening the
/// wanted prefix until something matches. Falls back to any candidate.
fn choose_reference<'c, R: Rng + ?Sized>(
    wanted: &[i32],
    candidates: &'c [(ItemRecord, Vec<i32>)],
    rng: &mut R,
) -> Option<&'c ItemRecord> {
    if candidates.is_empty() {
        return None;
    }
    for len in (1..=wanted.len()).rev() {
        let prefix = &wanted[..len];
        let matching: Vec<&ItemRecord> = candidates
            .iter()
            .filter(|(_, stats)| stats.starts_with(prefix))
            .map(|(item, _)| item)
            .collect();
        if !matching.is_empty() {
            return Some(matching[rng.gen_range(0..matching.len())]);
        }
    }
    Some(&candidates[rng.gen_range(0..candidates.len())].0)
}

/// Scale items to a difficulty's start level.
pub struct ScaleJob<'a, S: ItemStore + ?Sized> {
    store: &'a S,
    difficulty: i32,
    target_level: i32,
    band: LevelBand,
    quiet: u8,
}

impl<'a, S: ItemStore + ?Sized> ScaleJob<'a, S> {
    pub fn new(store: &'a S, difficulty: i32) -> Result<Self> {
        let target_level = difficulty_start_level(difficulty).ok_or_else(|| {
            EndgameError::InvalidDomain(format!("unknown difficulty {}", difficulty))
        })?;
        Ok(Self {
            store,
            difficulty,
            target_level,
            band: LevelBand::default(),
            quiet: 0,
        })
    }

    pub fn with_band(mut self, band: LevelBand) -> Self {
        self.band = band;
        self
    }

    pub fn with_quiet(mut self, quiet: u8) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn scale_entry<R: Rng + ?Sized>(&self, entry: i32, rng: &mut R) -> Result<GeneratedItem> {
        let mut item = self.store.fetch_item(entry)?;
        item.difficulty = self.difficulty;
        let quality = item.quality_or_err()?;
        if quality < 5 {
            item.quality = Some(4);
        }
        let subclass = item.subclass_or_err()?;

        let wanted = item.stat_list_with_spells(self.store);
        let candidates: Vec<(ItemRecord, Vec<i32>)> = self
            .store
            .fetch_candidate_reference_items(item.class, subclass, self.band)?
            .into_iter()
            .filter(|candidate| candidate.entry != entry)
            .map(|candidate| {
                let stats = candidate.stat_list_with_spells(self.store);
                (candidate, stats)
            })
            .collect();

        let reference_entry = match choose_reference(&wanted, &candidates, rng) {
            Some(reference) => {
                debug!("Using {} ({}) as reference for {}", reference.name, reference.entry, entry);
                item.apply_stats(reference);
                Some(reference.entry)
            }
            None => {
                if self.quiet < 2 {
                    warn!("No reference items for {} ({}), scaling without one", item.name, entry);
                }
                None
            }
        };

        let quality = item.quality_or_err()?;
        let report = item.scale_item(self.store, self.target_level, quality)?;

        item.entry = item_entry_bump(self.difficulty) + entry;
        if let Some(prefix) = difficulty_prefix(self.difficulty, rng) {
            item.name = format!("{} {}", prefix, item.name);
        }

        Ok(GeneratedItem {
            source_entry: entry,
            item,
            spells: report.derived_spells,
            reference_entry,
            role: None,
            report: None,
            warnings: Vec::new(),
        })
    }

    /// Scale every entry, persisting successes when `persist` is set.
    pub fn run<R: Rng + ?Sized>(
        &self,
        entries: &[i32],
        rng: &mut R,
        persist: bool,
        mut on_result: impl FnMut(&GenerationResult),
    ) -> GenerationSummary {
        let mut summary = GenerationSummary::new();

        for &entry in entries {
            let result = match self.scale_entry(entry, rng) {
                Ok(generated) => {
                    if self.quiet == 0 {
                        info!("Scaled {} -> {} ({})", entry, generated.item.entry, generated.item.name);
                    }
                    finish(self.store, generated, persist, self.quiet)
                }
                Err(e) => {
                    if self.quiet < 2 {
                        warn!("Skipping item {}: {}", entry, e);
                    }
                    GenerationResult::Skipped { entry, reason: e.to_string() }
                }
            };
            summary.add_result(&result);
            on_result(&result);
        }

        if self.quiet == 0 {
            info!(
                "Scale job finished: {} generated, {} skipped, {} failed",
                summary.generated, summary.skipped, summary.failed
            );
        }
        summary
    }
}

fn finish<S: ItemStore + ?Sized>(store: &S, generated: GeneratedItem, persist: bool, quiet: u8) -> GenerationResult {
    if persist {
        if let Err(e) = persist_generated(store, &generated) {
            if quiet < 2 {
                warn!("Failed to persist item {}: {}", generated.item.entry, e);
            }
            return GenerationResult::Skipped {
                entry: generated.source_entry,
                reason: e.to_string(),
            };
        }
    }
    GenerationResult::Generated(Box::new(generated))
}

/// Raid profile generator.
pub struct RaidGearGenerator<'a, S: ItemStore + ?Sized> {
    store: &'a S,
    config: GeneratorConfig,
    quiet: u8,
}

impl<'a, S: ItemStore + ?Sized> RaidGearGenerator<'a, S> {
    pub fn new(store: &'a S, config: GeneratorConfig) -> Self {
        Self { store, config, quiet: 0 }
    }

    pub fn with_quiet(mut self, quiet: u8) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Role-matched references for an item: each candidate is scaled to the
    /// target quality at its own level and kept when it classifies the same.
    /// Returns pairs of (source record, scaled record).
    fn compatible_references(&self, class: i32, subclass: i32, role: ClassRole) -> Vec<(ItemRecord, ItemRecord)> {
        let band = self.config.reference.band();
        let quality = self.config.target.quality;

        let collect = |subclass: i32| -> Vec<(ItemRecord, ItemRecord)> {
            let candidates = match self.store.fetch_candidate_reference_items(class, subclass, band) {
                Ok(candidates) => candidates,
                Err(e) => {
                    if self.quiet < 2 {
                        warn!("Failed to load references for subclass {}: {}", subclass, e);
                    }
                    return Vec::new();
                }
            };
            candidates
                .into_iter()
                .filter_map(|candidate| {
                    let mut scaled = candidate.clone();
                    let level = scaled.item_level?;
                    match scaled.scale_item(self.store, level, quality) {
                        Ok(_) => (scaled.classify() == role).then_some((candidate, scaled)),
                        Err(e) => {
                            debug!("Reference {} could not be scaled: {}", candidate.entry, e);
                            None
                        }
                    }
                })
                .collect()
        };

        let found = collect(subclass);
        if !found.is_empty() {
            return found;
        }
        for alternative in similar_subclasses(class, subclass) {
            let found = collect(alternative);
            if !found.is_empty() {
                debug!("Using references from similar subclass {}", alternative);
                return found;
            }
        }
        Vec::new()
    }

    pub fn generate_item<R: Rng + ?Sized>(
        &self,
        entry: i32,
        validate_only: bool,
        rng: &mut R,
    ) -> Result<GenerationResult> {
        let target = &self.config.target;
        let mut item = self.store.fetch_item(entry)?;
        item.difficulty = target.difficulty;
        item.apply_tier_modifiers(target.phase);
        item.scale_item(self.store, target.item_level, target.quality)?;

        let role = item.classify();
        let subclass = item.subclass_or_err()?;
        let search_subclass = if item.class == ITEM_CLASS_WEAPON && subclass == 8 { 1 } else { subclass };
        debug!("Item {} ({}) classified as {}", item.name, entry, role);

        let mut warnings = Vec::new();
        let is_trinket = ItemKind::of(&item) == ItemKind::Trinket;
        let references = self.compatible_references(item.class, search_subclass, role);
        let reference_entry = if references.is_empty() {
            item.clear_spells();
            warnings.push("no compatible reference".to_string());
            None
        } else {
            let (source, scaled) = &references[rng.gen_range(0..references.len())];
            item.apply_stats(scaled);
            if is_trinket {
                item.clear_spells();
            } else {
                item.copy_spells_from(source);
            }
            Some(source.entry)
        };

        let scale_report = item.scale_item(self.store, target.item_level, target.quality)?;
        if self.config.raid.fire_resistance {
            if let Some(fire) = item.apply_fire_resistance() {
                debug!("Fire resistance on {} set to {}", item.name, fire);
            }
        }
        item.assign_trinket_spell(role, rng);
        item.enforce_stat_requirements();

        let mut report = item.validate(role);
        if !report.is_valid() && !validate_only {
            let initial_score = report.score;
            item.cap_stats();
            report = item.validate(role);
            if !report.is_valid() && role != ClassRole::Generic && item.add_missing_key_stat(role, rng) {
                report = item.validate(role);
            }
            if report.is_valid() {
                warnings.push(format!("auto-corrected (score {} -> {})", initial_score, report.score));
            }
        }

        if !report.is_valid() {
            if self.quiet < 2 {
                warn!("Item {} ({}) failed validation with {} errors", item.name, entry, report.errors.len());
            }
            return Ok(GenerationResult::Rejected { entry, report });
        }

        item.entry = item_entry_bump(target.difficulty) + entry;
        // Spells rewritten by the final scale are the only copies still referenced.
        let spells = scale_report
            .derived_spells
            .into_iter()
            .filter(|spell| item.spells.iter().any(|slot| slot.spell_id == spell.id))
            .collect();

        Ok(GenerationResult::Generated(Box::new(GeneratedItem {
            source_entry: entry,
            item,
            spells,
            reference_entry,
            role: Some(role),
            report: Some(report),
            warnings,
        })))
    }

    /// Generate every configured raid entry.
    pub fn run<R: Rng + ?Sized>(
        &self,
        validate_only: bool,
        rng: &mut R,
        mut on_result: impl FnMut(&GenerationResult),
    ) -> GenerationSummary {
        let mut summary = GenerationSummary::new();

        for &entry in &self.config.raid.entries {
            let result = match self.generate_item(entry, validate_only, rng) {
                Ok(GenerationResult::Generated(generated)) => {
                    if self.quiet == 0 {
                        info!("Generated {} ({})", generated.item.name, generated.item.entry);
                    }
                    finish(self.store, *generated, !validate_only, self.quiet)
                }
                Ok(other) => other,
                Err(e) => {
                    if self.quiet < 2 {
                        warn!("Skipping item {}: {}", entry, e);
                    }
                    GenerationResult::Skipped { entry, reason: e.to_string() }
                }
            };
            summary.add_result(&result);
            on_result(&result);
        }

        if self.quiet == 0 {
            info!(
                "Raid generation finished: {} generated, {} skipped, {} failed",
                summary.generated, summary.skipped, summary.failed
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::{SpellEffect, SpellSlot, StatSlot};
    use crate::stats::stat;
    use crate::validation::{ValidationIssue, DEFENSE_CAP};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn open() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("gen.sqlite")).unwrap();
        (dir, db)
    }

    fn leather(entry: i32, item_level: i32, stats: &[(i32, i32)]) -> ItemRecord {
        let mut item = ItemRecord::new(entry, format!("Leather {}", entry));
        item.class = ITEM_CLASS_ARMOR;
        item.subclass = Some(2);
        item.inventory_type = 5;
        item.item_level = Some(item_level);
        item.quality = Some(3);
        item.armor = 150;
        for (slot, (stat_type, value)) in stats.iter().enumerate() {
            item.stats[slot] = StatSlot::new(*stat_type, *value);
        }
        item.stats_count = stats.len() as i32;
        item
    }

    fn agility_set() -> Vec<(i32, i32)> {
        vec![
            (stat::AGILITY, 30),
            (stat::STAMINA, 25),
            (stat::ATTACK_POWER, 60),
            (stat::HIT_RATING, 10),
            (stat::CRIT_RATING, 12),
            (stat::HASTE_RATING, 12),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = GenerationSummary::new();
        summary.add_result(&GenerationResult::Skipped { entry: 1, reason: "missing".into() });
        summary.add_result(&GenerationResult::Rejected {
            entry: 2,
            report: crate::models::ItemRecord::new(2, "x").validate(ClassRole::Generic),
        });
        assert_eq!(summary.total_processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_similar_subclasses() {
        assert_eq!(similar_subclasses(ITEM_CLASS_WEAPON, 8), vec![1, 5]);
        assert_eq!(similar_subclasses(ITEM_CLASS_ARMOR, 3), vec![2]);
        assert!(similar_subclasses(ITEM_CLASS_ARMOR, 4).is_empty());
        assert!(similar_subclasses(ITEM_CLASS_WEAPON, 13).is_empty());
    }

    #[test]
    fn test_choose_reference_prefers_matching_prefix() {
        let mut rng = StdRng::seed_from_u64(9);
        let candidates = vec![
            (ItemRecord::new(1, "a"), vec![3, 7]),
            (ItemRecord::new(2, "b"), vec![4, 7]),
        ];
        let chosen = choose_reference(&[4, 5], &candidates, &mut rng).unwrap();
        assert_eq!(chosen.entry, 2);
        assert!(choose_reference(&[4], &[], &mut rng).is_none());
    }

    #[test]
    fn test_scale_job_persists_under_bumped_entry() {
        let (_dir, db) = open();
        db.insert_or_update_items(&[
            leather(100, 60, &[(stat::AGILITY, 20), (stat::STAMINA, 15)]),
            leather(101, 70, &[(stat::AGILITY, 40), (stat::STAMINA, 30), (stat::HIT_RATING, 8)]),
        ])
        .unwrap();
        db.update_item_extras(100, 4242, 60, 500).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let job = ScaleJob::new(&db, 3).unwrap().with_quiet(2);
        let summary = job.run(&[100, 999], &mut rng, true, |_| {});
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.skipped, 1);

        let scaled = db.fetch_item(20_000_100).unwrap();
        assert_eq!(scaled.item_level, Some(280));
        assert_eq!(scaled.quality, Some(4));
        assert_eq!(scaled.stats_count, 3);
        assert!(scaled.has_stat(stat::HIT_RATING));
        assert!(scaled.name.ends_with("Leather 100"));
        assert_ne!(scaled.name, "Leather 100");

        let conn = db.connection().unwrap();
        let display_id: i32 = conn
            .query_row("SELECT display_id FROM items WHERE entry = 20000100", [], |row| row.get(0))
            .unwrap();
        assert_eq!(display_id, 4242);
    }

    #[test]
    fn test_scale_job_rejects_unknown_difficulty() {
        let (_dir, db) = open();
        assert!(ScaleJob::new(&db, 2).is_err());
    }

    #[test]
    fn test_scale_job_persists_scaled_spell_copies() {
        let (_dir, db) = open();
        let mut item = leather(200, 60, &[(stat::AGILITY, 20)]);
        item.spells[0] = SpellSlot { spell_id: 700, trigger: 1 };
        db.persist_item(&item).unwrap();
        let mut heal = SpellRecord::new(700, "Mending");
        heal.effects[0] = SpellEffect { effect: 10, base_points: 100, die_sides: 0, aura: 0, bonus_multiplier: 0.0 };
        db.persist_spell(&heal).unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let job = ScaleJob::new(&db, 4).unwrap().with_quiet(2);
        let summary = job.run(&[200], &mut rng, true, |_| {});
        assert_eq!(summary.generated, 1);

        let scaled = db.fetch_item(21_000_200).unwrap();
        assert_eq!(scaled.spells[0].spell_id, 31_000_700);
        assert!(db.fetch_spell(31_000_700).is_ok());
        assert_eq!(db.fetch_spell(700).unwrap(), heal);
    }

    #[test]
    fn test_raid_generator_validates_and_persists() {
        let (_dir, db) = open();
        db.insert_or_update_items(&[leather(300, 60, &agility_set()), leather(301, 75, &agility_set())])
            .unwrap();

        let mut config = GeneratorConfig::default();
        config.raid.entries = vec![300, 404];
        let generator = RaidGearGenerator::new(&db, config).with_quiet(2);
        let mut rng = StdRng::seed_from_u64(5);

        let mut results = Vec::new();
        let summary = generator.run(false, &mut rng, |result| results.push(result.clone()));
        assert_eq!(summary.total_processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.failed, 0);

        let Some(GenerationResult::Generated(generated)) = results.first() else {
            panic!("expected item 300 to be generated, got {:?}", results.first());
        };
        assert_eq!(generated.role, Some(ClassRole::AgilityMelee));
        assert_eq!(generated.item.entry, 20_000_300);
        assert_eq!(generated.item.item_level, Some(325));
        assert!(generated.report.as_ref().is_some_and(|report| report.is_valid()));
        assert!(results[1].is_skipped());

        let stored = db.fetch_item(20_000_300).unwrap();
        assert_eq!(stored, generated.item);
        assert_eq!(db.fetch_item(300).unwrap().item_level, Some(60));
    }

    #[test]
    fn test_raid_generator_repairs_thin_tank_armor() {
        let (_dir, db) = open();
        let mut chest = ItemRecord::new(400, "Bulwark Chestplate");
        chest.class = ITEM_CLASS_ARMOR;
        chest.subclass = Some(4);
        chest.inventory_type = 5;
        chest.item_level = Some(60);
        chest.quality = Some(3);
        chest.armor = 300;
        chest.stats[0] = StatSlot::new(stat::STAMINA, 20);
        chest.stats[1] = StatSlot::new(stat::DEFENSE_RATING, 30);
        chest.stats_count = 2;
        db.persist_item(&chest).unwrap();

        let generator = RaidGearGenerator::new(&db, GeneratorConfig::default()).with_quiet(2);
        let mut rng = StdRng::seed_from_u64(11);

        // Validation-only keeps the defense overflow and the short stat list.
        let GenerationResult::Rejected { report, .. } = generator.generate_item(400, true, &mut rng).unwrap() else {
            panic!("unrepaired item should be rejected");
        };
        assert_eq!(report.role, ClassRole::Tank);
        assert!(report.errors.iter().any(|e| matches!(e, ValidationIssue::CapExceeded { stat_type: 12, .. })));
        assert!(report.errors.iter().any(|e| matches!(e, ValidationIssue::TooFewStats { found: 4, .. })));

        let GenerationResult::Generated(generated) = generator.generate_item(400, false, &mut rng).unwrap() else {
            panic!("repaired item should be generated");
        };
        let item = &generated.item;
        assert_eq!(generated.role, Some(ClassRole::Tank));
        assert!(generated.warnings.iter().any(|w| w.starts_with("auto-corrected")));
        assert_eq!(item.stat_value(stat::DEFENSE_RATING), Some(DEFENSE_CAP));
        assert_eq!(item.stat_value(stat::INTELLECT), Some(162));
        assert_eq!(item.stat_value(stat::AGILITY), Some(162));
        assert!(item.has_stat(stat::STAMINA));
        let attack_power = item.stat_value(stat::ATTACK_POWER).unwrap();
        assert!((1876..=2681).contains(&attack_power));
        assert_eq!(item.stats_count, 5);
        assert!(item.validate(ClassRole::Tank).is_valid());
    }

    #[test]
    fn test_validate_only_does_not_persist() {
        let (_dir, db) = open();
        db.insert_or_update_items(&[leather(310, 60, &agility_set())]).unwrap();

        let mut config = GeneratorConfig::default();
        config.raid.entries = vec![310];
        let generator = RaidGearGenerator::new(&db, config).with_quiet(2);
        let mut rng = StdRng::seed_from_u64(6);
        generator.run(true, &mut rng, |_| {});

        assert!(db.fetch_item(20_000_310).is_err());
        assert_eq!(db.item_count().unwrap(), 1);
    }
}
