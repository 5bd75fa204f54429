use crate::error::{EndgameError, Result};
use crate::models::{ItemRecord, LevelBand, SpellRecord};
use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;
use serde::Serialize;

const SCHEMA_V1: &str = r#"
    CREATE TABLE items (
        entry INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        class INTEGER NOT NULL,
        subclass INTEGER,
        inventory_type INTEGER NOT NULL DEFAULT 0,
        material INTEGER NOT NULL DEFAULT 0,
        item_level INTEGER,
        quality INTEGER,
        stats_json TEXT NOT NULL,
        stats_count INTEGER NOT NULL DEFAULT 0,
        spells_json TEXT NOT NULL,
        armor INTEGER NOT NULL DEFAULT 0,
        min_dmg1 REAL NOT NULL DEFAULT 0,
        max_dmg1 REAL NOT NULL DEFAULT 0,
        min_dmg2 REAL NOT NULL DEFAULT 0,
        max_dmg2 REAL NOT NULL DEFAULT 0,
        delay INTEGER,
        resistances_json TEXT NOT NULL,
        difficulty INTEGER NOT NULL DEFAULT 0,
        display_id INTEGER NOT NULL DEFAULT 0,
        required_level INTEGER NOT NULL DEFAULT 0,
        sell_price INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX idx_items_class_subclass ON items(class, subclass, item_level);

    CREATE TABLE spells (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        aura_description TEXT NOT NULL DEFAULT '',
        effects_json TEXT NOT NULL
    );

    CREATE TABLE generation_runs (
        id INTEGER PRIMARY KEY,
        kind TEXT NOT NULL,
        started_at TEXT NOT NULL,
        finished_at TEXT NOT NULL,
        total_processed INTEGER NOT NULL,
        generated INTEGER NOT NULL,
        skipped INTEGER NOT NULL,
        failed INTEGER NOT NULL
    );
"#;

const ITEM_COLUMNS: &str = "entry, name, class, subclass, inventory_type, material, item_level, \
    quality, stats_json, stats_count, spells_json, armor, min_dmg1, max_dmg1, min_dmg2, max_dmg2, \
    delay, resistances_json, difficulty";

/// Row counts of one finished batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_processed: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(SCHEMA_V1)])
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn json_column<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn item_from_row(row: &Row) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        entry: row.get(0)?,
        name: row.get(1)?,
        class: row.get(2)?,
        subclass: row.get(3)?,
        inventory_type: row.get(4)?,
        material: row.get(5)?,
        item_level: row.get(6)?,
        quality: row.get(7)?,
        stats: json_column(row, 8)?,
        stats_count: row.get(9)?,
        spells: json_column(row, 10)?,
        armor: row.get(11)?,
        min_dmg1: row.get(12)?,
        max_dmg1: row.get(13)?,
        min_dmg2: row.get(14)?,
        max_dmg2: row.get(15)?,
        delay: row.get(16)?,
        resistances: json_column(row, 17)?,
        difficulty: row.get(18)?,
    })
}

fn spell_from_row(row: &Row) -> rusqlite::Result<SpellRecord> {
    Ok(SpellRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        aura_description: row.get(3)?,
        effects: json_column(row, 4)?,
    })
}

impl Database {
    pub fn new(path: &std::path::Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(EndgameError::Pool)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(EndgameError::Pool)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.connection()?;
        migrations().to_latest(&mut conn)?;
        Ok(())
    }

    fn upsert_item(conn: &Connection, item: &ItemRecord) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO items ({ITEM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                 ON CONFLICT(entry) DO UPDATE SET
                    name = excluded.name,
                    class = excluded.class,
                    subclass = excluded.subclass,
                    inventory_type = excluded.inventory_type,
                    material = excluded.material,
                    item_level = excluded.item_level,
                    quality = excluded.quality,
                    stats_json = excluded.stats_json,
                    stats_count = excluded.stats_count,
                    spells_json = excluded.spells_json,
                    armor = excluded.armor,
                    min_dmg1 = excluded.min_dmg1,
                    max_dmg1 = excluded.max_dmg1,
                    min_dmg2 = excluded.min_dmg2,
                    max_dmg2 = excluded.max_dmg2,
                    delay = excluded.delay,
                    resistances_json = excluded.resistances_json,
                    difficulty = excluded.difficulty"
            ),
            params![
                item.entry,
                &item.name,
                item.class,
                item.subclass,
                item.inventory_type,
                item.material,
                item.item_level,
                item.quality,
                to_json(&item.stats)?,
                item.stats_count,
                to_json(&item.spells)?,
                item.armor,
                item.min_dmg1,
                item.max_dmg1,
                item.min_dmg2,
                item.max_dmg2,
                item.delay,
                to_json(&item.resistances)?,
                item.difficulty,
            ],
        )?;
        Ok(())
    }

    fn upsert_spell(conn: &Connection, spell: &SpellRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO spells (id, name, description, aura_description, effects_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                aura_description = excluded.aura_description,
                effects_json = excluded.effects_json",
            (
                spell.id,
                &spell.name,
                &spell.description,
                &spell.aura_description,
                to_json(&spell.effects)?,
            ),
        )?;
        Ok(())
    }

    fn copy_item_row(conn: &Connection, source: i32, dest: i32) -> Result<()> {
        let copied = conn.execute(
            &format!(
                "INSERT OR REPLACE INTO items ({ITEM_COLUMNS}, display_id, required_level, sell_price)
                 SELECT ?2, {}, display_id, required_level, sell_price
                 FROM items WHERE entry = ?1",
                ITEM_COLUMNS.trim_start_matches("entry, ")
            ),
            (source, dest),
        )?;
        if copied == 0 {
            return Err(EndgameError::NotFound(format!("item {}", source)));
        }
        Ok(())
    }

    /// Insert or update items in one transaction.
    pub fn insert_or_update_items(&self, items: &[ItemRecord]) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut inserted_count = 0;
        for item in items {
            Self::upsert_item(&tx, item)?;
            inserted_count += 1;
        }

        tx.commit()?;
        Ok(inserted_count)
    }

    /// Insert or update spells in one transaction.
    pub fn insert_or_update_spells(&self, spells: &[SpellRecord]) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let mut inserted_count = 0;
        for spell in spells {
            Self::upsert_spell(&tx, spell)?;
            inserted_count += 1;
        }

        tx.commit()?;
        Ok(inserted_count)
    }

    /// Set the columns only the game server reads. Used by imports.
    pub fn update_item_extras(&self, entry: i32, display_id: i32, required_level: i32, sell_price: i64) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "UPDATE items SET display_id = ?2, required_level = ?3, sell_price = ?4 WHERE entry = ?1",
            (entry, display_id, required_level, sell_price),
        )?;
        Ok(())
    }

    pub fn item_count(&self) -> Result<usize> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn record_run(&self, run: &RunRecord) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO generation_runs
                (kind, started_at, finished_at, total_processed, generated, skipped, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                &run.kind,
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.total_processed as i64,
                run.generated as i64,
                run.skipped as i64,
                run.failed as i64,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT kind, started_at, finished_at, total_processed, generated, skipped, failed
             FROM generation_runs
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, started, finished, total, generated, skipped, failed)| {
                Ok(RunRecord {
                    kind,
                    started_at: parse_timestamp(&started)?,
                    finished_at: parse_timestamp(&finished)?,
                    total_processed: total as usize,
                    generated: generated as usize,
                    skipped: skipped as usize,
                    failed: failed as usize,
                })
            })
            .collect()
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EndgameError::Parse(format!("bad timestamp '{}': {}", text, e)))
}

impl ItemStore for Database {
    fn fetch_item(&self, entry: i32) -> Result<ItemRecord> {
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE entry = ?1"),
            [entry],
            item_from_row,
        )
        .optional()?
        .ok_or_else(|| EndgameError::NotFound(format!("item {}", entry)))
    }

    fn fetch_spell(&self, id: i32) -> Result<SpellRecord> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT id, name, description, aura_description, effects_json FROM spells WHERE id = ?1",
            [id],
            spell_from_row,
        )
        .optional()?
        .ok_or_else(|| EndgameError::NotFound(format!("spell {}", id)))
    }

    fn fetch_candidate_reference_items(
        &self,
        class: i32,
        subclass: i32,
        band: LevelBand,
    ) -> Result<Vec<ItemRecord>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE class = ?1 AND subclass = ?2
               AND (?3 = 0 OR item_level >= ?3)
               AND (?4 = 0 OR item_level <= ?4)
             ORDER BY entry"
        ))?;

        let items = stmt
            .query_map((class, subclass, band.min, band.max), item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn persist_item(&self, item: &ItemRecord) -> Result<()> {
        let conn = self.connection()?;
        Self::upsert_item(&conn, item)
    }

    fn persist_spell(&self, spell: &SpellRecord) -> Result<()> {
        let conn = self.connection()?;
        Self::upsert_spell(&conn, spell)
    }

    fn copy_item(&self, source: i32, dest: i32) -> Result<()> {
        let conn = self.connection()?;
        Self::copy_item_row(&conn, source, dest)
    }

    fn copy_spell(&self, source: i32, dest: i32) -> Result<()> {
        let conn = self.connection()?;
        let copied = conn.execute(
            "INSERT OR REPLACE INTO spells (id, name, description, aura_description, effects_json)
             SELECT ?2, name, description, aura_description, effects_json
             FROM spells WHERE id = ?1",
            (source, dest),
        )?;
        if copied == 0 {
            return Err(EndgameError::NotFound(format!("spell {}", source)));
        }
        Ok(())
    }

    fn persist_scaled(&self, item: &ItemRecord, spells: &[SpellRecord]) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for spell in spells {
            Self::upsert_spell(&tx, spell)?;
        }
        Self::upsert_item(&tx, item)?;
        tx.commit()?;
        Ok(())
    }
    fn persist_generated(&self, source: i32, item: &ItemRecord, spells: &[SpellRecord]) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        Self::copy_item_row(&tx, source, item.entry)?;
        for spell in spells {
            Self::upsert_spell(&tx, spell)?;
        }
        Self::upsert_item(&tx, item)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpellEffect, SpellSlot, StatSlot};
    use tempfile::TempDir;

    fn open() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.sqlite")).unwrap();
        (dir, db)
    }

    fn sample_item(entry: i32, item_level: i32) -> ItemRecord {
        let mut item = ItemRecord::new(entry, format!("Item {}", entry));
        item.class = 4;
        item.subclass = Some(4);
        item.inventory_type = 5;
        item.item_level = Some(item_level);
        item.quality = Some(3);
        item.stats[0] = StatSlot::new(4, 25);
        item.stats_count = 1;
        item.spells[0] = SpellSlot { spell_id: 900, trigger: 1 };
        item.armor = 500;
        item.resistances.fire = 7;
        item
    }

    #[test]
    fn test_item_round_trip() {
        let (_dir, db) = open();
        let item = sample_item(1, 60);
        db.persist_item(&item).unwrap();
        assert_eq!(db.fetch_item(1).unwrap(), item);
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let (_dir, db) = open();
        assert!(matches!(db.fetch_item(42), Err(EndgameError::NotFound(_))));
        assert!(matches!(db.fetch_spell(42), Err(EndgameError::NotFound(_))));
        assert!(matches!(db.copy_item(42, 43), Err(EndgameError::NotFound(_))));
    }

    #[test]
    fn test_upsert_preserves_untouched_columns() {
        let (_dir, db) = open();
        let mut item = sample_item(2, 60);
        db.persist_item(&item).unwrap();
        db.update_item_extras(2, 1234, 60, 9999).unwrap();

        item.armor = 900;
        db.persist_item(&item).unwrap();

        let conn = db.connection().unwrap();
        let (display_id, sell_price): (i32, i64) = conn
            .query_row("SELECT display_id, sell_price FROM items WHERE entry = 2", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(display_id, 1234);
        assert_eq!(sell_price, 9999);
        assert_eq!(db.fetch_item(2).unwrap().armor, 900);
    }

    #[test]
    fn test_copy_item_keeps_extras() {
        let (_dir, db) = open();
        db.persist_item(&sample_item(3, 60)).unwrap();
        db.update_item_extras(3, 77, 60, 10).unwrap();
        db.copy_item(3, 20_000_003).unwrap();

        let copy = db.fetch_item(20_000_003).unwrap();
        assert_eq!(copy.entry, 20_000_003);
        assert_eq!(copy.name, "Item 3");

        let conn = db.connection().unwrap();
        let display_id: i32 = conn
            .query_row("SELECT display_id FROM items WHERE entry = 20000003", [], |row| row.get(0))
            .unwrap();
        assert_eq!(display_id, 77);
    }

    #[test]
    fn test_spell_round_trip_and_copy() {
        let (_dir, db) = open();
        let mut spell = SpellRecord::new(900, "Strength");
        spell.description = "Increases strength.".to_string();
        spell.effects[0] = SpellEffect { effect: 6, base_points: 9, die_sides: 1, aura: 29, bonus_multiplier: 0.5 };
        db.persist_spell(&spell).unwrap();
        db.copy_spell(900, 30_000_900).unwrap();

        assert_eq!(db.fetch_spell(900).unwrap(), spell);
        assert_eq!(db.fetch_spell(30_000_900).unwrap().effects, spell.effects);
    }

    #[test]
    fn test_candidates_respect_level_band() {
        let (_dir, db) = open();
        db.insert_or_update_items(&[sample_item(10, 60), sample_item(11, 70), sample_item(12, 80)])
            .unwrap();
        let mut other = sample_item(13, 70);
        other.subclass = Some(2);
        db.persist_item(&other).unwrap();

        let all = db.fetch_candidate_reference_items(4, 4, LevelBand::default()).unwrap();
        assert_eq!(all.len(), 3);

        let band = db.fetch_candidate_reference_items(4, 4, LevelBand::new(65, 75)).unwrap();
        assert_eq!(band.iter().map(|i| i.entry).collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn test_persist_scaled_writes_spells() {
        let (_dir, db) = open();
        let item = sample_item(5, 60);
        let spell = SpellRecord::new(31_000_900, "Scaled");
        db.persist_scaled(&item, &[spell]).unwrap();
        assert!(db.fetch_spell(31_000_900).is_ok());
        assert_eq!(db.item_count().unwrap(), 1);
    }

    #[test]
    fn test_persist_generated_is_all_or_nothing() {
        let (_dir, db) = open();
        db.persist_item(&sample_item(6, 60)).unwrap();
        db.connection()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_spells BEFORE INSERT ON spells
                 BEGIN SELECT RAISE(ABORT, 'spell writes disabled'); END;",
            )
            .unwrap();

        let mut scaled = sample_item(20_000_006, 325);
        scaled.name = "Mythic Item 6".to_string();
        let spell = SpellRecord::new(31_000_900, "Scaled");
        assert!(db.persist_generated(6, &scaled, &[spell]).is_err());

        assert!(matches!(db.fetch_item(20_000_006), Err(EndgameError::NotFound(_))));
        assert_eq!(db.item_count().unwrap(), 1);
    }

    #[test]
    fn test_persist_generated_copies_then_overwrites() {
        let (_dir, db) = open();
        db.persist_item(&sample_item(7, 60)).unwrap();
        db.update_item_extras(7, 88, 60, 20).unwrap();

        let scaled = sample_item(20_000_007, 325);
        db.persist_generated(7, &scaled, &[SpellRecord::new(31_000_900, "Scaled")])
            .unwrap();

        assert_eq!(db.fetch_item(20_000_007).unwrap(), scaled);
        assert!(db.fetch_spell(31_000_900).is_ok());
        let display_id: i32 = db
            .connection()
            .unwrap()
            .query_row("SELECT display_id FROM items WHERE entry = 20000007", [], |row| row.get(0))
            .unwrap();
        assert_eq!(display_id, 88);
    }

    #[test]
    fn test_run_records() {
        let (_dir, db) = open();
        let now = Utc::now();
        let run = RunRecord {
            kind: "scale".to_string(),
            started_at: now,
            finished_at: now,
            total_processed: 3,
            generated: 2,
            skipped: 1,
            failed: 0,
        };
        db.record_run(&run).unwrap();
        let runs = db.recent_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].generated, 2);
    }
}
