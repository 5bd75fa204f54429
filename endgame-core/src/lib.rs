//! Core library for scaling endgame items and spells.

pub mod armor;
pub mod config;
pub mod database;
pub mod error;
pub mod generator;
pub mod import;
pub mod items;
pub mod models;
pub mod roles;
pub mod spells;
pub mod stats;
pub mod store;
pub mod validation;
pub mod weapons;

pub use config::GeneratorConfig;
pub use database::Database;
pub use error::{EndgameError, Result};
pub use generator::{GenerationResult, GenerationSummary, RaidGearGenerator, ScaleJob};
pub use models::{ItemRecord, LevelBand, SpellRecord};
pub use roles::ClassRole;
pub use store::ItemStore;
pub use validation::ValidationReport;
