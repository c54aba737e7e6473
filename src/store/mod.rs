//! Entity storage with SQLite
//!
//! One connection per store. Multi-row writes that must land together
//! (a lead and its history row, a message and its conversation counters)
//! run inside a single transaction.

mod businesses;
mod content;
mod conversations;
mod leads;
mod questions;
pub mod repo;
mod schema;
mod testing;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{CoreError, Result};

pub use repo::CrmRepository;
pub use schema::SCHEMA;

pub struct CrmStore {
    conn: Connection,
}

impl CrmStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CoreError::ValidationFailed(format!(
                        "cannot create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

// ============================================
// HELPERS
// ============================================

/// Turn the affected-row count of a versioned UPDATE into a result.
fn check_swapped(affected: usize, entity: &'static str, id: &str) -> Result<()> {
    if affected == 0 {
        return Err(CoreError::conflict(entity, id));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map a UNIQUE constraint failure onto the domain error.
fn unique_violation(err: rusqlite::Error, what: &str) -> CoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            CoreError::UniquenessViolation(what.to_string())
        }
        _ => CoreError::Database(err),
    }
}
