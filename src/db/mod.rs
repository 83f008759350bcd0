// Database module - SQLite connection, quote cache, manual rates and sessions

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::exchange::QuoteCache;
use crate::simulation::{SimulationInputs, SimulationResult};

/// Get the default database path (`$IMPORTA_DB` or ~/.importa/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("IMPORTA_DB") {
        return Ok(PathBuf::from(path));
    }

    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let importa_dir = PathBuf::from(home).join(".importa");

    std::fs::create_dir_all(&importa_dir).context("Failed to create .importa directory")?;

    Ok(importa_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;
    Ok(conn)
}

/// Create the tables if needed and return an open connection
pub fn init_database(db_path: Option<PathBuf>) -> Result<Connection> {
    let conn = open_db(db_path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;
    debug!("Database schema ready");
    Ok(())
}

/// Read a Decimal stored as TEXT (INTEGER and REAL are accepted too)
fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::{Type, ValueRef};

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
            Decimal::from_str(s)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Real, Box::new(e))),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            other.data_type(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Quote cache

/// Load every persisted PTAX quote
pub fn load_quote_cache(conn: &Connection) -> Result<QuoteCache> {
    let mut stmt = conn.prepare("SELECT currency, quote_date, rate FROM quote_cache")?;
    let rows = stmt.query_map([], |row| {
        let currency: String = row.get(0)?;
        let date: NaiveDate = row.get(1)?;
        let rate = get_decimal_value(row, 2)?;
        Ok((currency, date, rate))
    })?;

    let cache = rows
        .collect::<Result<QuoteCache, _>>()
        .context("Failed to load quote cache")?;
    debug!("Loaded {} cached quotes", cache.len());
    Ok(cache)
}

/// Persist the in-memory cache. Existing rows are left untouched; returns the
/// number of new rows.
pub fn store_quote_cache(conn: &mut Connection, cache: &QuoteCache) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO quote_cache (currency, quote_date, rate, source)
             VALUES (?1, ?2, ?3, 'ptax')",
        )?;
        for (currency, date, rate) in cache.iter() {
            inserted += stmt.execute(params![currency, date, rate.to_string()])?;
        }
    }
    tx.commit()?;

    if inserted > 0 {
        info!("Stored {} new quotes in cache", inserted);
    }
    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Manual rates

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRate {
    pub currency: String,
    pub rate: Decimal,
    pub set_at: NaiveDateTime,
}

pub fn set_manual_rate(conn: &Connection, currency: &str, rate: Decimal) -> Result<()> {
    conn.execute(
        "INSERT INTO manual_rates (currency, rate, set_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
         ON CONFLICT(currency) DO UPDATE SET rate = excluded.rate, set_at = excluded.set_at",
        params![currency, rate.to_string()],
    )
    .context(format!("Failed to store manual rate for {}", currency))?;
    Ok(())
}

/// Returns false if no rate was retained for the currency
pub fn clear_manual_rate(conn: &Connection, currency: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM manual_rates WHERE currency = ?1", [currency])?;
    Ok(removed > 0)
}

pub fn list_manual_rates(conn: &Connection) -> Result<Vec<ManualRate>> {
    let mut stmt =
        conn.prepare("SELECT currency, rate, set_at FROM manual_rates ORDER BY currency")?;
    let rates = stmt
        .query_map([], |row| {
            Ok(ManualRate {
                currency: row.get(0)?,
                rate: get_decimal_value(row, 1)?,
                set_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rates)
}

// ---------------------------------------------------------------------------
// Sessions

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub id: String,
    pub inputs: SimulationInputs,
    pub result: SimulationResult,
    pub updated_at: NaiveDateTime,
}

/// Insert or replace the cached simulation for `id`
pub fn save_session(
    conn: &Connection,
    id: &str,
    inputs: &SimulationInputs,
    result: &SimulationResult,
) -> Result<()> {
    let inputs_json = serde_json::to_string(inputs)?;
    let result_json = serde_json::to_string(result)?;

    conn.execute(
        "INSERT INTO sessions (id, inputs_json, result_json, updated_at)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(id) DO UPDATE SET
            inputs_json = excluded.inputs_json,
            result_json = excluded.result_json,
            updated_at = excluded.updated_at",
        params![id, inputs_json, result_json],
    )
    .context(format!("Failed to save session {}", id))?;

    info!("Saved session {}", id);
    Ok(())
}

type SessionRow = (String, String, String, NaiveDateTime);

fn decode_session((id, inputs_json, result_json, updated_at): SessionRow) -> Result<StoredSession> {
    let inputs = serde_json::from_str(&inputs_json)
        .context(format!("Corrupted inputs for session {}", id))?;
    let result = serde_json::from_str(&result_json)
        .context(format!("Corrupted result for session {}", id))?;
    Ok(StoredSession {
        id,
        inputs,
        result,
        updated_at,
    })
}

fn session_row(row: &rusqlite::Row) -> Result<SessionRow, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

pub fn get_session(conn: &Connection, id: &str) -> Result<Option<StoredSession>> {
    let row = conn
        .query_row(
            "SELECT id, inputs_json, result_json, updated_at FROM sessions WHERE id = ?1",
            [id],
            session_row,
        )
        .optional()?;

    row.map(decode_session).transpose()
}

/// All sessions, most recently updated first
pub fn list_sessions(conn: &Connection) -> Result<Vec<StoredSession>> {
    let mut stmt = conn.prepare(
        "SELECT id, inputs_json, result_json, updated_at FROM sessions
         ORDER BY updated_at DESC, id ASC",
    )?;
    let rows = stmt
        .query_map([], session_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(decode_session).collect()
}

pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
    Ok(removed > 0)
}
