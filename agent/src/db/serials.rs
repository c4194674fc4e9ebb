//! Store operations for the available_serials reference table.
//!
//! Only the serial reconciler writes this table. Every mutation runs in its
//! own transaction so a crash mid-batch never leaves a partial row.

use std::collections::BTreeSet;

use fieldsync_engine::{AvailableSerial, SerialDelta, Timestamp};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::Result;

async fn upsert_all<'a, I>(
    tx: &mut Transaction<'_, Sqlite>,
    serials: I,
    now: Timestamp,
) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut count = 0;
    for serial in serials {
        sqlx::query(
            r#"
            INSERT INTO available_serials (serial_number, is_valid, is_used, last_updated)
            VALUES (?, 1, 0, ?)
            ON CONFLICT (serial_number) DO UPDATE SET
                is_valid = 1,
                is_used = 0,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(serial)
        .bind(now as i64)
        .execute(&mut **tx)
        .await?;
        count += 1;
    }
    Ok(count)
}

async fn delete_all<'a, I>(tx: &mut Transaction<'_, Sqlite>, serials: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut count = 0;
    for serial in serials {
        let result = sqlx::query("DELETE FROM available_serials WHERE serial_number = ?")
            .bind(serial)
            .execute(&mut **tx)
            .await?;
        count += result.rows_affected() as usize;
    }
    Ok(count)
}

/// Upsert serials, optionally clearing the table first.
///
/// With `full_replace` the table ends up holding exactly `serials`; without it
/// existing rows not in `serials` are left alone. Returns the number of rows
/// written.
pub async fn replace_available_serials(
    pool: &SqlitePool,
    serials: &BTreeSet<String>,
    full_replace: bool,
    now: Timestamp,
) -> Result<usize> {
    let mut tx = pool.begin().await?;
    if full_replace {
        sqlx::query("DELETE FROM available_serials")
            .execute(&mut *tx)
            .await?;
    }
    let saved = upsert_all(&mut tx, serials, now).await?;
    tx.commit().await?;

    Ok(saved)
}

/// Delete serials by exact match. Returns the number of rows removed.
pub async fn remove_available_serials(
    pool: &SqlitePool,
    serials: &BTreeSet<String>,
) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let removed = delete_all(&mut tx, serials).await?;
    tx.commit().await?;

    Ok(removed)
}

/// Apply a reconciliation delta in one transaction.
///
/// Returns `(saved, removed)`.
pub async fn apply_serial_delta(
    pool: &SqlitePool,
    delta: &SerialDelta,
    now: Timestamp,
) -> Result<(usize, usize)> {
    let mut tx = pool.begin().await?;
    let saved = upsert_all(&mut tx, &delta.added, now).await?;
    let removed = delete_all(&mut tx, &delta.removed).await?;
    tx.commit().await?;

    Ok((saved, removed))
}

/// Every serial number in the table.
pub async fn list_available_serials(pool: &SqlitePool) -> Result<BTreeSet<String>> {
    let serials = sqlx::query_scalar::<_, String>("SELECT serial_number FROM available_serials")
        .fetch_all(pool)
        .await?;

    Ok(serials.into_iter().collect())
}

/// Look up one serial row.
pub async fn get_available_serial(
    pool: &SqlitePool,
    serial: &str,
) -> Result<Option<AvailableSerial>> {
    let row = sqlx::query_as::<_, (String, bool, bool, i64)>(
        r#"
        SELECT serial_number, is_valid, is_used, last_updated
        FROM available_serials
        WHERE serial_number = ?
        "#,
    )
    .bind(serial.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(serial_number, is_valid, is_used, last_updated)| AvailableSerial {
            serial_number,
            is_valid,
            is_used,
            last_updated: last_updated.max(0) as u64,
        },
    ))
}

/// Whether an agent may assign this serial: present, valid and unused.
pub async fn is_serial_available(pool: &SqlitePool, serial: &str) -> Result<bool> {
    Ok(get_available_serial(pool, serial)
        .await?
        .is_some_and(|s| s.is_assignable()))
}

/// Number of rows in the table.
pub async fn count_available_serials(pool: &SqlitePool) -> Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM available_serials")
        .fetch_one(pool)
        .await?;

    Ok(count.max(0) as usize)
}
