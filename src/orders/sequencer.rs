//! Date-scoped order number generation
//!
//! Order numbers look like `250830-0001`: a `YYMMDD` prefix plus a 4-digit
//! daily sequence starting at `0001`. The sequence lives in a per-day marker
//! row; `lock_day` upserts that row as the first write of the creating
//! transaction, which takes SQLite's write lock and serializes concurrent
//! creators before any of them reads the current maximum.
//!
//! Both functions must be called inside the transaction that also inserts
//! the order, so a rolled-back creation never burns a sequence number.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

/// Write-intent lock on the day marker. First statement of every creating
/// transaction.
pub async fn lock_day(conn: &mut SqliteConnection, day: NaiveDate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_sequences (day, last_seq) VALUES (?, 0)
         ON CONFLICT(day) DO UPDATE SET last_seq = order_sequences.last_seq",
    )
    .bind(day_prefix(day))
    .execute(conn)
    .await?;
    Ok(())
}

/// Allocate the next order number for `day` inside the caller's transaction.
pub async fn next_order_number(
    conn: &mut SqliteConnection,
    day: NaiveDate,
) -> Result<String, sqlx::Error> {
    let prefix = day_prefix(day);
    let seq: i64 = sqlx::query_scalar(
        "INSERT INTO order_sequences (day, last_seq) VALUES (?, 1)
         ON CONFLICT(day) DO UPDATE SET last_seq = order_sequences.last_seq + 1
         RETURNING last_seq",
    )
    .bind(&prefix)
    .fetch_one(conn)
    .await?;
    Ok(format!("{prefix}-{seq:04}"))
}

fn day_prefix(day: NaiveDate) -> String {
    day.format("%y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> (tempfile::TempDir, sqlx::SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.db");
        let db = DbService::new(path.to_str().unwrap()).await.unwrap();
        (dir, db.pool)
    }

    #[tokio::test]
    async fn numbers_start_at_0001_and_increment() {
        let (_dir, pool) = test_pool().await;
        let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        let mut tx = pool.begin().await.unwrap();
        lock_day(&mut *tx, day).await.unwrap();
        assert_eq!(next_order_number(&mut *tx, day).await.unwrap(), "260830-0001");
        assert_eq!(next_order_number(&mut *tx, day).await.unwrap(), "260830-0002");
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn sequences_are_independent_per_day() {
        let (_dir, pool) = test_pool().await;
        let monday = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let mut tx = pool.begin().await.unwrap();
        assert_eq!(next_order_number(&mut *tx, monday).await.unwrap(), "260831-0001");
        assert_eq!(next_order_number(&mut *tx, tuesday).await.unwrap(), "260901-0001");
        assert_eq!(next_order_number(&mut *tx, monday).await.unwrap(), "260831-0002");
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn rollback_does_not_burn_numbers() {
        let (_dir, pool) = test_pool().await;
        let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        let mut tx = pool.begin().await.unwrap();
        next_order_number(&mut *tx, day).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        assert_eq!(next_order_number(&mut *tx, day).await.unwrap(), "260830-0001");
        tx.commit().await.unwrap();
    }
}
