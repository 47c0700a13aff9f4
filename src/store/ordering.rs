//! Dense ordering of active items.
//!
//! Every function here takes a connection that the caller has already put
//! inside a transaction. After any of them returns, the active rows of the
//! table hold positions `1..=N` with no gaps or duplicates.

use rusqlite::{params, Connection, OptionalExtension};

use crate::app::{LowdownError, Result};
use crate::domain::{ItemKind, ItemStatus};

/// Position for an item appended to the end of the active list.
pub fn next_position(conn: &Connection, kind: ItemKind) -> Result<i64> {
    let max: Option<i64> = conn.query_row(
        &format!(
            "SELECT MAX(position) FROM {} WHERE status != 'archived'",
            kind.table()
        ),
        [],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) + 1)
}

pub fn active_count(conn: &Connection, kind: ItemKind) -> Result<i64> {
    let count = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE status != 'archived'",
            kind.table()
        ),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Clamp a requested position into `[1, count]`.
pub fn clamp_position(requested: i64, count: i64) -> i64 {
    requested.clamp(1, count.max(1))
}

/// Reassign `1..=N` to the active items, keeping their relative order.
///
/// Ties (legacy rows sharing a position) fall back to creation order.
/// Returns how many rows actually moved, so a consistent list yields 0.
pub fn reindex(conn: &Connection, kind: ItemKind, now: &str) -> Result<usize> {
    let table = kind.table();
    let ids: Vec<(i64, i64)> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, position FROM {} WHERE status != 'archived'
             ORDER BY position ASC, created_at ASC, id ASC",
            table
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut changed = 0;
    let mut update = conn.prepare(&format!(
        "UPDATE {} SET position = ?1, updated_at = ?2 WHERE id = ?3",
        table
    ))?;
    for (index, (id, position)) in ids.into_iter().enumerate() {
        let target = index as i64 + 1;
        if position != target {
            update.execute(params![target, now, id])?;
            changed += 1;
        }
    }

    Ok(changed)
}

/// Move an active item to `requested`, shifting the items in between by
/// one to close the gap. Out-of-range requests clamp. Returns the final
/// position.
pub fn move_to(
    conn: &Connection,
    kind: ItemKind,
    id: i64,
    requested: i64,
    now: &str,
) -> Result<i64> {
    let table = kind.table();
    let current: Option<(String, i64)> = conn
        .query_row(
            &format!("SELECT status, position FROM {} WHERE id = ?1", table),
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (status, old) = current.ok_or_else(|| LowdownError::not_found(kind, id))?;
    if status == ItemStatus::Archived.as_str() {
        return Err(LowdownError::Validation(format!(
            "{} {} is archived and has no position",
            kind, id
        )));
    }

    let count = active_count(conn, kind)?;
    let new = clamp_position(requested, count);
    if new == old {
        return Ok(old);
    }

    if new < old {
        conn.execute(
            &format!(
                "UPDATE {} SET position = position + 1, updated_at = ?1
                 WHERE status != 'archived' AND id != ?2 AND position >= ?3 AND position < ?4",
                table
            ),
            params![now, id, new, old],
        )?;
    } else {
        conn.execute(
            &format!(
                "UPDATE {} SET position = position - 1, updated_at = ?1
                 WHERE status != 'archived' AND id != ?2 AND position > ?3 AND position <= ?4",
                table
            ),
            params![now, id, old, new],
        )?;
    }

    conn.execute(
        &format!(
            "UPDATE {} SET position = ?1, updated_at = ?2 WHERE id = ?3",
            table
        ),
        params![new, now, id],
    )?;

    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2025-01-01T00:00:00+00:00";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../../migrations/001-initial/up.sql"))
            .unwrap();
        conn
    }

    fn insert(conn: &Connection, url: &str, position: i64, status: &str) -> i64 {
        conn.execute(
            "INSERT INTO articles (url, title, status, position, created_at, updated_at)
             VALUES (?1, ?1, ?2, ?3, ?4, ?4)",
            params![url, status, position, NOW],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn order(conn: &Connection) -> Vec<(i64, i64)> {
        let mut stmt = conn
            .prepare(
                "SELECT id, position FROM articles WHERE status != 'archived' ORDER BY position",
            )
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_next_position_empty_and_ignores_archived() {
        let conn = setup();
        assert_eq!(next_position(&conn, ItemKind::Article).unwrap(), 1);
        insert(&conn, "https://e.com/1", 1, "pending");
        insert(&conn, "https://e.com/2", 9, "archived");
        assert_eq!(next_position(&conn, ItemKind::Article).unwrap(), 2);
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(0, 4), 1);
        assert_eq!(clamp_position(-3, 4), 1);
        assert_eq!(clamp_position(9, 4), 4);
        assert_eq!(clamp_position(2, 4), 2);
        assert_eq!(clamp_position(5, 0), 1);
    }

    #[test]
    fn test_move_last_to_second() {
        let conn = setup();
        let ids: Vec<i64> = (1..=4)
            .map(|p| insert(&conn, &format!("https://e.com/{}", p), p, "pending"))
            .collect();

        let final_pos = move_to(&conn, ItemKind::Article, ids[3], 2, NOW).unwrap();
        assert_eq!(final_pos, 2);
        assert_eq!(
            order(&conn),
            vec![(ids[0], 1), (ids[3], 2), (ids[1], 3), (ids[2], 4)]
        );
    }

    #[test]
    fn test_move_down_and_clamp() {
        let conn = setup();
        let ids: Vec<i64> = (1..=3)
            .map(|p| insert(&conn, &format!("https://e.com/{}", p), p, "summarized"))
            .collect();

        let final_pos = move_to(&conn, ItemKind::Article, ids[0], 99, NOW).unwrap();
        assert_eq!(final_pos, 3);
        assert_eq!(order(&conn), vec![(ids[1], 1), (ids[2], 2), (ids[0], 3)]);
    }

    #[test]
    fn test_move_to_same_position_is_noop() {
        let conn = setup();
        let a = insert(&conn, "https://e.com/a", 1, "pending");
        let b = insert(&conn, "https://e.com/b", 2, "pending");
        assert_eq!(move_to(&conn, ItemKind::Article, b, 2, NOW).unwrap(), 2);
        assert_eq!(order(&conn), vec![(a, 1), (b, 2)]);
    }

    #[test]
    fn test_move_ignores_archived_rows() {
        let conn = setup();
        let a = insert(&conn, "https://e.com/a", 1, "pending");
        let _gone = insert(&conn, "https://e.com/x", 2, "archived");
        let b = insert(&conn, "https://e.com/b", 2, "pending");
        move_to(&conn, ItemKind::Article, b, 1, NOW).unwrap();
        assert_eq!(order(&conn), vec![(b, 1), (a, 2)]);
    }

    #[test]
    fn test_move_archived_item_rejected() {
        let conn = setup();
        let gone = insert(&conn, "https://e.com/x", 1, "archived");
        let err = move_to(&conn, ItemKind::Article, gone, 1, NOW).unwrap_err();
        assert!(matches!(err, LowdownError::Validation(_)));
    }

    #[test]
    fn test_move_missing_item() {
        let conn = setup();
        let err = move_to(&conn, ItemKind::Article, 42, 1, NOW).unwrap_err();
        assert!(matches!(err, LowdownError::NotFound { id: 42, .. }));
    }

    #[test]
    fn test_reindex_closes_gaps_and_is_idempotent() {
        let conn = setup();
        let a = insert(&conn, "https://e.com/a", 2, "pending");
        let b = insert(&conn, "https://e.com/b", 5, "accepted");
        let c = insert(&conn, "https://e.com/c", 9, "ai_failed");

        assert_eq!(reindex(&conn, ItemKind::Article, NOW).unwrap(), 3);
        assert_eq!(order(&conn), vec![(a, 1), (b, 2), (c, 3)]);

        assert_eq!(reindex(&conn, ItemKind::Article, NOW).unwrap(), 0);
        assert_eq!(order(&conn), vec![(a, 1), (b, 2), (c, 3)]);
    }

    #[test]
    fn test_reindex_breaks_ties_by_creation() {
        let conn = setup();
        let a = insert(&conn, "https://e.com/a", 1, "pending");
        let b = insert(&conn, "https://e.com/b", 1, "pending");
        reindex(&conn, ItemKind::Article, NOW).unwrap();
        assert_eq!(order(&conn), vec![(a, 1), (b, 2)]);
    }
}
