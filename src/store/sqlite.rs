use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use serde::Serialize;
use tracing::{debug, info};

use crate::app::{LowdownError, Result};
use crate::domain::threat::{decode_json, DEFAULT_THREAT_STATUS};
use crate::domain::{
    check_curator_transition, check_transition, FullIssue, Issue, Item, ItemKind, ItemStatus,
    ItemUpdate, NewIssue, NewItem, NewPodcastEpisode, NewThreat, Outcome, PodcastEpisode,
    PodcastUpdate, Threat, ThreatUpdate,
};
use crate::store::{newsletter, ordering, Store};

const THREAT_COLUMNS: &str = "id, name, type, country_of_origin, description, specifications, \
     ioc_year, operators, image_url, status, tod_summary, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-issues/up.sql")),
        ]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(LowdownError::poisoned)
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    pub(super) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

fn item_columns(kind: ItemKind) -> String {
    format!(
        "id, url, title, source, {}, original_content, status, position, created_at, updated_at",
        kind.text_column()
    )
}

fn item_from_row(kind: ItemKind, row: &Row) -> rusqlite::Result<Item> {
    let status: String = row.get(6)?;
    let status = status.parse::<ItemStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        )
    })?;

    Ok(Item {
        id: row.get(0)?,
        kind,
        url: row.get(1)?,
        title: row.get(2)?,
        source: row.get(3)?,
        summary: row.get(4)?,
        original_content: row.get(5)?,
        status,
        position: row.get(7)?,
        created_at: row
            .get::<_, String>(8)
            .ok()
            .and_then(|s| SqliteStore::parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(9)
            .ok()
            .and_then(|s| SqliteStore::parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn threat_from_row(row: &Row) -> rusqlite::Result<Threat> {
    Ok(Threat {
        id: row.get(0)?,
        name: row.get(1)?,
        threat_type: row.get(2)?,
        country_of_origin: row.get(3)?,
        description: row.get(4)?,
        specifications: decode_json(row.get(5)?),
        ioc_year: row.get(6)?,
        operators: decode_json(row.get(7)?),
        image_url: row.get(8)?,
        status: row.get(9)?,
        tod_summary: row.get(10)?,
        created_at: row
            .get::<_, String>(11)
            .ok()
            .and_then(|s| SqliteStore::parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(12)
            .ok()
            .and_then(|s| SqliteStore::parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn encode_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    Ok(value.as_ref().map(serde_json::to_string).transpose()?)
}

pub(super) fn load_item(conn: &Connection, kind: ItemKind, id: i64) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                item_columns(kind),
                kind.table()
            ),
            params![id],
            |row| item_from_row(kind, row),
        )
        .optional()?;
    Ok(item)
}

pub(super) fn require_item(conn: &Connection, kind: ItemKind, id: i64) -> Result<Item> {
    load_item(conn, kind, id)?.ok_or_else(|| LowdownError::not_found(kind, id))
}

pub(super) fn load_threat(conn: &Connection, id: i64) -> Result<Option<Threat>> {
    let threat = conn
        .query_row(
            &format!("SELECT {} FROM threats WHERE id = ?1", THREAT_COLUMNS),
            params![id],
            threat_from_row,
        )
        .optional()?;
    Ok(threat)
}

fn find_active_by_url(conn: &Connection, kind: ItemKind, url: &str) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE url = ?1 AND status != 'archived'",
                item_columns(kind),
                kind.table()
            ),
            params![url],
            |row| item_from_row(kind, row),
        )
        .optional()?;
    Ok(item)
}

fn find_archived_by_url(conn: &Connection, kind: ItemKind, url: &str) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE url = ?1 AND status = 'archived'
                 ORDER BY updated_at DESC, id DESC LIMIT 1",
                item_columns(kind),
                kind.table()
            ),
            params![url],
            |row| item_from_row(kind, row),
        )
        .optional()?;
    Ok(item)
}

fn query_items(
    conn: &Connection,
    kind: ItemKind,
    filter: &str,
    order: &str,
    status: Option<ItemStatus>,
) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}",
        item_columns(kind),
        kind.table(),
        filter,
        order
    ))?;

    let items = match status {
        Some(status) => stmt
            .query_map(params![status.as_str()], |row| item_from_row(kind, row))?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], |row| item_from_row(kind, row))?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(items)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Store for SqliteStore {
    fn create_item(&self, kind: ItemKind, item: &NewItem) -> Result<Item> {
        let url = item.normalized_url()?;
        let table = kind.table();
        let text_column = kind.text_column();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if find_active_by_url(&tx, kind, &url)?.is_some() {
            return Err(LowdownError::Conflict { kind, url });
        }

        let now = Self::now();
        let position = ordering::next_position(&tx, kind)?;

        let id = match find_archived_by_url(&tx, kind, &url)? {
            Some(archived) => {
                let title = non_blank(&item.title)
                    .map(String::from)
                    .unwrap_or(archived.title);
                let source = non_blank(&item.source)
                    .map(String::from)
                    .unwrap_or(archived.source);
                let summary = item.summary.clone().or(archived.summary);

                tx.execute(
                    &format!(
                        "UPDATE {} SET status = ?1, position = ?2, title = ?3, source = ?4,
                         {} = ?5, updated_at = ?6 WHERE id = ?7",
                        table, text_column
                    ),
                    params![
                        ItemStatus::Pending.as_str(),
                        position,
                        title,
                        source,
                        summary,
                        now,
                        archived.id
                    ],
                )?;
                info!(
                    "Resurrected archived {} {} at position {}",
                    kind, archived.id, position
                );
                archived.id
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (url, title, source, {}, status, position, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                        table, text_column
                    ),
                    params![
                        url,
                        item.resolved_title(&url),
                        item.resolved_source(),
                        item.summary,
                        ItemStatus::Pending.as_str(),
                        position,
                        now
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        let created = require_item(&tx, kind, id)?;
        tx.commit()?;
        debug!("Stored {} {} ({})", kind, created.id, created.url);
        Ok(created)
    }

    fn get_item(&self, kind: ItemKind, id: i64) -> Result<Option<Item>> {
        let conn = self.lock()?;
        load_item(&conn, kind, id)
    }

    fn list_active(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            kind,
            "status != 'archived'",
            "position ASC, id ASC",
            None,
        )
    }

    fn list_archived(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            kind,
            "status = 'archived'",
            "updated_at DESC, id DESC",
            None,
        )
    }

    fn list_by_status(&self, kind: ItemKind, status: ItemStatus) -> Result<Vec<Item>> {
        if status == ItemStatus::Archived {
            return self.list_archived(kind);
        }
        let conn = self.lock()?;
        query_items(&conn, kind, "status = ?1", "position ASC, id ASC", Some(status))
    }

    fn update_item(&self, kind: ItemKind, id: i64, update: &ItemUpdate) -> Result<Item> {
        let table = kind.table();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = require_item(&tx, kind, id)?;
        let now = Self::now();

        if let Some(ref url) = update.url {
            let url = NewItem::new(url.clone()).normalized_url()?;
            if url != current.url {
                if current.is_active() {
                    if let Some(other) = find_active_by_url(&tx, kind, &url)? {
                        if other.id != id {
                            return Err(LowdownError::Conflict { kind, url });
                        }
                    }
                }
                tx.execute(
                    &format!("UPDATE {} SET url = ?1 WHERE id = ?2", table),
                    params![url, id],
                )?;
            }
        }
        if let Some(ref title) = update.title {
            tx.execute(
                &format!("UPDATE {} SET title = ?1 WHERE id = ?2", table),
                params![title, id],
            )?;
        }
        if let Some(ref source) = update.source {
            tx.execute(
                &format!("UPDATE {} SET source = ?1 WHERE id = ?2", table),
                params![source, id],
            )?;
        }
        if let Some(ref summary) = update.summary {
            tx.execute(
                &format!("UPDATE {} SET {} = ?1 WHERE id = ?2", table, kind.text_column()),
                params![summary, id],
            )?;
        }
        if let Some(ref content) = update.original_content {
            tx.execute(
                &format!("UPDATE {} SET original_content = ?1 WHERE id = ?2", table),
                params![content, id],
            )?;
        }
        if let Some(to) = update.status {
            if to != current.status {
                check_curator_transition(kind, current.status, to)?;
                tx.execute(
                    &format!("UPDATE {} SET status = ?1 WHERE id = ?2", table),
                    params![to.as_str(), id],
                )?;
                if to == ItemStatus::Archived {
                    ordering::reindex(&tx, kind, &now)?;
                }
                info!("{} {}: {} -> {}", kind, id, current.status, to);
            }
        }

        tx.execute(
            &format!("UPDATE {} SET updated_at = ?1 WHERE id = ?2", table),
            params![now, id],
        )?;

        if let Some(position) = update.position {
            ordering::move_to(&tx, kind, id, position, &now)?;
        }

        let updated = require_item(&tx, kind, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_item(&self, kind: ItemKind, id: i64) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;
        if deleted == 0 {
            return Ok(false);
        }

        let moved = ordering::reindex(&tx, kind, &Self::now())?;
        tx.commit()?;
        debug!("Deleted {} {}, re-indexed {} items", kind, id, moved);
        Ok(true)
    }

    fn transition(&self, kind: ItemKind, id: i64, to: ItemStatus) -> Result<Item> {
        self.update_item(kind, id, &ItemUpdate::status(to))
    }

    fn record_outcome(&self, kind: ItemKind, id: i64, outcome: &Outcome) -> Result<Item> {
        let table = kind.table();
        let text_column = kind.text_column();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = require_item(&tx, kind, id)?;
        let to = outcome.target_status(kind);
        check_transition(kind, current.status, to)?;

        let now = Self::now();
        match outcome {
            Outcome::Generated {
                title,
                text,
                original_content,
            } => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET {} = ?1, original_content = ?2, status = ?3, updated_at = ?4
                         WHERE id = ?5",
                        table, text_column
                    ),
                    params![text, original_content, to.as_str(), now, id],
                )?;
                if let Some(title) = title.as_deref().filter(|t| !t.trim().is_empty()) {
                    tx.execute(
                        &format!("UPDATE {} SET title = ?1 WHERE id = ?2", table),
                        params![title.trim(), id],
                    )?;
                }
            }
            Outcome::Failed {
                reason,
                original_content,
                ..
            } => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET {} = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
                        table, text_column
                    ),
                    params![reason, to.as_str(), now, id],
                )?;
                if let Some(content) = original_content {
                    tx.execute(
                        &format!("UPDATE {} SET original_content = ?1 WHERE id = ?2", table),
                        params![content, id],
                    )?;
                }
            }
        }

        let updated = require_item(&tx, kind, id)?;
        tx.commit()?;
        info!("{} {}: {} -> {}", kind, id, current.status, to);
        Ok(updated)
    }

    fn archive_accepted(&self, kind: ItemKind) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Self::now();

        let archived = tx.execute(
            &format!(
                "UPDATE {} SET status = 'archived', updated_at = ?1 WHERE status = 'accepted'",
                kind.table()
            ),
            params![now],
        )?;
        if archived > 0 {
            ordering::reindex(&tx, kind, &now)?;
        }

        tx.commit()?;
        info!("Archived {} accepted {} items", archived, kind);
        Ok(archived)
    }

    fn move_item(&self, kind: ItemKind, id: i64, position: i64) -> Result<Item> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        ordering::move_to(&tx, kind, id, position, &Self::now())?;
        let moved = require_item(&tx, kind, id)?;
        tx.commit()?;
        Ok(moved)
    }

    fn shift_item(&self, kind: ItemKind, id: i64, delta: i64) -> Result<Item> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = require_item(&tx, kind, id)?;
        ordering::move_to(&tx, kind, id, current.position + delta, &Self::now())?;
        let moved = require_item(&tx, kind, id)?;
        tx.commit()?;
        Ok(moved)
    }

    fn reindex(&self, kind: ItemKind) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let moved = ordering::reindex(&tx, kind, &Self::now())?;
        tx.commit()?;
        Ok(moved)
    }

    fn add_threat(&self, threat: &NewThreat) -> Result<Threat> {
        if threat.name.trim().is_empty() {
            return Err(LowdownError::Validation("threat name cannot be empty".into()));
        }

        let conn = self.lock()?;
        let now = Self::now();
        conn.execute(
            "INSERT INTO threats (name, type, country_of_origin, description, specifications,
                                  operators, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                threat.name.trim(),
                threat.threat_type,
                threat.country_of_origin,
                threat.description,
                encode_json(&threat.specifications)?,
                encode_json(&threat.operators)?,
                DEFAULT_THREAT_STATUS,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        let created = conn.query_row(
            &format!("SELECT {} FROM threats WHERE id = ?1", THREAT_COLUMNS),
            params![id],
            threat_from_row,
        )?;
        Ok(created)
    }

    fn get_threat(&self, id: i64) -> Result<Option<Threat>> {
        let conn = self.lock()?;
        load_threat(&conn, id)
    }

    fn list_threats(&self) -> Result<Vec<Threat>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM threats ORDER BY created_at DESC, id DESC",
            THREAT_COLUMNS
        ))?;
        let threats = stmt
            .query_map([], threat_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(threats)
    }

    fn update_threat(&self, id: i64, update: &ThreatUpdate) -> Result<Threat> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM threats WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(LowdownError::NotFound { kind: "Threat", id });
        }

        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(LowdownError::Validation("threat name cannot be empty".into()));
            }
            tx.execute(
                "UPDATE threats SET name = ?1 WHERE id = ?2",
                params![name.trim(), id],
            )?;
        }
        if let Some(ref threat_type) = update.threat_type {
            tx.execute(
                "UPDATE threats SET type = ?1 WHERE id = ?2",
                params![threat_type, id],
            )?;
        }
        if let Some(ref country) = update.country_of_origin {
            tx.execute(
                "UPDATE threats SET country_of_origin = ?1 WHERE id = ?2",
                params![country, id],
            )?;
        }
        if let Some(ref description) = update.description {
            tx.execute(
                "UPDATE threats SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }
        if update.specifications.is_some() {
            tx.execute(
                "UPDATE threats SET specifications = ?1 WHERE id = ?2",
                params![encode_json(&update.specifications)?, id],
            )?;
        }
        if let Some(year) = update.ioc_year {
            tx.execute(
                "UPDATE threats SET ioc_year = ?1 WHERE id = ?2",
                params![year, id],
            )?;
        }
        if update.operators.is_some() {
            tx.execute(
                "UPDATE threats SET operators = ?1 WHERE id = ?2",
                params![encode_json(&update.operators)?, id],
            )?;
        }
        if let Some(ref image_url) = update.image_url {
            tx.execute(
                "UPDATE threats SET image_url = ?1 WHERE id = ?2",
                params![image_url, id],
            )?;
        }
        if let Some(ref status) = update.status {
            tx.execute(
                "UPDATE threats SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
        }
        if let Some(ref tod_summary) = update.tod_summary {
            tx.execute(
                "UPDATE threats SET tod_summary = ?1 WHERE id = ?2",
                params![tod_summary, id],
            )?;
        }

        tx.execute(
            "UPDATE threats SET updated_at = ?1 WHERE id = ?2",
            params![Self::now(), id],
        )?;

        let updated = tx.query_row(
            &format!("SELECT {} FROM threats WHERE id = ?1", THREAT_COLUMNS),
            params![id],
            threat_from_row,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_threat(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM threats WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn add_podcast(&self, episode: &NewPodcastEpisode) -> Result<PodcastEpisode> {
        let conn = self.lock()?;
        newsletter::insert_podcast(&conn, episode, &Self::now())
    }

    fn get_podcast(&self, id: i64) -> Result<Option<PodcastEpisode>> {
        let conn = self.lock()?;
        newsletter::load_podcast(&conn, id)
    }

    fn list_podcasts(&self) -> Result<Vec<PodcastEpisode>> {
        let conn = self.lock()?;
        newsletter::list_podcasts(&conn)
    }

    fn update_podcast(&self, id: i64, update: &PodcastUpdate) -> Result<PodcastEpisode> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = newsletter::update_podcast(&tx, id, update, &Self::now())?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_podcast(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted = newsletter::delete_podcast(&tx, id)?;
        tx.commit()?;
        Ok(deleted)
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let created = newsletter::insert_issue(&tx, issue, &Self::now())?;
        tx.commit()?;
        info!(
            "Created issue {} with {} articles",
            created.id,
            issue.article_ids.len()
        );
        Ok(created)
    }

    fn get_issue(&self, id: i64) -> Result<Option<FullIssue>> {
        let conn = self.lock()?;
        newsletter::full_issue(&conn, id)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let conn = self.lock()?;
        newsletter::list_issues(&conn)
    }

    fn add_issue_articles(&self, id: i64, article_ids: &[i64]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let linked = newsletter::link_articles(&tx, id, article_ids, &Self::now())?;
        tx.commit()?;
        Ok(linked)
    }

    fn archive_issue(&self, id: i64) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let archived = newsletter::archive_issue(&tx, id, &Self::now())?;
        tx.commit()?;
        info!("Archived issue {} and {} articles", id, archived);
        Ok(archived)
    }
}
