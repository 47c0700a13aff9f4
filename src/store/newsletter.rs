//! Podcast episodes and newsletter issues.
//!
//! As in [`super::ordering`], functions that run more than one statement
//! expect the caller to have opened a transaction on `conn`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::app::{LowdownError, Result};
use crate::domain::issue::dedup_ids;
use crate::domain::podcast::{validate_podcast_url, validate_title};
use crate::domain::{
    FullIssue, Issue, IssueStatus, ItemKind, NewIssue, NewPodcastEpisode, PodcastEpisode,
    PodcastUpdate,
};
use crate::store::ordering;
use crate::store::sqlite::{load_item, load_threat, require_item, SqliteStore};

const PODCAST_COLUMNS: &str =
    "id, title, podcast_url, description, published_date, image_url, created_at, updated_at";

const ISSUE_COLUMNS: &str = "id, title, intro_text, outro_text, featured_threat_id, \
     featured_podcast_id, status, publication_date, created_at, updated_at";

const PODCAST: &str = "Podcast episode";
const ISSUE: &str = "Issue";

fn timestamp(row: &Row, index: usize) -> DateTime<Utc> {
    row.get::<_, String>(index)
        .ok()
        .and_then(|s| SqliteStore::parse_datetime(&s))
        .unwrap_or_else(Utc::now)
}

fn podcast_from_row(row: &Row) -> rusqlite::Result<PodcastEpisode> {
    Ok(PodcastEpisode {
        id: row.get(0)?,
        title: row.get(1)?,
        podcast_url: row.get(2)?,
        description: row.get(3)?,
        published_date: row.get(4)?,
        image_url: row.get(5)?,
        created_at: timestamp(row, 6),
        updated_at: timestamp(row, 7),
    })
}

fn issue_from_row(row: &Row) -> rusqlite::Result<Issue> {
    let status: String = row.get(6)?;
    let status = status.parse::<IssueStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        )
    })?;

    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        intro_text: row.get(2)?,
        outro_text: row.get(3)?,
        featured_threat_id: row.get(4)?,
        featured_podcast_id: row.get(5)?,
        status,
        publication_date: row.get(7)?,
        created_at: timestamp(row, 8),
        updated_at: timestamp(row, 9),
    })
}

// Podcast episodes

pub fn load_podcast(conn: &Connection, id: i64) -> Result<Option<PodcastEpisode>> {
    let episode = conn
        .query_row(
            &format!("SELECT {} FROM podcast_episodes WHERE id = ?1", PODCAST_COLUMNS),
            params![id],
            podcast_from_row,
        )
        .optional()?;
    Ok(episode)
}

fn require_podcast(conn: &Connection, id: i64) -> Result<PodcastEpisode> {
    load_podcast(conn, id)?.ok_or(LowdownError::NotFound { kind: PODCAST, id })
}

pub fn insert_podcast(
    conn: &Connection,
    episode: &NewPodcastEpisode,
    now: &str,
) -> Result<PodcastEpisode> {
    let title = validate_title(&episode.title)?;
    let podcast_url = validate_podcast_url(&episode.podcast_url)?;

    conn.execute(
        "INSERT INTO podcast_episodes (title, podcast_url, description, published_date,
                                       image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            title,
            podcast_url,
            episode.description,
            episode.published_date,
            episode.image_url,
            now
        ],
    )?;
    require_podcast(conn, conn.last_insert_rowid())
}

pub fn list_podcasts(conn: &Connection) -> Result<Vec<PodcastEpisode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM podcast_episodes ORDER BY created_at DESC, id DESC",
        PODCAST_COLUMNS
    ))?;
    let episodes = stmt
        .query_map([], podcast_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(episodes)
}

pub fn update_podcast(
    conn: &Connection,
    id: i64,
    update: &PodcastUpdate,
    now: &str,
) -> Result<PodcastEpisode> {
    require_podcast(conn, id)?;

    if let Some(ref title) = update.title {
        conn.execute(
            "UPDATE podcast_episodes SET title = ?1 WHERE id = ?2",
            params![validate_title(title)?, id],
        )?;
    }
    if let Some(ref url) = update.podcast_url {
        conn.execute(
            "UPDATE podcast_episodes SET podcast_url = ?1 WHERE id = ?2",
            params![validate_podcast_url(url)?, id],
        )?;
    }
    if let Some(ref description) = update.description {
        conn.execute(
            "UPDATE podcast_episodes SET description = ?1 WHERE id = ?2",
            params![description, id],
        )?;
    }
    if let Some(ref published) = update.published_date {
        conn.execute(
            "UPDATE podcast_episodes SET published_date = ?1 WHERE id = ?2",
            params![published, id],
        )?;
    }
    if let Some(ref image_url) = update.image_url {
        conn.execute(
            "UPDATE podcast_episodes SET image_url = ?1 WHERE id = ?2",
            params![image_url, id],
        )?;
    }

    conn.execute(
        "UPDATE podcast_episodes SET updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    require_podcast(conn, id)
}

/// Delete an episode, unlinking it from every issue that features it.
pub fn delete_podcast(conn: &Connection, id: i64) -> Result<bool> {
    conn.execute(
        "UPDATE newsletter_issues SET featured_podcast_id = NULL WHERE featured_podcast_id = ?1",
        params![id],
    )?;
    let deleted = conn.execute("DELETE FROM podcast_episodes WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// Newsletter issues

pub fn load_issue(conn: &Connection, id: i64) -> Result<Option<Issue>> {
    let issue = conn
        .query_row(
            &format!("SELECT {} FROM newsletter_issues WHERE id = ?1", ISSUE_COLUMNS),
            params![id],
            issue_from_row,
        )
        .optional()?;
    Ok(issue)
}

fn require_issue(conn: &Connection, id: i64) -> Result<Issue> {
    load_issue(conn, id)?.ok_or(LowdownError::NotFound { kind: ISSUE, id })
}

fn require_draft(conn: &Connection, id: i64) -> Result<Issue> {
    let issue = require_issue(conn, id)?;
    if issue.status == IssueStatus::Archived {
        return Err(LowdownError::Validation(format!(
            "issue {} is already archived",
            id
        )));
    }
    Ok(issue)
}

pub fn insert_issue(conn: &Connection, new: &NewIssue, now: &str) -> Result<Issue> {
    let title = validate_title(&new.title)?;

    if let Some(threat_id) = new.featured_threat_id {
        if load_threat(conn, threat_id)?.is_none() {
            return Err(LowdownError::NotFound {
                kind: "Threat",
                id: threat_id,
            });
        }
    }
    if let Some(podcast_id) = new.featured_podcast_id {
        require_podcast(conn, podcast_id)?;
    }

    let publication_date = new
        .publication_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

    conn.execute(
        "INSERT INTO newsletter_issues (title, intro_text, outro_text, featured_threat_id,
                                        featured_podcast_id, status, publication_date,
                                        created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            title,
            new.intro_text,
            new.outro_text,
            new.featured_threat_id,
            new.featured_podcast_id,
            IssueStatus::Draft.as_str(),
            publication_date,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();

    link_articles(conn, id, &new.article_ids, now)?;
    require_issue(conn, id)
}

/// Append articles to a draft issue after those already linked. Ids that
/// are already linked are ignored; an unknown article id is `NotFound`.
pub fn link_articles(
    conn: &Connection,
    issue_id: i64,
    article_ids: &[i64],
    now: &str,
) -> Result<usize> {
    require_draft(conn, issue_id)?;

    let mut next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM newsletter_articles WHERE newsletter_id = ?1",
        params![issue_id],
        |row| row.get(0),
    )?;

    let mut linked = 0;
    for article_id in dedup_ids(article_ids) {
        require_item(conn, ItemKind::Article, article_id)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO newsletter_articles (newsletter_id, article_id, sort_order)
             VALUES (?1, ?2, ?3)",
            params![issue_id, article_id, next],
        )?;
        if inserted > 0 {
            next += 1;
            linked += 1;
        }
    }

    if linked > 0 {
        conn.execute(
            "UPDATE newsletter_issues SET updated_at = ?1 WHERE id = ?2",
            params![now, issue_id],
        )?;
    }
    Ok(linked)
}

pub fn list_issues(conn: &Connection) -> Result<Vec<Issue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM newsletter_issues ORDER BY created_at DESC, id DESC",
        ISSUE_COLUMNS
    ))?;
    let issues = stmt
        .query_map([], issue_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(issues)
}

pub fn full_issue(conn: &Connection, id: i64) -> Result<Option<FullIssue>> {
    let Some(issue) = load_issue(conn, id)? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT article_id FROM newsletter_articles WHERE newsletter_id = ?1 ORDER BY sort_order",
    )?;
    let article_ids = stmt
        .query_map(params![id], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut articles = Vec::with_capacity(article_ids.len());
    for article_id in article_ids {
        if let Some(article) = load_item(conn, ItemKind::Article, article_id)? {
            articles.push(article);
        }
    }

    let featured_threat = match issue.featured_threat_id {
        Some(threat_id) => load_threat(conn, threat_id)?,
        None => None,
    };
    let featured_podcast = match issue.featured_podcast_id {
        Some(podcast_id) => load_podcast(conn, podcast_id)?,
        None => None,
    };

    Ok(Some(FullIssue {
        issue,
        articles,
        featured_threat,
        featured_podcast,
    }))
}

/// Archive a draft issue and every active article linked to it, then
/// re-index the remaining active articles. Returns the number of articles
/// archived.
pub fn archive_issue(conn: &Connection, id: i64, now: &str) -> Result<usize> {
    require_draft(conn, id)?;

    conn.execute(
        "UPDATE newsletter_issues SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![IssueStatus::Archived.as_str(), now, id],
    )?;

    let archived = conn.execute(
        "UPDATE articles SET status = 'archived', updated_at = ?1
         WHERE status != 'archived'
           AND id IN (SELECT article_id FROM newsletter_articles WHERE newsletter_id = ?2)",
        params![now, id],
    )?;
    if archived > 0 {
        ordering::reindex(conn, ItemKind::Article, now)?;
    }

    Ok(archived)
}
