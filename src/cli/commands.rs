use std::path::Path;

use serde_json::{Map, Value};

use crate::app::{AppContext, LowdownError, Result};
use crate::cli::{IssueAction, ItemAction, PodcastAction, ThreatAction};
use crate::domain::{
    FullIssue, Item, ItemKind, ItemStatus, ItemUpdate, NewIssue, NewItem, NewPodcastEpisode,
    NewThreat, PodcastEpisode, PodcastUpdate, Threat, ThreatUpdate,
};
use crate::export::{assemble, assemble_issue, ExportFormat};
use crate::store::Store;

pub async fn run_item(ctx: &AppContext, kind: ItemKind, action: ItemAction) -> Result<()> {
    match action {
        ItemAction::Add { url, title, source } => add_item(ctx, kind, url, title, source),
        ItemAction::Import { path, source } => import_items(ctx, kind, &path, source),
        ItemAction::List { archived, status } => list_items(ctx, kind, archived, status),
        ItemAction::Show { id } => show_item(ctx, kind, id),
        ItemAction::Edit {
            id,
            url,
            title,
            source,
            summary,
            status,
            position,
        } => {
            let update = ItemUpdate {
                url,
                title,
                source,
                summary,
                original_content: None,
                status,
                position,
            };
            edit_item(ctx, kind, id, &update)
        }
        ItemAction::Delete { id } => delete_item(ctx, kind, id),
        ItemAction::Move { id, position } => {
            let item = ctx.store.move_item(kind, id, position)?;
            print_moved(&item);
            Ok(())
        }
        ItemAction::Up { id } => {
            let item = ctx.store.move_up(kind, id)?;
            print_moved(&item);
            Ok(())
        }
        ItemAction::Down { id } => {
            let item = ctx.store.move_down(kind, id)?;
            print_moved(&item);
            Ok(())
        }
        ItemAction::Accept { id } => set_status(ctx, kind, id, ItemStatus::Accepted),
        ItemAction::Unaccept { id } => set_status(ctx, kind, id, kind.generated_status()),
        ItemAction::Archive { id } => set_status(ctx, kind, id, ItemStatus::Archived),
        ItemAction::ArchiveAccepted => {
            let count = ctx.store.archive_accepted(kind)?;
            println!("Archived {} accepted {} items", count, kind.label().to_lowercase());
            Ok(())
        }
        ItemAction::Summarize { id } => summarize(ctx, kind, id).await,
        ItemAction::SummarizeManual { id, content, file } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            summarize_manual(ctx, kind, id, &content).await
        }
        ItemAction::ProcessPending => process_pending(ctx, kind).await,
        ItemAction::Reindex => {
            let moved = ctx.store.reindex(kind)?;
            println!("Re-indexed {} items", moved);
            Ok(())
        }
        ItemAction::Export {
            format,
            appendix,
            threat,
            archive,
        } => {
            let format = format.unwrap_or(match kind {
                ItemKind::Article => ExportFormat::Newsletter,
                ItemKind::Snapshot => ExportFormat::Highlights,
            });
            let appendix = match (appendix, threat) {
                (Some(path), _) => Some(std::fs::read_to_string(path)?),
                (None, Some(id)) => Some(load_threat(ctx, id)?.analysis_block()),
                (None, None) => None,
            };
            export(ctx, kind, format, appendix.as_deref(), archive)
        }
    }
}

pub fn add_item(
    ctx: &AppContext,
    kind: ItemKind,
    url: String,
    title: Option<String>,
    source: Option<String>,
) -> Result<()> {
    let new = NewItem {
        url,
        title,
        source,
        summary: None,
    };
    let item = ctx.store.create_item(kind, &new)?;
    println!("Added {} #{} at position {}: {}", kind, item.id, item.position, item.url);
    Ok(())
}

pub fn import_items(
    ctx: &AppContext,
    kind: ItemKind,
    path: &Path,
    source: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)?;

    let mut added = 0;
    let mut rejected = 0;
    for line in content.lines() {
        let url = line.trim();
        if url.is_empty() || url.starts_with('#') {
            continue;
        }

        let new = NewItem {
            url: url.to_string(),
            source: source.clone(),
            ..Default::default()
        };
        match ctx.store.create_item(kind, &new) {
            Ok(_) => added += 1,
            Err(e) if e.is_rejection() || matches!(e, LowdownError::InvalidUrl(_)) => {
                rejected += 1;
                eprintln!("  Skipped {}: {}", url, e);
            }
            Err(e) => return Err(e),
        }
    }

    println!("Imported {} items, {} skipped", added, rejected);
    Ok(())
}

pub fn list_items(
    ctx: &AppContext,
    kind: ItemKind,
    archived: bool,
    status: Option<ItemStatus>,
) -> Result<()> {
    let items = match (archived, status) {
        (true, _) => ctx.store.list_archived(kind)?,
        (false, Some(status)) => ctx.store.list_by_status(kind, status)?,
        (false, None) => ctx.store.list_active(kind)?,
    };

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for item in items {
        if archived {
            println!(
                "  #{:<5} {}  {}",
                item.id,
                item.updated_at.format("%Y-%m-%d"),
                item.title
            );
        } else {
            println!(
                "{:>3}. #{:<5} [{}] {}",
                item.position, item.id, item.status, item.title
            );
        }
    }

    Ok(())
}

pub fn show_item(ctx: &AppContext, kind: ItemKind, id: i64) -> Result<()> {
    let item = load_item(ctx, kind, id)?;

    println!("{} #{}", kind, item.id);
    println!("  Title:    {}", item.title);
    println!("  URL:      {}", item.url);
    println!("  Source:   {}", item.source);
    println!("  Status:   {}", item.status);
    if item.is_active() {
        println!("  Position: {}", item.position);
    }
    println!("  Created:  {}", item.created_at.to_rfc3339());
    println!("  Updated:  {}", item.updated_at.to_rfc3339());
    if let Some(content) = &item.original_content {
        println!("  Content:  {} chars", content.chars().count());
    }
    if let Some(text) = &item.summary {
        println!();
        println!("{}", text);
    }

    Ok(())
}

pub fn edit_item(ctx: &AppContext, kind: ItemKind, id: i64, update: &ItemUpdate) -> Result<()> {
    if update.is_empty() {
        println!("Nothing to change");
        return Ok(());
    }
    let item = ctx.store.update_item(kind, id, update)?;
    println!("Updated {} #{} [{}]", kind, item.id, item.status);
    Ok(())
}

pub fn delete_item(ctx: &AppContext, kind: ItemKind, id: i64) -> Result<()> {
    if !ctx.store.delete_item(kind, id)? {
        return Err(LowdownError::not_found(kind, id));
    }
    println!("Deleted {} #{}", kind, id);
    Ok(())
}

fn set_status(ctx: &AppContext, kind: ItemKind, id: i64, status: ItemStatus) -> Result<()> {
    let item = ctx.store.transition(kind, id, status)?;
    println!("{} #{} is now {}", kind, item.id, item.status);
    Ok(())
}

fn print_moved(item: &Item) {
    println!("{} #{} is at position {}", item.kind, item.id, item.position);
}

fn print_outcome(item: &Item) {
    if item.status.is_failure() {
        eprintln!(
            "{} #{} {}: {}",
            item.kind,
            item.id,
            item.status,
            item.summary.as_deref().unwrap_or_default()
        );
    } else {
        println!("{} #{} {}: {}", item.kind, item.id, item.status, item.title);
        if let Some(text) = &item.summary {
            println!();
            println!("{}", text);
        }
    }
}

pub async fn summarize(ctx: &AppContext, kind: ItemKind, id: i64) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let item = pipeline.acquire_and_generate(kind, id).await?;
    print_outcome(&item);
    Ok(())
}

pub async fn summarize_manual(ctx: &AppContext, kind: ItemKind, id: i64, content: &str) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let item = pipeline.generate_from_manual(kind, id, content).await?;
    print_outcome(&item);
    Ok(())
}

pub async fn process_pending(ctx: &AppContext, kind: ItemKind) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let report = pipeline.process_pending(kind, &ctx.batch).await?;

    if report.results.is_empty() {
        println!("No pending items");
        return Ok(());
    }

    for item in report.generated() {
        println!("  #{} {}", item.id, item.title);
    }
    let failures = report.failures();
    for (id, reason) in &failures {
        eprintln!("  #{} failed: {}", id, reason);
    }

    println!(
        "Processed {} items: {} generated, {} failed",
        report.results.len(),
        report.generated().len(),
        failures.len()
    );
    Ok(())
}

pub fn export(
    ctx: &AppContext,
    kind: ItemKind,
    format: ExportFormat,
    appendix: Option<&str>,
    archive: bool,
) -> Result<()> {
    let items = ctx.store.list_by_status(kind, ItemStatus::Accepted)?;
    if items.is_empty() && appendix.is_none() {
        eprintln!("No accepted items to export");
        return Ok(());
    }

    let export = assemble(&items, format, appendix);
    println!("{}", export.text);

    if !export.skipped.is_empty() {
        let ids: Vec<String> = export.skipped.iter().map(|id| format!("#{}", id)).collect();
        eprintln!("Skipped items with no generated text: {}", ids.join(", "));
    }

    if archive {
        let count = ctx.store.archive_accepted(kind)?;
        eprintln!("Archived {} accepted items", count);
    }

    Ok(())
}

// Threats

pub fn run_threat(ctx: &AppContext, action: ThreatAction) -> Result<()> {
    match action {
        ThreatAction::Add {
            name,
            threat_type,
            country,
            description,
            specs,
            operators,
        } => {
            let new = NewThreat {
                name,
                threat_type,
                country_of_origin: country,
                description,
                specifications: specs.as_deref().map(parse_specs).transpose()?,
                operators: operators.as_deref().map(parse_operators),
            };
            let threat = ctx.store.add_threat(&new)?;
            println!("Added threat #{}: {}", threat.id, threat.name);
            Ok(())
        }
        ThreatAction::List => {
            let threats = ctx.store.list_threats()?;
            if threats.is_empty() {
                println!("No threats");
            }
            for threat in threats {
                println!(
                    "  #{:<5} [{}] {} ({})",
                    threat.id,
                    threat.status,
                    threat.name,
                    threat.threat_type.as_deref().unwrap_or("unknown")
                );
            }
            Ok(())
        }
        ThreatAction::Show { id } => {
            show_threat(&load_threat(ctx, id)?);
            Ok(())
        }
        ThreatAction::Edit {
            id,
            name,
            threat_type,
            country,
            description,
            specs,
            ioc_year,
            operators,
            image_url,
            status,
            tod_summary,
        } => {
            let update = ThreatUpdate {
                name,
                threat_type,
                country_of_origin: country,
                description,
                specifications: specs.as_deref().map(parse_specs).transpose()?,
                ioc_year,
                operators: operators.as_deref().map(parse_operators),
                image_url,
                status,
                tod_summary,
            };
            let threat = ctx.store.update_threat(id, &update)?;
            println!("Updated threat #{}: {}", threat.id, threat.name);
            Ok(())
        }
        ThreatAction::Delete { id } => {
            if !ctx.store.delete_threat(id)? {
                return Err(LowdownError::NotFound { kind: "Threat", id });
            }
            println!("Deleted threat #{}", id);
            Ok(())
        }
    }
}

fn show_threat(threat: &Threat) {
    println!("Threat #{}: {}", threat.id, threat.name);
    if let Some(t) = &threat.threat_type {
        println!("  Type:      {}", t);
    }
    if let Some(c) = &threat.country_of_origin {
        println!("  Origin:    {}", c);
    }
    if let Some(year) = threat.ioc_year {
        println!("  IOC:       {}", year);
    }
    if let Some(ops) = &threat.operators {
        println!("  Operators: {}", ops.join(", "));
    }
    println!("  Status:    {}", threat.status);
    if let Some(specs) = &threat.specifications {
        for (key, value) in specs {
            match value {
                Value::String(s) => println!("  {}: {}", key, s),
                other => println!("  {}: {}", key, other),
            }
        }
    }
    println!();
    println!("{}", threat.analysis_block());
}

// Newsletter issues

pub fn run_issue(ctx: &AppContext, action: IssueAction) -> Result<()> {
    match action {
        IssueAction::Create {
            title,
            articles,
            accepted,
            intro,
            outro,
            threat,
            podcast,
            date,
        } => {
            let article_ids = if accepted {
                ctx.store
                    .list_by_status(ItemKind::Article, ItemStatus::Accepted)?
                    .into_iter()
                    .map(|article| article.id)
                    .collect()
            } else {
                articles
            };
            let new = NewIssue {
                title,
                intro_text: intro,
                outro_text: outro,
                featured_threat_id: threat,
                featured_podcast_id: podcast,
                publication_date: date,
                article_ids,
            };
            let issue = ctx.store.create_issue(&new)?;
            println!(
                "Created issue #{}: {} ({} articles)",
                issue.id,
                issue.title,
                new.article_ids.len()
            );
            Ok(())
        }
        IssueAction::List => {
            let issues = ctx.store.list_issues()?;
            if issues.is_empty() {
                println!("No issues");
            }
            for issue in issues {
                println!(
                    "  #{:<5} {} [{}] {}",
                    issue.id, issue.publication_date, issue.status, issue.title
                );
            }
            Ok(())
        }
        IssueAction::Show { id } => {
            show_issue(&load_issue(ctx, id)?);
            Ok(())
        }
        IssueAction::AddArticles { id, articles } => {
            let linked = ctx.store.add_issue_articles(id, &articles)?;
            println!("Linked {} new articles to issue #{}", linked, id);
            Ok(())
        }
        IssueAction::Archive { id } => {
            let archived = ctx.store.archive_issue(id)?;
            println!("Archived issue #{} and {} articles", id, archived);
            Ok(())
        }
        IssueAction::Export { id, archive } => export_issue(ctx, id, archive),
    }
}

pub fn export_issue(ctx: &AppContext, id: i64, archive: bool) -> Result<()> {
    let export = assemble_issue(&load_issue(ctx, id)?);
    println!("{}", export.text);

    if !export.skipped.is_empty() {
        let ids: Vec<String> = export.skipped.iter().map(|id| format!("#{}", id)).collect();
        eprintln!("Skipped articles with no generated text: {}", ids.join(", "));
    }

    if archive {
        let count = ctx.store.archive_issue(id)?;
        eprintln!("Archived issue #{} and {} articles", id, count);
    }
    Ok(())
}

fn show_issue(full: &FullIssue) {
    let issue = &full.issue;
    println!("Issue #{}: {}", issue.id, issue.title);
    println!("  Date:    {}", issue.publication_date);
    println!("  Status:  {}", issue.status);
    if let Some(threat) = &full.featured_threat {
        println!("  Threat:  #{} {}", threat.id, threat.name);
    }
    if let Some(podcast) = &full.featured_podcast {
        println!("  Podcast: #{} {}", podcast.id, podcast.title);
    }
    println!();
    for (i, article) in full.articles.iter().enumerate() {
        println!(
            "{:>3}. #{:<5} [{}] {}",
            i + 1,
            article.id,
            article.status,
            article.title
        );
    }
}

// Podcast episodes

pub fn run_podcast(ctx: &AppContext, action: PodcastAction) -> Result<()> {
    match action {
        PodcastAction::Add {
            title,
            url,
            description,
            published,
            image_url,
        } => {
            let new = NewPodcastEpisode {
                title,
                podcast_url: url,
                description,
                published_date: published,
                image_url,
            };
            let episode = ctx.store.add_podcast(&new)?;
            println!("Added episode #{}: {}", episode.id, episode.title);
            Ok(())
        }
        PodcastAction::List => {
            let episodes = ctx.store.list_podcasts()?;
            if episodes.is_empty() {
                println!("No episodes");
            }
            for episode in episodes {
                println!(
                    "  #{:<5} {} {}",
                    episode.id,
                    episode.published_date.as_deref().unwrap_or("----------"),
                    episode.title
                );
            }
            Ok(())
        }
        PodcastAction::Show { id } => {
            show_podcast(&load_podcast(ctx, id)?);
            Ok(())
        }
        PodcastAction::Edit {
            id,
            title,
            url,
            description,
            published,
            image_url,
        } => {
            let update = PodcastUpdate {
                title,
                podcast_url: url,
                description,
                published_date: published,
                image_url,
            };
            let episode = ctx.store.update_podcast(id, &update)?;
            println!("Updated episode #{}: {}", episode.id, episode.title);
            Ok(())
        }
        PodcastAction::Delete { id } => {
            if !ctx.store.delete_podcast(id)? {
                return Err(LowdownError::NotFound {
                    kind: "Podcast episode",
                    id,
                });
            }
            println!("Deleted episode #{}", id);
            Ok(())
        }
    }
}

fn show_podcast(episode: &PodcastEpisode) {
    println!("Episode #{}: {}", episode.id, episode.title);
    println!("  URL:       {}", episode.podcast_url);
    if let Some(date) = &episode.published_date {
        println!("  Published: {}", date);
    }
    if let Some(image) = &episode.image_url {
        println!("  Image:     {}", image);
    }
    println!();
    println!("{}", episode.feature_block());
}

fn load_item(ctx: &AppContext, kind: ItemKind, id: i64) -> Result<Item> {
    ctx.store
        .get_item(kind, id)?
        .ok_or_else(|| LowdownError::not_found(kind, id))
}

fn load_threat(ctx: &AppContext, id: i64) -> Result<Threat> {
    ctx.store
        .get_threat(id)?
        .ok_or(LowdownError::NotFound { kind: "Threat", id })
}

fn load_issue(ctx: &AppContext, id: i64) -> Result<FullIssue> {
    ctx.store
        .get_issue(id)?
        .ok_or(LowdownError::NotFound { kind: "Issue", id })
}

fn load_podcast(ctx: &AppContext, id: i64) -> Result<PodcastEpisode> {
    ctx.store.get_podcast(id)?.ok_or(LowdownError::NotFound {
        kind: "Podcast episode",
        id,
    })
}

fn parse_specs(raw: &str) -> Result<Map<String, Value>> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_operators(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn ctx() -> AppContext {
        AppContext::in_memory(Config::default()).unwrap()
    }

    #[test]
    fn test_import_skips_duplicates_and_comments() {
        let ctx = ctx();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "# morning reads\nhttps://example.com/a\n\nhttps://example.com/a\nnot a url\nhttps://example.com/b\n",
        )
        .unwrap();

        import_items(&ctx, ItemKind::Article, &path, Some("rss".into())).unwrap();

        let items = ctx.store.list_active(ItemKind::Article).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.source == "rss"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let err = delete_item(&ctx(), ItemKind::Snapshot, 5).unwrap_err();
        assert!(matches!(err, LowdownError::NotFound { id: 5, .. }));
    }

    #[test]
    fn test_export_with_archive_clears_accepted() {
        let ctx = ctx();
        let item = ctx
            .store
            .create_item(ItemKind::Article, &NewItem::new("https://example.com/a"))
            .unwrap();
        ctx.store
            .record_outcome(
                ItemKind::Article,
                item.id,
                &crate::domain::Outcome::Generated {
                    title: None,
                    text: "Body".into(),
                    original_content: "raw".into(),
                },
            )
            .unwrap();
        ctx.store
            .transition(ItemKind::Article, item.id, ItemStatus::Accepted)
            .unwrap();

        export(&ctx, ItemKind::Article, ExportFormat::Newsletter, None, true).unwrap();
        assert!(ctx.store.list_active(ItemKind::Article).unwrap().is_empty());
        assert_eq!(ctx.store.list_archived(ItemKind::Article).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_threat_inputs() {
        assert_eq!(
            parse_operators("Russia, India ,, China"),
            vec!["Russia", "India", "China"]
        );
        let specs = parse_specs(r#"{"range":"400 km","mach":14}"#).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(matches!(parse_specs("[1,2]"), Err(LowdownError::Json(_))));
    }

    #[test]
    fn test_threat_commands() {
        let ctx = ctx();
        run_threat(
            &ctx,
            ThreatAction::Add {
                name: "S-400".into(),
                threat_type: Some("SAM".into()),
                country: Some("Russia".into()),
                description: None,
                specs: None,
                operators: Some("Russia, India".into()),
            },
        )
        .unwrap();

        let threat = &ctx.store.list_threats().unwrap()[0];
        assert_eq!(threat.operators.as_ref().unwrap().len(), 2);

        let err = run_threat(&ctx, ThreatAction::Delete { id: threat.id + 1 }).unwrap_err();
        assert!(matches!(err, LowdownError::NotFound { kind: "Threat", .. }));
    }

    fn generated_article(ctx: &AppContext, path: &str) -> i64 {
        let item = ctx
            .store
            .create_item(
                ItemKind::Article,
                &NewItem::new(format!("https://example.com/{}", path)),
            )
            .unwrap();
        ctx.store
            .record_outcome(
                ItemKind::Article,
                item.id,
                &crate::domain::Outcome::Generated {
                    title: None,
                    text: format!("Story {}", path),
                    original_content: "raw".into(),
                },
            )
            .unwrap();
        item.id
    }

    #[test]
    fn test_issue_from_accepted_then_export_and_archive() {
        let ctx = ctx();
        let a = generated_article(&ctx, "a");
        let b = generated_article(&ctx, "b");
        let kept = generated_article(&ctx, "kept");
        for id in [a, b] {
            ctx.store
                .transition(ItemKind::Article, id, ItemStatus::Accepted)
                .unwrap();
        }
        ctx.store.move_item(ItemKind::Article, b, 1).unwrap();

        run_issue(
            &ctx,
            IssueAction::Create {
                title: "Issue 1".into(),
                articles: vec![],
                accepted: true,
                intro: None,
                outro: None,
                threat: None,
                podcast: None,
                date: None,
            },
        )
        .unwrap();

        let issue_id = ctx.store.list_issues().unwrap()[0].id;
        let full = load_issue(&ctx, issue_id).unwrap();
        let ids: Vec<i64> = full.articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![b, a]);

        export_issue(&ctx, issue_id, true).unwrap();
        let active = ctx.store.list_active(ItemKind::Article).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!((active[0].id, active[0].position), (kept, 1));
    }

    #[test]
    fn test_podcast_commands() {
        let ctx = ctx();
        run_podcast(
            &ctx,
            PodcastAction::Add {
                title: "Episode 1".into(),
                url: "https://pod.example.com/1".into(),
                description: None,
                published: Some("2026-10-01".into()),
                image_url: None,
            },
        )
        .unwrap();
        let id = ctx.store.list_podcasts().unwrap()[0].id;

        run_podcast(&ctx, PodcastAction::Delete { id }).unwrap();
        let err = run_podcast(&ctx, PodcastAction::Show { id }).unwrap_err();
        assert!(matches!(err, LowdownError::NotFound { kind: "Podcast episode", .. }));
    }
}
