//! Export Assembler: turns an ordered list of accepted items into the text
//! pasted into the newsletter tool.
//!
//! Assembly is a pure function of its inputs. It never sorts or filters by
//! status; the caller passes items already in position order. Items with no
//! generated text are left out and their ids reported in
//! [`Export::skipped`].
//!
//! [`assemble_issue`] wraps the same newsletter assembly in the frame of a
//! stored issue.

use std::fmt;
use std::str::FromStr;

use crate::app::{LowdownError, Result};
use crate::domain::{FullIssue, Item};

pub const NEWSLETTER_SEPARATOR: &str = "\n\n---\n\n";
pub const HIGHLIGHT_SEPARATOR: &str = "\n\n";
pub const TRANSCRIPT_HEADING: &str = "## Today's Stories";
pub const TOP_STORIES_HEADING: &str = "## 🎯 Top Stories";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Article summaries separated by horizontal rules.
    #[default]
    Newsletter,
    /// Snapshot highlights, one paragraph each.
    Highlights,
    /// Numbered story outline for the podcast script.
    Transcript,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Newsletter => "newsletter",
            ExportFormat::Highlights => "highlights",
            ExportFormat::Transcript => "transcript",
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            ExportFormat::Highlights => HIGHLIGHT_SEPARATOR,
            ExportFormat::Newsletter | ExportFormat::Transcript => NEWSLETTER_SEPARATOR,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = LowdownError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "newsletter" => Ok(ExportFormat::Newsletter),
            "highlights" => Ok(ExportFormat::Highlights),
            "transcript" => Ok(ExportFormat::Transcript),
            other => Err(LowdownError::Validation(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub text: String,
    /// Ids of items left out because they had no generated text.
    pub skipped: Vec<i64>,
}

/// Assemble `items` in the given order. `appendix` (a threat or research
/// block) is appended verbatim after a separator, or stands alone when no
/// item produced text.
pub fn assemble(items: &[Item], format: ExportFormat, appendix: Option<&str>) -> Export {
    let mut sections = Vec::new();
    let mut skipped = Vec::new();

    for item in items {
        match item.export_text() {
            Some(text) => sections.push((item, text)),
            None => skipped.push(item.id),
        }
    }

    let mut text = match format {
        ExportFormat::Newsletter | ExportFormat::Highlights => sections
            .iter()
            .map(|(_, text)| *text)
            .collect::<Vec<_>>()
            .join(format.separator()),
        ExportFormat::Transcript if sections.is_empty() => String::new(),
        ExportFormat::Transcript => {
            let stories = sections
                .iter()
                .enumerate()
                .map(|(i, (item, text))| {
                    format!(
                        "### Story {}: {}\n\n**Quick Summary:**\n{}",
                        i + 1,
                        item.title.trim(),
                        text
                    )
                })
                .collect::<Vec<_>>()
                .join(NEWSLETTER_SEPARATOR);
            format!("{}\n\n{}", TRANSCRIPT_HEADING, stories)
        }
    };

    if let Some(appendix) = appendix.filter(|a| !a.trim().is_empty()) {
        if !text.is_empty() {
            text.push_str(format.separator());
        }
        text.push_str(appendix);
    }

    Export { text, skipped }
}

/// Assemble an issue: `# title`, intro, the linked articles under the top
/// stories heading, the featured threat and podcast, then the outro. Empty
/// parts are left out. Articles sitting in a failure status are skipped, since
/// their text is a failure reason.
pub fn assemble_issue(full: &FullIssue) -> Export {
    let exportable: Vec<Item> = full
        .articles
        .iter()
        .filter(|article| !article.status.is_failure())
        .cloned()
        .collect();
    let stories = assemble(&exportable, ExportFormat::Newsletter, None);

    let mut parts = vec![format!("# {}", full.issue.title.trim())];
    if let Some(intro) = non_blank(full.issue.intro_text.as_deref()) {
        parts.push(intro.to_string());
    }
    if !stories.text.is_empty() {
        parts.push(format!("{}\n\n{}", TOP_STORIES_HEADING, stories.text));
    }
    if let Some(threat) = &full.featured_threat {
        parts.push(threat.feature_block());
    }
    if let Some(podcast) = &full.featured_podcast {
        parts.push(podcast.feature_block());
    }
    if let Some(outro) = non_blank(full.issue.outro_text.as_deref()) {
        parts.push(outro.to_string());
    }

    let skipped = full
        .articles
        .iter()
        .filter(|a| a.status.is_failure() || stories.skipped.contains(&a.id))
        .map(|a| a.id)
        .collect();

    Export {
        text: parts.join("\n\n"),
        skipped,
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
