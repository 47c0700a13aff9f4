//! Parsing of the labelled reply the model is asked to produce.
//!
//! Articles:
//!
//! ```text
//! HEADLINE: <one line>
//! SUMMARY_BODY: <markdown, may span lines>
//! ```
//!
//! Snapshots use `HEADLINE:` and `HIGHLIGHT:` (one sentence on one line).
//! Labels may be wrapped in markdown bold. A missing or empty section is an
//! error.

use crate::app::{LowdownError, Result};
use crate::generator::Generated;

pub const HEADLINE_LABEL: &str = "HEADLINE:";
pub const SUMMARY_LABEL: &str = "SUMMARY_BODY:";
pub const HIGHLIGHT_LABEL: &str = "HIGHLIGHT:";

pub const SUMMARY_MARKER: char = '🎯';
pub const HIGHLIGHT_MARKER: char = '🚩';

const LABELS: [&str; 3] = [HEADLINE_LABEL, SUMMARY_LABEL, HIGHLIGHT_LABEL];

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: [&str; 24] = [
    "mr", "mrs", "ms", "dr", "gen", "lt", "col", "maj", "capt", "adm", "sgt", "sen", "rep",
    "gov", "st", "vs", "no", "inc", "corp", "co", "jr", "sr", "approx", "est",
];

/// Cut `text` to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// If `line` opens a labelled section, return the label and the rest of the
/// line after it.
fn split_label(line: &str) -> Option<(&'static str, &str)> {
    let bare = line.trim().trim_start_matches(['*', '#']).trim_start();
    LABELS.iter().find_map(|label| {
        bare.strip_prefix(label)
            .map(|rest| (*label, rest.trim_start_matches('*').trim()))
    })
}

/// Text of the section introduced by `label`, trimmed. `None` if absent or
/// empty.
fn section(reply: &str, label: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    let mut collected: Vec<&str> = Vec::new();

    for line in reply.lines() {
        if let Some((found, rest)) = split_label(line) {
            if current == Some(label) {
                break;
            }
            current = Some(found);
            if found == label && !rest.is_empty() {
                collected.push(rest);
            }
            continue;
        }
        if current == Some(label) {
            collected.push(line);
        }
    }

    let text = collected.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn required(reply: &str, label: &str) -> Result<String> {
    section(reply, label)
        .ok_or_else(|| LowdownError::Generation(format!("response is missing {}", label)))
}

fn clean_headline(raw: &str) -> String {
    raw.lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(['*', '#', '"'])
        .trim()
        .to_string()
}

fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['(', '"', '\'']);
    if word.is_empty() {
        return false;
    }

    // Initials and dotted acronyms: "J.", "U.S.", "e.g."
    let dotted = word.chars().all(|c| c == '.' || c.is_alphabetic())
        && word.split('.').all(|part| part.chars().count() == 1);

    dotted || ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// True unless a `.`, `!` or `?` is followed by whitespace and more text.
fn is_single_sentence(text: &str) -> bool {
    let text = text.trim_end();
    for (index, c) in text.char_indices() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let rest = &text[index + c.len_utf8()..];
        if !rest.starts_with(char::is_whitespace) || rest.trim().is_empty() {
            continue;
        }
        if c == '.' && is_abbreviation(&text[..index]) {
            continue;
        }
        return false;
    }
    true
}

fn has_backlink(text: &str) -> bool {
    text.contains("([more](")
}

/// Parse an article reply into headline and summary body.
///
/// The body is made to start with the 🎯 marker (stray markdown before it is
/// dropped; a bold headline line is added if the marker is missing) and to
/// end with a `([more](url))` backlink.
pub fn parse_summary_response(reply: &str, url: &str) -> Result<Generated> {
    let headline = clean_headline(&required(reply, HEADLINE_LABEL)?);
    if headline.is_empty() {
        return Err(LowdownError::Generation("response has an empty HEADLINE".into()));
    }
    let body = required(reply, SUMMARY_LABEL)?;

    let stripped = body.trim_start_matches(|c: char| c == '*' || c.is_whitespace());
    let mut body = if stripped.starts_with(SUMMARY_MARKER) {
        stripped.to_string()
    } else {
        format!("{} **{}**\n\n{}", SUMMARY_MARKER, headline, body)
    };

    if !has_backlink(&body) {
        body = format!("{} ([more]({}))", body.trim_end(), url);
    }

    Ok(Generated { headline, body })
}

/// Normalise a one-sentence highlight to `🚩 <sentence> ([more](url))`.
pub fn format_highlight(sentence: &str, url: &str) -> Result<String> {
    let mut text = sentence
        .trim()
        .trim_start_matches(|c: char| c == HIGHLIGHT_MARKER || c == '*' || c.is_whitespace())
        .trim_end();

    if let Some(index) = text.rfind("([more](") {
        if text.ends_with(')') {
            text = text[..index].trim_end();
        }
    }

    if text.is_empty() {
        return Err(LowdownError::Generation("highlight is empty".into()));
    }
    if !is_single_sentence(text) {
        return Err(LowdownError::Generation(
            "highlight must be a single sentence".into(),
        ));
    }

    let punctuation = if text.ends_with(['.', '!', '?']) { "" } else { "." };
    Ok(format!(
        "{} {}{} ([more]({}))",
        HIGHLIGHT_MARKER, text, punctuation, url
    ))
}

/// Parse a snapshot reply into headline and formatted highlight.
pub fn parse_highlight_response(reply: &str, url: &str) -> Result<Generated> {
    let headline = clean_headline(&required(reply, HEADLINE_LABEL)?);
    if headline.is_empty() {
        return Err(LowdownError::Generation("response has an empty HEADLINE".into()));
    }

    let highlight = required(reply, HIGHLIGHT_LABEL)?;
    if highlight.lines().filter(|l| !l.trim().is_empty()).count() > 1 {
        return Err(LowdownError::Generation(
            "highlight must be a single line".into(),
        ));
    }

    Ok(Generated {
        headline,
        body: format_highlight(&highlight, url)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/story";

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("🎯🎯🎯", 1), "🎯");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_parse_summary_with_bold_labels() {
        let reply = "**HEADLINE:** Warthogs Get Their Gold Watch\n\
                     **SUMMARY_BODY:** ** 🎯 **A-10s Head to the Boneyard**\n\n\
                     The Air Force wants the fleet retired early. ([more](https://example.com/story))";

        let parsed = parse_summary_response(reply, URL).unwrap();
        assert_eq!(parsed.headline, "Warthogs Get Their Gold Watch");
        assert!(parsed.body.starts_with("🎯 **A-10s Head to the Boneyard**"));
        assert!(parsed.body.ends_with("([more](https://example.com/story))"));
        assert_eq!(parsed.body.matches("([more](").count(), 1);
    }

    #[test]
    fn test_parse_summary_adds_marker_and_backlink() {
        let reply = "HEADLINE: Budget Bill Stalls\nSUMMARY_BODY:\nThe bill stalled in committee.\nA vote is expected next week.";
        let parsed = parse_summary_response(reply, URL).unwrap();
        assert_eq!(
            parsed.body,
            "🎯 **Budget Bill Stalls**\n\nThe bill stalled in committee.\n\
             A vote is expected next week. ([more](https://example.com/story))"
        );
    }

    #[test]
    fn test_parse_summary_missing_section_fails() {
        let err = parse_summary_response("HEADLINE: Only a headline", URL).unwrap_err();
        assert!(matches!(err, LowdownError::Generation(ref m) if m.contains("SUMMARY_BODY")));

        let err = parse_summary_response("Here is your summary: it went well.", URL).unwrap_err();
        assert!(matches!(err, LowdownError::Generation(ref m) if m.contains("HEADLINE")));
    }

    #[test]
    fn test_parse_summary_empty_headline_fails() {
        let reply = "HEADLINE: **\nSUMMARY_BODY: 🎯 body";
        assert!(parse_summary_response(reply, URL).is_err());
    }

    #[test]
    fn test_format_highlight_normalises() {
        assert_eq!(
            format_highlight("Senate confirms the new under-secretary", URL).unwrap(),
            "🚩 Senate confirms the new under-secretary. ([more](https://example.com/story))"
        );
        assert_eq!(
            format_highlight("🚩 Launch slips to 2027! ([more](https://other.example))", URL)
                .unwrap(),
            "🚩 Launch slips to 2027! ([more](https://example.com/story))"
        );
        assert!(format_highlight(" 🚩 ", URL).is_err());
    }

    #[test]
    fn test_parse_highlight_response() {
        let reply = "HEADLINE: Senate Signs Off\nHIGHLIGHT: 🚩 The Senate confirmed the nominee 52-47.";
        let parsed = parse_highlight_response(reply, URL).unwrap();
        assert_eq!(parsed.headline, "Senate Signs Off");
        assert_eq!(
            parsed.body,
            "🚩 The Senate confirmed the nominee 52-47. ([more](https://example.com/story))"
        );
    }

    #[test]
    fn test_parse_highlight_rejects_multiple_lines() {
        let reply = "HEADLINE: Two Things\nHIGHLIGHT: First sentence.\nSecond sentence.";
        let err = parse_highlight_response(reply, URL).unwrap_err();
        assert!(matches!(err, LowdownError::Generation(_)));
    }

    #[test]
    fn test_parse_highlight_rejects_two_sentences_on_one_line() {
        let reply = "HEADLINE: Two Facts\n\
                     HIGHLIGHT: The Senate confirmed the nominee. The House voted the budget down.";
        let err = parse_highlight_response(reply, URL).unwrap_err();
        assert!(matches!(err, LowdownError::Generation(ref m) if m.contains("single sentence")));

        let reply = "HEADLINE: Two Facts\nHIGHLIGHT: Did it pass? Nobody knows. ([more](https://e.com))";
        assert!(parse_highlight_response(reply, URL).is_err());
    }

    #[test]
    fn test_highlight_abbreviations_do_not_split_sentences() {
        let parsed = format_highlight(
            "Gen. Smith told the U.S. Senate that Lt. Col. J. Doe leads the F-35 review",
            URL,
        )
        .unwrap();
        assert!(parsed.starts_with("🚩 Gen. Smith told the U.S. Senate"));

        assert!(is_single_sentence("The fleet grew 2.5 percent in 2024."));
        assert!(is_single_sentence("Launch slips to 2027!"));
        assert!(!is_single_sentence("Launch slips! Budget grows."));
    }
}
