use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_THREAT_STATUS: &str = "active";

/// A researched threat profile. Not ordered; keyed by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub id: i64,
    pub name: String,
    pub threat_type: Option<String>,
    pub country_of_origin: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<Map<String, Value>>,
    pub ioc_year: Option<i64>,
    pub operators: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub status: String,
    pub tod_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Threat {
    /// Markdown block appended to a newsletter export.
    pub fn analysis_block(&self) -> String {
        self.block("Threat Analysis")
    }

    /// Featured-threat block of an issue export.
    pub fn feature_block(&self) -> String {
        self.block("Threat of the Day")
    }

    fn block(&self, heading: &str) -> String {
        let body = self
            .tod_summary
            .as_deref()
            .or(self.description.as_deref())
            .map(str::trim)
            .unwrap_or("");
        format!("## {}: {}\n\n{}", heading, self.name, body)
            .trim_end()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewThreat {
    pub name: String,
    pub threat_type: Option<String>,
    pub country_of_origin: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<Map<String, Value>>,
    pub operators: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ThreatUpdate {
    pub name: Option<String>,
    pub threat_type: Option<String>,
    pub country_of_origin: Option<String>,
    pub description: Option<String>,
    pub specifications: Option<Map<String, Value>>,
    pub ioc_year: Option<i64>,
    pub operators: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub status: Option<String>,
    pub tod_summary: Option<String>,
}

/// Decode a JSON text column, treating malformed data as absent.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat() -> Threat {
        Threat {
            id: 1,
            name: "S-400".into(),
            threat_type: Some("SAM".into()),
            country_of_origin: Some("Russia".into()),
            description: Some("Long-range air defence.".into()),
            specifications: None,
            ioc_year: None,
            operators: None,
            image_url: None,
            status: DEFAULT_THREAT_STATUS.into(),
            tod_summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_analysis_block_prefers_tod_summary() {
        let mut t = threat();
        assert_eq!(
            t.analysis_block(),
            "## Threat Analysis: S-400\n\nLong-range air defence."
        );
        t.tod_summary = Some("Threat of the day text".into());
        assert!(t.analysis_block().ends_with("Threat of the day text"));
    }

    #[test]
    fn test_feature_block_heading() {
        assert_eq!(
            threat().feature_block(),
            "## Threat of the Day: S-400\n\nLong-range air defence."
        );
    }

    #[test]
    fn test_analysis_block_without_body() {
        let mut t = threat();
        t.description = None;
        assert_eq!(t.analysis_block(), "## Threat Analysis: S-400");
    }

    #[test]
    fn test_decode_json_tolerates_garbage() {
        let ops: Option<Vec<String>> = decode_json(Some("[\"Russia\",\"China\"]".into()));
        assert_eq!(ops.unwrap().len(), 2);
        let bad: Option<Vec<String>> = decode_json(Some("{not json".into()));
        assert!(bad.is_none());
    }
}
