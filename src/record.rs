//! Records carried by the JSONL import stream.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// One line of the import stream, as supplied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub fiction_id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "number_or_null")]
    pub following_users: f64,
    #[serde(default, deserialize_with = "number_or_null")]
    pub rating: f64,
    #[serde(default, deserialize_with = "number_or_null")]
    pub pages: f64,
    #[serde(default, deserialize_with = "number_or_null")]
    pub views: f64,
    #[serde(default, deserialize_with = "number_or_null")]
    pub chapters: f64,
    #[serde(default, deserialize_with = "number_or_null")]
    pub last_updated: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// A record as written to the store, keyed by `fiction_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub fiction_id: String,
    pub title: String,
    pub url: String,
    pub cover: String,
    pub tags: Vec<String>,
    pub label: String,
    pub following_users: f64,
    pub rating: f64,
    pub pages: f64,
    pub views: f64,
    pub chapters: f64,
    pub last_updated: f64,
    pub description: String,
    /// Derived from `title`; never read from input.
    pub title_words: Vec<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Any JSON number, with `null` read as 0. Integer columns holding gaps are
/// written with float values, so counts may arrive as `1234.0`.
fn number_or_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lower-cased, whitespace-split, de-duplicated title tokens in first-seen order.
pub fn title_words(title: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in title.to_lowercase().split_whitespace() {
        if !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    }
    words
}

impl RawRecord {
    pub fn normalize(self) -> NormalizedRecord {
        let title_words = title_words(&self.title);
        NormalizedRecord {
            fiction_id: self.fiction_id,
            title: self.title,
            url: self.url,
            cover: self.cover.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            label: self.label.unwrap_or_default(),
            following_users: self.following_users,
            rating: self.rating,
            pages: self.pages,
            views: self.views,
            chapters: self.chapters,
            last_updated: self.last_updated,
            description: self.description.unwrap_or_default(),
            title_words,
        }
    }
}

impl From<RawRecord> for NormalizedRecord {
    fn from(raw: RawRecord) -> Self {
        raw.normalize()
    }
}

/// Validates one JSON line and normalizes it.
pub fn parse_line(line: &str) -> Result<NormalizedRecord, Error> {
    serde_json::from_str::<RawRecord>(line)
        .map(RawRecord::normalize)
        .map_err(Error::Record)
}
