//! Wire types for the Limitless lifelogs endpoint.
//!
//! Response envelope for `GET /v1/lifelogs`:
//! ```json
//! {
//!   "data": { "lifelogs": [ { "id": "...", "title": "...", "markdown": "...", "contents": [...] } ] },
//!   "meta": { "lifelogs": { "nextCursor": "...", "count": 10 } }
//! }
//! ```
//!
//! Only `id` and the text body matter to the export. Each record also keeps the
//! JSON object it was parsed from, so it can be written back out exactly as received.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::FetchError;

/// One node of a lifelog's structured transcript.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentNode {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct LifelogFields {
    id: String,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    contents: Option<Vec<ContentNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lifelog {
    pub id: String,
    pub markdown: Option<String>,
    pub contents: Vec<ContentNode>,
    raw: Value,
}

impl Lifelog {
    /// The record's text body: markdown when present, otherwise the transcript
    /// node contents one per line.
    pub fn text(&self) -> String {
        if let Some(md) = self.markdown.as_deref()
            && !md.is_empty()
        {
            return md.to_string();
        }
        self.contents
            .iter()
            .filter_map(|node| node.content.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The record exactly as the API returned it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl<'de> Deserialize<'de> for Lifelog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let fields = LifelogFields::deserialize(&raw).map_err(D::Error::custom)?;
        Ok(Lifelog {
            id: fields.id,
            markdown: fields.markdown,
            contents: fields.contents.unwrap_or_default(),
            raw,
        })
    }
}

impl Serialize for Lifelog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Data,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Data {
    lifelogs: Vec<Lifelog>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    lifelogs: Option<LifelogsMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifelogsMeta {
    #[serde(default)]
    next_cursor: Option<String>,
}

/// One page of results, already unwrapped from the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub lifelogs: Vec<Lifelog>,
    pub next_cursor: Option<String>,
}

impl Page {
    /// Parse a response body. `page` is the 1-based page number, used for diagnostics.
    pub fn parse(body: &[u8], page: usize) -> Result<Self, FetchError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| FetchError::Malformed {
                page,
                detail: e.to_string(),
            })?;
        let next_cursor = envelope
            .meta
            .and_then(|m| m.lifelogs)
            .and_then(|l| l.next_cursor)
            .filter(|c| !c.is_empty());
        Ok(Page {
            lifelogs: envelope.data.lifelogs,
            next_cursor,
        })
    }
}
