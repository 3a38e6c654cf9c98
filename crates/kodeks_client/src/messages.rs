//! Wire types for the analysis API. Client → server query body, server → client
//! NDJSON stream events and the non-streaming response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Client → server: request body for both endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMessage<'a> {
    pub question: &'a str,
}

impl<'a> QueryMessage<'a> {
    pub fn new(question: &'a str) -> Self {
        Self { question }
    }
}

/// A citation attached to an answer.
///
/// Decoding never fails: numeric or boolean `type`/`id` values are rendered as
/// strings, missing ones are empty, and an entry that is not an object yields
/// an empty record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
}

impl Source {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return Self::default();
        };
        Self {
            kind: object.remove("type").map(scalar_text).unwrap_or_default(),
            id: object.remove("id").map(scalar_text).unwrap_or_default(),
            fields: match object.remove("fields") {
                Some(Value::Object(fields)) => Some(fields),
                _ => None,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextDeltaMessage {
    text_delta: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourcesMessage {
    #[serde(default)]
    tool_name: Option<Value>,
    sources: Vec<Source>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishMessage {
    #[serde(default)]
    finish_reason: Option<Value>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

/// One line of the analysis stream; discriminator is the JSON "type" field.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    Sources {
        tool_name: String,
        sources: Vec<Source>,
    },
    Finish {
        finish_reason: Option<String>,
        sources: Vec<Source>,
    },
    /// Any tag this client does not know. Empty when the line had no string "type".
    Unknown(String),
}

impl StreamEvent {
    /// Decode a parsed line. Unknown tags are not an error; a known tag whose
    /// payload does not match its shape is.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let typ = match value.get("type").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => return Ok(StreamEvent::Unknown(String::new())),
        };
        match typ.as_str() {
            "text-delta" => {
                let m: TextDeltaMessage = serde_json::from_value(value)?;
                Ok(StreamEvent::TextDelta(m.text_delta))
            }
            "sources" => {
                let m: SourcesMessage = serde_json::from_value(value)?;
                Ok(StreamEvent::Sources {
                    tool_name: m.tool_name.map(scalar_text).unwrap_or_default(),
                    sources: m.sources,
                })
            }
            "finish" => {
                let m: FinishMessage = serde_json::from_value(value)?;
                Ok(StreamEvent::Finish {
                    finish_reason: m.finish_reason.map(scalar_text).filter(|r| !r.is_empty()),
                    sources: m.sources.unwrap_or_default(),
                })
            }
            _ => Ok(StreamEvent::Unknown(typ)),
        }
    }

    /// Parse one NDJSON line.
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_json(value)
    }
}

/// Server → client: non-streaming analysis response. Both fields are kept
/// loose; a 2xx body of an unexpected shape still counts as an answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub sources: Option<Value>,
}

impl AnalysisResponse {
    /// Answer length in characters; 0 when `text` is missing or not a string.
    pub fn text_len(&self) -> usize {
        self.text
            .as_ref()
            .and_then(Value::as_str)
            .map_or(0, |t| t.chars().count())
    }

    /// 0 when `sources` is missing or not an array.
    pub fn sources_count(&self) -> usize {
        self.sources
            .as_ref()
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}
