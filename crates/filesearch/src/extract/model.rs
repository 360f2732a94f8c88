//! Model-backed extraction through a completion client.

use std::sync::{Arc, OnceLock};

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ExtractionError;
use crate::temporal::extract_phrases;
use crate::types::{FileTypeIndicator, TemporalPhrase, TimeUnit};

use super::rules::is_category_word;
use super::{Extraction, ExtractionBackend};

pub const EXTRACTION_INSTRUCTION: &str = "\
/no_think
Extract file search information by identifying ONLY actual file types, not content descriptors.

file_type_indicators: extract ONLY file type or format mentions.
- File types: extensions (pdf, py, mp4), format names (python, excel), or categories (images, documents).
- NOT file types: content words (report, invoice, resume, brief).
- is_specific: true for exact types and extensions, false for categories.

time_unit / time_unit_value: the unit (hour, day, week, month, year) and its number, or empty strings when absent.
source_text: the exact words used for each field.
Reply with JSON only.";

/// One input/output pair shown to the model before the real input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkedExample {
    pub input: String,
    pub output: Value,
}

/// Everything a completion client needs for one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub instruction: String,
    pub examples: Vec<WorkedExample>,
    pub input: String,
    /// JSON schema the reply must satisfy.
    pub schema: Value,
}

/// Language model seam. Implementations block until the model replies and
/// return its raw text.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError>;
}

/// JSON schema for model replies.
///
/// `time_unit_value` accepts a string or an integer; non-numeric strings are
/// rejected later, per field, rather than failing the whole reply.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "file_type_indicators": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "extensions": { "type": "array", "items": { "type": "string" } },
                        "is_specific": { "type": "boolean" }
                    },
                    "required": ["text", "extensions", "is_specific"]
                }
            },
            "time_unit": { "type": "string" },
            "time_unit_value": { "type": ["string", "integer"] },
            "source_text": {
                "type": "object",
                "properties": {
                    "file_types": { "type": "string" },
                    "time_unit": { "type": "string" },
                    "time_unit_value": { "type": "string" }
                },
                "required": ["file_types", "time_unit", "time_unit_value"]
            }
        },
        "required": ["file_type_indicators", "time_unit", "time_unit_value", "source_text"]
    })
}

fn example(
    input: &str,
    indicators: Value,
    unit: &str,
    value: &str,
    source_types: &str,
) -> WorkedExample {
    WorkedExample {
        input: input.to_string(),
        output: json!({
            "file_type_indicators": indicators,
            "time_unit": unit,
            "time_unit_value": value,
            "source_text": {
                "file_types": source_types,
                "time_unit": unit,
                "time_unit_value": value
            }
        }),
    }
}

/// Few-shot examples sent with every request.
pub fn worked_examples() -> Vec<WorkedExample> {
    vec![
        example(
            "report pdf",
            json!([{ "text": "pdf", "extensions": ["pdf"], "is_specific": true }]),
            "",
            "",
            "pdf",
        ),
        example(
            "python scripts 2 weeks",
            json!([{ "text": "python", "extensions": ["py"], "is_specific": true }]),
            "week",
            "2",
            "python",
        ),
        example(
            "wedding photos",
            json!([{ "text": "photos", "extensions": ["jpg", "png"], "is_specific": false }]),
            "",
            "",
            "photos",
        ),
        example(
            "invoice documents 3 months",
            json!([{ "text": "documents", "extensions": ["pdf", "docx"], "is_specific": false }]),
            "month",
            "3",
            "documents",
        ),
        example(
            "budget.xlsx excel",
            json!([{ "text": "excel", "extensions": ["xlsx"], "is_specific": true }]),
            "",
            "",
            "excel",
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    file_type_indicators: Vec<ModelIndicator>,
    time_unit: String,
    time_unit_value: Value,
    source_text: SourceText,
}

#[derive(Debug, Deserialize)]
struct ModelIndicator {
    text: String,
    extensions: Vec<String>,
    is_specific: bool,
}

#[derive(Debug, Deserialize)]
struct SourceText {
    file_types: String,
    time_unit: String,
    time_unit_value: String,
}

/// Extraction backend that asks a language model for structured fields.
#[derive(Clone)]
pub struct ModelExtractor {
    client: Arc<dyn CompletionClient>,
    examples: Vec<WorkedExample>,
}

impl std::fmt::Debug for ModelExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelExtractor")
            .field("examples", &self.examples.len())
            .finish_non_exhaustive()
    }
}

impl ModelExtractor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            examples: worked_examples(),
        }
    }

    pub fn request_for(&self, normalized: &str) -> CompletionRequest {
        CompletionRequest {
            instruction: EXTRACTION_INSTRUCTION.to_string(),
            examples: self.examples.clone(),
            input: normalized.to_string(),
            schema: response_schema(),
        }
    }

    /// Validates a raw reply and maps it to an [`Extraction`].
    pub fn parse_reply(reply: &str, normalized: &str) -> Result<Extraction, ExtractionError> {
        let value = parse_json_object(reply)?;
        validate(&value)?;
        let reply: ModelReply = serde_json::from_value(value)
            .map_err(|error| ExtractionError::Malformed(error.to_string()))?;

        let file_types = reply
            .file_type_indicators
            .into_iter()
            .filter(|indicator| !indicator.text.trim().is_empty())
            .map(|indicator| {
                let specific = indicator.is_specific && !is_category_word(&indicator.text);
                FileTypeIndicator::new(indicator.text.trim(), indicator.extensions, specific)
            })
            .collect();

        let temporal = temporal_phrase(
            &reply.time_unit,
            &reply.time_unit_value,
            &reply.source_text,
            normalized,
        )
        .into_iter()
        .collect();

        Ok(Extraction {
            file_types,
            temporal,
            claimed_spans: vec![reply.source_text.file_types],
        })
    }
}

impl ExtractionBackend for ModelExtractor {
    fn name(&self) -> &'static str {
        "model"
    }

    fn extract(&self, normalized: &str) -> Result<Extraction, ExtractionError> {
        let reply = self.client.complete(&self.request_for(normalized))?;
        Self::parse_reply(&reply, normalized)
    }
}

/// Pulls the JSON object out of a reply that may carry a reasoning block or
/// code fences around it.
fn parse_json_object(reply: &str) -> Result<Value, ExtractionError> {
    let body = match reply.rfind("</think>") {
        Some(end) => &reply[end + "</think>".len()..],
        None => reply,
    };
    let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
        return Err(ExtractionError::Malformed(
            "reply contains no JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(ExtractionError::Malformed(
            "reply contains no JSON object".to_string(),
        ));
    }
    serde_json::from_str(&body[start..=end])
        .map_err(|error| ExtractionError::Malformed(error.to_string()))
}

/// The reply schema, compiled on first use.
fn compiled_schema() -> Result<&'static JSONSchema, ExtractionError> {
    static SCHEMA: OnceLock<Result<JSONSchema, String>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| JSONSchema::compile(&response_schema()).map_err(|error| error.to_string()))
        .as_ref()
        .map_err(|error| ExtractionError::Backend(format!("invalid response schema: {error}")))
}

fn validate(value: &Value) -> Result<(), ExtractionError> {
    let compiled = compiled_schema()?;
    let result = compiled.validate(value);
    if let Err(errors) = result {
        let message = errors
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ExtractionError::SchemaViolation(message));
    }
    Ok(())
}

/// Builds the temporal phrase, dropping it when the unit is unknown or the
/// value is not a non-negative integer.
fn temporal_phrase(
    unit: &str,
    value: &Value,
    source: &SourceText,
    normalized: &str,
) -> Option<TemporalPhrase> {
    if unit.trim().is_empty() {
        return None;
    }
    let unit = match unit.parse::<TimeUnit>() {
        Ok(unit) => unit,
        Err(error) => {
            log::debug!("dropping model temporal phrase: {error}");
            return None;
        }
    };
    let value = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    };
    let Some(value) = value else {
        log::debug!(
            "dropping model temporal phrase with non-numeric value value={:?}",
            source.time_unit_value
        );
        return None;
    };

    if let Some(found) = extract_phrases(normalized)
        .into_iter()
        .find(|phrase| phrase.value == value && phrase.unit == unit)
    {
        return Some(found);
    }

    let text = [source.time_unit_value.trim(), source.time_unit.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(TemporalPhrase {
        text,
        value,
        unit,
        fuzzy: false,
    })
}
