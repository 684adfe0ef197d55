//! The boundary between free-form model output and typed records.
//!
//! Model replies are loosely shaped: wrapped in markdown fences, preceded by
//! chatter, with numbers where strings were asked for and alternative key
//! names. Everything here is lenient about shape and strict about types:
//! items that cannot be read are skipped, never guessed at.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{RawDataPoint, RawMetric, RawTable, RawTimeSeries, StrategicInsights, TableMetadata};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object or array found in response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Body of the first ``` / ```json fence, if the reply has a closed one.
pub fn fenced_body(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_open = &response[open + 3..];
    // Skip the info string ("json", "JSON", ...) up to the end of the line
    let body_start = after_open.find('\n').map(|i| i + 1)?;
    let body = &after_open[body_start..];
    body.find("```").map(|close| body[..close].trim())
}

/// Records come as an object or as a list of objects. Bracketed prose such
/// as "[2 found]" or "[3]" is neither.
fn is_payload(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().all(|v| v.is_object() || v.is_array()),
        _ => false,
    }
}

/// First complete JSON payload starting at an opening bracket of `text`.
fn first_value(text: &str) -> Result<(&str, Value), Option<serde_json::Error>> {
    let mut last_err = None;

    for (i, _) in text.match_indices(['{', '[']) {
        let mut stream = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) if is_payload(&value) => {
                let end = i + stream.byte_offset();
                return Ok((&text[i..end], value));
            }
            Some(Ok(_)) | None => {}
            Some(Err(e)) => last_err = Some(e),
        }
    }

    Err(last_err)
}

/// The JSON text of the reply: the fenced block when it holds a value,
/// otherwise the first value found anywhere in the reply.
pub fn json_payload(response: &str) -> Option<&str> {
    fenced_body(response)
        .and_then(|body| first_value(body).ok())
        .or_else(|| first_value(response).ok())
        .map(|(payload, _)| payload)
}

pub fn parse_llm_json(response: &str) -> Result<Value, ParseError> {
    if let Some(Ok((_, value))) = fenced_body(response).map(first_value) {
        return Ok(value);
    }
    match first_value(response) {
        Ok((_, value)) => Ok(value),
        Err(Some(e)) => Err(ParseError::Invalid(e)),
        Err(None) => Err(ParseError::NoJson),
    }
}

/// Render a JSON scalar as the string we store. Objects, arrays and null
/// have no string form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(scalar_to_string))
}

/// The list under any of `keys`, or the value itself when the model
/// answered with a bare array.
fn items<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    match value {
        Value::Array(list) => list,
        Value::Object(obj) => keys
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

pub fn tables_from_value(value: &Value) -> Vec<RawTable> {
    items(value, &["tables", "data"])
        .iter()
        .filter_map(Value::as_object)
        .map(table_from_object)
        .collect()
}

fn table_from_object(obj: &Map<String, Value>) -> RawTable {
    let headers: Vec<String> = obj
        .get("headers")
        .or_else(|| obj.get("columns"))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default();

    let rows: Vec<Vec<String>> = obj
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| match row {
                    Value::Array(cells) => {
                        Some(cells.iter().map(|c| scalar_to_string(c).unwrap_or_default()).collect::<Vec<_>>())
                    }
                    // Rows keyed by header name are laid out in header order
                    Value::Object(cells) if !headers.is_empty() => Some(
                        headers
                            .iter()
                            .map(|h| cells.get(h).and_then(scalar_to_string).unwrap_or_default())
                            .collect::<Vec<_>>(),
                    ),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let metadata = obj
        .get("metadata")
        .and_then(Value::as_object)
        .map(|meta| TableMetadata {
            source: field(meta, &["source"]),
            period: field(meta, &["period"]),
            unit: field(meta, &["unit"]),
        })
        .unwrap_or_default();

    RawTable {
        title: field(obj, &["title", "name"]).unwrap_or_default(),
        headers,
        rows,
        metadata,
    }
}

pub fn metrics_from_value(value: &Value) -> Vec<RawMetric> {
    items(value, &["keyMetrics", "metrics", "key_metrics"])
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| RawMetric {
            name: field(obj, &["name", "label", "metric"]).unwrap_or_default(),
            value: field(obj, &["value"]).unwrap_or_default(),
            unit: field(obj, &["unit"]).unwrap_or_default(),
            trend: field(obj, &["trend"]),
            context: field(obj, &["context", "description"]),
            category: field(obj, &["category"]).unwrap_or_default(),
        })
        .collect()
}

pub fn time_series_from_value(value: &Value) -> Vec<RawTimeSeries> {
    items(value, &["timeSeriesData", "timeSeries", "time_series", "series"])
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let data_points = ["dataPoints", "data_points", "data", "points"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_array))
                .map(|points| {
                    points
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|p| RawDataPoint {
                            period: field(p, &["period", "label", "date", "x"]),
                            value: field(p, &["value", "y"]),
                        })
                        .collect()
                })
                .unwrap_or_default();

            RawTimeSeries {
                title: field(obj, &["title", "name"]).unwrap_or_default(),
                data_points,
                unit: field(obj, &["unit"]).unwrap_or_default(),
                category: field(obj, &["category"]).unwrap_or_default(),
            }
        })
        .collect()
}

/// Strings under the first of `keys`: a list of scalars, or one string
/// with an entry per line.
fn string_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match keys.iter().find_map(|key| obj.get(*key)) {
        Some(Value::Array(list)) => list.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(text)) => text.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Lists as the model wrote them; cleaning happens in `insights`.
pub fn insights_from_value(value: &Value) -> StrategicInsights {
    let Some(obj) = value.as_object() else {
        return StrategicInsights::default();
    };
    StrategicInsights {
        insights: string_list(obj, &["insights", "strategicInsights", "insight"]),
        competitive_advantages: string_list(obj, &["competitiveAdvantages", "competitive_advantages", "strengths"]),
        success_indicators: string_list(obj, &["successIndicators", "success_indicators", "indicators"]),
    }
}
