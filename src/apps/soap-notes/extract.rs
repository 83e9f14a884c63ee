// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Best-effort recovery of SOAP fields from model output.
//!
//! Models asked to "return only JSON" still wrap the answer in code fences,
//! prepend prose, or emit Python-style single-quoted dicts. The order tried is:
//! - the fence-stripped text as JSON
//! - the first balanced `{ ... }` span
//! - that span with single-quoted strings rewritten to double quotes
//!
//! If none of these yields a JSON object, the whole input is kept as the
//! Subjective field so the text is not lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SOAP_KEYS: [&str; 4] = ["Subjective", "Objective", "Assessment", "Plan"];

/// The four SOAP sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    #[serde(rename = "Subjective", default)]
    pub subjective: String,
    #[serde(rename = "Objective", default)]
    pub objective: String,
    #[serde(rename = "Assessment", default)]
    pub assessment: String,
    #[serde(rename = "Plan", default)]
    pub plan: String,
}

impl SoapNote {
    /// Sections in S, O, A, P order, paired with their titles.
    pub fn sections(&self) -> [(&'static str, &str); 4] {
        [
            (SOAP_KEYS[0], self.subjective.as_str()),
            (SOAP_KEYS[1], self.objective.as_str()),
            (SOAP_KEYS[2], self.assessment.as_str()),
            (SOAP_KEYS[3], self.plan.as_str()),
        ]
    }
}

/// Result of [`extract_soap`]. `parsed` is false when the fallback was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub note: SoapNote,
    pub parsed: bool,
}

pub fn extract_soap(raw: &str) -> Extraction {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return fallback(raw);
    }

    if let Some(obj) = parse_object(body) {
        return parsed(&obj);
    }

    if let Some(span) = first_balanced_object(body) {
        if let Some(obj) = parse_object(span) {
            return parsed(&obj);
        }
        if let Some(obj) = parse_object(&normalize_single_quotes(span)) {
            return parsed(&obj);
        }
    }

    fallback(raw)
}

fn parsed(obj: &Map<String, Value>) -> Extraction {
    Extraction {
        note: SoapNote {
            subjective: field(obj, SOAP_KEYS[0]),
            objective: field(obj, SOAP_KEYS[1]),
            assessment: field(obj, SOAP_KEYS[2]),
            plan: field(obj, SOAP_KEYS[3]),
        },
        parsed: true,
    }
}

fn fallback(raw: &str) -> Extraction {
    Extraction {
        note: SoapNote {
            subjective: raw.to_string(),
            ..SoapNote::default()
        },
        parsed: false,
    }
}

/// Remove a leading ```` ```lang ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fence(s: &str) -> &str {
    let mut t = s.trim();
    if let Some(rest) = t.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        t = &rest[tag_len..];
    }
    if let Some(rest) = t.trim_end().strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// First `{ ... }` span whose braces balance. Braces inside single- or
/// double-quoted strings are ignored.
pub fn first_balanced_object(s: &str) -> Option<&str> {
    s.match_indices('{')
        .find_map(|(start, _)| balanced_from(&s[start..]))
}

fn balanced_from(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrite single-quoted string literals as double-quoted JSON strings.
/// Double-quoted strings pass through untouched, so apostrophes inside them
/// survive.
pub fn normalize_single_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in s.chars() {
        match quote {
            None => {
                match c {
                    '\'' => {
                        quote = Some('\'');
                        out.push('"');
                    }
                    '"' => {
                        quote = Some('"');
                        out.push('"');
                    }
                    _ => out.push(c),
                }
            }
            Some(q) => {
                if escaped {
                    escaped = false;
                    // \' is not a JSON escape
                    if c == '\'' {
                        out.pop();
                    }
                    out.push(c);
                } else if c == '\\' {
                    escaped = true;
                    out.push(c);
                } else if c == q {
                    quote = None;
                    out.push('"');
                } else if c == '"' && q == '\'' {
                    out.push_str("\\\"");
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}

fn field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .or_else(|| {
            obj.iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(value_to_text)
        .unwrap_or_default()
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", value_to_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
