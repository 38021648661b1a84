//! Provider-agnostic prompt construction and reply validation.
//!
//! Models are asked for a JSON array of `{subdomain, score, reason}` objects.
//! Replies are treated as untrusted: the array is cut out of any surrounding
//! prose or code fences, and every entry is checked before it is believed.

use std::collections::HashMap;

use serde_json::Value;
use subrank_common::error::ScoringFailure;
use subrank_common::models::{LiveSubdomain, RiskRecord, RiskScore};
use tracing::debug;

pub const SYSTEM_PROMPT: &str =
    "You are a security professional evaluating subdomains for penetration testing.";

pub fn build_prompt(domain: &str, names: &[String]) -> String {
    let list: String = names
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{SYSTEM_PROMPT}
Rank the following subdomains of {domain} by their potential security relevance from 0 to 10:

{list}

For each subdomain, provide:
1. A whole-number score from 0 to 10 (10 being highest priority for pentesting)
2. A brief reason for the score

Respond only with valid JSON in this format:
[
  {{
    \"subdomain\": \"admin.{domain}\",
    \"score\": 8,
    \"reason\": \"Administrative interface with potential access to sensitive controls\"
  }}
]
"
    )
}

/// An entry as the model returned it. `score` is `Err` when it was not a
/// usable integer in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEntry {
    pub name: String,
    pub score: Result<RiskScore, String>,
    pub reason: String,
}

/// Extracts the JSON array from a model reply.
pub fn parse_reply(text: &str) -> Result<Vec<ReplyEntry>, ScoringFailure> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(ScoringFailure::MalformedResponse("no JSON array in reply".into()));
    };
    if end < start {
        return Err(ScoringFailure::MalformedResponse("no JSON array in reply".into()));
    }

    let items: Vec<Value> = serde_json::from_str(&text[start..=end])
        .map_err(|e| ScoringFailure::MalformedResponse(e.to_string()))?;

    Ok(items.iter().filter_map(parse_entry).collect())
}

fn parse_entry(item: &Value) -> Option<ReplyEntry> {
    let object = item.as_object()?;
    let name: &str = object
        .get("subdomain")
        .or_else(|| object.get("name"))
        .and_then(Value::as_str)?;

    let reason: String = object
        .get("reason")
        .or_else(|| object.get("reasoning"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let score = match object.get("score") {
        Some(value) => parse_score(value),
        None => Err("missing score".to_string()),
    };

    Some(ReplyEntry {
        name: normalize(name),
        score,
        reason,
    })
}

/// Accepts integers, integral floats and numeric strings.
fn parse_score(value: &Value) -> Result<RiskScore, String> {
    let number: Option<i64> = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    };

    let number: i64 = number.ok_or_else(|| format!("score {value} is not an integer"))?;
    RiskScore::new(number).ok_or_else(|| format!("score {number} outside 0..=10"))
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Result of checking one batch reply against the names that were asked for.
#[derive(Debug, Default)]
pub struct Validated {
    pub records: Vec<RiskRecord>,
    pub failures: Vec<ScoringFailure>,
}

/// Pairs every submitted subdomain with exactly one record. A name must
/// appear exactly once in the reply with a valid score; missing, invalid and
/// repeated entries get `fallback`.
pub fn validate(batch: Vec<LiveSubdomain>, entries: Vec<ReplyEntry>, fallback: RiskScore) -> Validated {
    let mut by_name: HashMap<String, Vec<ReplyEntry>> = HashMap::new();
    for entry in entries {
        by_name.entry(entry.name.clone()).or_default().push(entry);
    }

    let mut validated = Validated::default();
    for subdomain in batch {
        let key: String = normalize(subdomain.name());
        let mut found: Vec<ReplyEntry> = by_name.remove(&key).unwrap_or_default();

        let failure = match (found.pop(), found.is_empty()) {
            (Some(ReplyEntry { score: Ok(score), reason, .. }), true) => {
                validated.records.push(RiskRecord::scored(subdomain, score, reason));
                continue;
            }
            (Some(ReplyEntry { score: Err(reason), .. }), true) => {
                ScoringFailure::InvalidEntry { name: key, reason }
            }
            (Some(_), false) => ScoringFailure::InvalidEntry {
                name: key,
                reason: "duplicate entry".to_string(),
            },
            (None, _) => ScoringFailure::MissingEntry { name: key },
        };
        validated
            .records
            .push(RiskRecord::fallback(subdomain, fallback, failure.fallback_reason()));
        validated.failures.push(failure);
    }

    for name in by_name.keys() {
        debug!("Ignoring score for unrequested name {name}");
    }
    validated
}
