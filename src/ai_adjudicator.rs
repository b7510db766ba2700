// =============================================================================
// AIAdjudicator — LLM-backed second opinion on a proposed trade
// =============================================================================
//
// Uses a plain `reqwest::Client` with a fixed timeout and `.context()`-
// wrapped errors. The model is asked for JSON only, but a code-fenced or
// prose-wrapped reply is still salvaged by scanning for the outermost
// `{...}` span before giving up, so a chatty model doesn't fail the whole
// adjudication.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::Direction;

/// The action the adjudicator independently selects — it is not limited to
/// rubber-stamping the assessor's direction; `Buy` lets it pick a side on its
/// own (see scenario where an external alert conflicts with the assessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiAction {
    #[serde(rename = "BUY_CALL")]
    BuyCall,
    #[serde(rename = "BUY_PUT")]
    BuyPut,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SKIP")]
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub action: AiAction,
    /// 0..10, same scale as `DirectionAssessment::conviction`.
    pub conviction: f64,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub stop_level: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// Input context handed to the LLM, serialized into the prompt template.
#[derive(Debug, Clone, Serialize)]
pub struct AdjudicationRequest {
    pub underlying: String,
    pub direction: Direction,
    pub strategy: String,
    pub conviction: i32,
    pub gex_regime: String,
    pub macro_regime: String,
    pub minutes_to_close: i64,
    pub reasons: Vec<String>,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

const PROMPT_TEMPLATE: &str = r#"You are a risk-averse options trading adjudicator. Given the signal context below, respond with ONLY a JSON object of the form {"action": "BUY_CALL"|"BUY_PUT"|"BUY"|"SKIP", "conviction": 0-10, "strategy": "scalp"|"swing", "target": "...", "stopLevel": "...", "reason": "..."}. No prose, no markdown fences.

Underlying: {underlying}
Direction: {direction}
Strategy: {strategy}
Conviction: {conviction}
GEX regime: {gex_regime}
Macro regime: {macro_regime}
Minutes to close: {minutes_to_close}
Reasons: {reasons}
"#;

fn build_prompt(req: &AdjudicationRequest) -> String {
    PROMPT_TEMPLATE
        .replace("{underlying}", &req.underlying)
        .replace("{direction}", &req.direction.to_string())
        .replace("{strategy}", &req.strategy)
        .replace("{conviction}", &req.conviction.to_string())
        .replace("{gex_regime}", &req.gex_regime)
        .replace("{macro_regime}", &req.macro_regime)
        .replace("{minutes_to_close}", &req.minutes_to_close.to_string())
        .replace("{reasons}", &req.reasons.join("; "))
}

/// Extract the outermost `{...}` span from a reply that may be wrapped in
/// prose or a markdown code fence, then parse it as an `AiDecision`. An
/// `action` the model spelled in a way we don't recognize (or omitted
/// entirely) degrades to `Skip` rather than failing the whole parse.
fn extract_decision(raw: &str) -> Option<AiDecision> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &raw[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;

    let action = match value.get("action").and_then(|a| a.as_str()) {
        Some("BUY_CALL") => AiAction::BuyCall,
        Some("BUY_PUT") => AiAction::BuyPut,
        Some("BUY") => AiAction::Buy,
        _ => AiAction::Skip,
    };
    let conviction = value.get("conviction").and_then(|c| c.as_f64()).unwrap_or(0.0).clamp(0.0, 10.0);
    let strategy = value.get("strategy").and_then(|s| s.as_str()).map(str::to_string);
    let target = value.get("target").and_then(|s| s.as_str()).map(str::to_string);
    let stop_level = value.get("stopLevel").and_then(|s| s.as_str()).map(str::to_string);
    let reason = value.get("reason").and_then(|s| s.as_str()).unwrap_or_default().to_string();

    Some(AiDecision { action, conviction, strategy, target, stop_level, reason })
}

pub struct AiAdjudicator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AiAdjudicator {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Call the LLM endpoint and parse its verdict. Returns `Ok(None)` (not
    /// an error) on timeout, transport failure, or unparseable output — per
    /// the "AI failure degrades to SKIP, never blocks the cycle" design
    /// note, the caller treats `None` as an abstention rather than a policy
    /// violation.
    pub async fn adjudicate(&self, req: &AdjudicationRequest) -> Option<AiDecision> {
        let prompt = build_prompt(req);
        let body = serde_json::json!({ "prompt": prompt, "max_tokens": 300 });

        let result = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        let resp = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "AI adjudicator request failed, skipping");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "AI adjudicator returned non-success status, skipping");
            return None;
        }

        let body: serde_json::Value = match resp.json().await.context("failed to parse adjudicator response body") {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "AI adjudicator body was not JSON, skipping");
                return None;
            }
        };

        let text = body["text"].as_str().or_else(|| body["completion"].as_str()).unwrap_or("");
        match extract_decision(text) {
            Some(decision) => {
                debug!(action = ?decision.action, conviction = decision.conviction, "AI adjudicator decision");
                Some(decision)
            }
            None => {
                warn!(raw = text, "AI adjudicator reply did not contain a parseable decision, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_decision_parses_clean_json() {
        let raw = r#"{"action": "BUY_CALL", "conviction": 8, "strategy": "scalp", "reason": "strong confluence"}"#;
        let d = extract_decision(raw).unwrap();
        assert_eq!(d.action, AiAction::BuyCall);
        assert!((d.conviction - 8.0).abs() < 1e-9);
    }

    #[test]
    fn extract_decision_salvages_fenced_json() {
        let raw = "Here is my answer:\n```json\n{\"action\": \"SKIP\", \"conviction\": 1, \"reason\": \"weak setup\"}\n```\nThanks.";
        let d = extract_decision(raw).unwrap();
        assert_eq!(d.action, AiAction::Skip);
    }

    #[test]
    fn extract_decision_returns_none_for_pure_prose() {
        assert!(extract_decision("I cannot decide right now.").is_none());
    }

    #[test]
    fn extract_decision_returns_none_for_malformed_json() {
        assert!(extract_decision("{\"action\": \"BUY\", }").is_none());
    }

    #[test]
    fn extract_decision_defaults_unrecognized_action_to_skip() {
        let raw = r#"{"action": "HOLD", "conviction": 5, "reason": "unsure"}"#;
        let d = extract_decision(raw).unwrap();
        assert_eq!(d.action, AiAction::Skip);
    }

    #[test]
    fn extract_decision_picks_first_object_with_action_despite_surrounding_prose() {
        let raw = "model says: {\"action\": \"BUY_PUT\", \"conviction\": 6, \"reason\": \"bearish flip\"} — done.";
        let d = extract_decision(raw).unwrap();
        assert_eq!(d.action, AiAction::BuyPut);
    }

    #[test]
    fn build_prompt_interpolates_fields() {
        let req = AdjudicationRequest {
            underlying: "SPY".to_string(),
            direction: Direction::Bullish,
            strategy: "scalp".to_string(),
            conviction: 7,
            gex_regime: "positive".to_string(),
            macro_regime: "RISK_ON".to_string(),
            minutes_to_close: 120,
            reasons: vec!["rsi: sign=1.00 conf=0.40".to_string()],
        };
        let prompt = build_prompt(&req);
        assert!(prompt.contains("SPY"));
        assert!(prompt.contains("Conviction: 7"));
        assert!(prompt.contains("RISK_ON"));
    }
}
