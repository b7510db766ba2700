// =============================================================================
// AuditLog — append-only trail of trade decisions
// =============================================================================
//
// `AuditRecord` generalizes `decision_envelope.rs`'s `DecisionEnvelope` shape
// (id, symbol, side, final decision, blocking layer, reason) to this domain's
// cycle stages (direction assessment, AI adjudication, policy gates). Kept in
// an in-memory ring buffer the same way `app_state.rs` caps `recent_decisions`
// at a fixed length, and additionally appended as JSONL to disk so the
// history survives a restart for post-hoc review.

use std::path::PathBuf;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_RECENT_RECORDS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Entered,
    SkippedByPolicy,
    SkippedByAi,
    SkippedNoDirection,
    Exited,
    Error,
    ExternalAlert,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditOutcome::Entered => "entered",
            AuditOutcome::SkippedByPolicy => "skipped_by_policy",
            AuditOutcome::SkippedByAi => "skipped_by_ai",
            AuditOutcome::SkippedNoDirection => "skipped_no_direction",
            AuditOutcome::Exited => "exited",
            AuditOutcome::Error => "error",
            AuditOutcome::ExternalAlert => "external_alert",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub underlying: String,
    pub outcome: AuditOutcome,
    pub direction: Option<String>,
    pub conviction: Option<f64>,
    pub gex_regime: Option<String>,
    pub macro_regime: Option<String>,
    pub ai_verdict: Option<String>,
    pub reason: Option<String>,
    pub created_at: i64,
}

impl AuditRecord {
    pub fn new(underlying: &str, outcome: AuditOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            underlying: underlying.to_string(),
            outcome,
            direction: None,
            conviction: None,
            gex_regime: None,
            macro_regime: None,
            ai_verdict: None,
            reason: None,
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_direction(mut self, direction: impl Into<String>, conviction: f64) -> Self {
        self.direction = Some(direction.into());
        self.conviction = Some(conviction);
        self
    }

    pub fn with_regimes(mut self, gex: impl Into<String>, macro_regime: impl Into<String>) -> Self {
        self.gex_regime = Some(gex.into());
        self.macro_regime = Some(macro_regime.into());
        self
    }

    pub fn with_ai_verdict(mut self, verdict: impl Into<String>) -> Self {
        self.ai_verdict = Some(verdict.into());
        self
    }
}

pub struct AuditLog {
    path: Option<PathBuf>,
    recent: RwLock<Vec<AuditRecord>>,
}

impl AuditLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path, recent: RwLock::new(Vec::new()) }
    }

    /// Record an audit entry: push to the in-memory ring buffer and append a
    /// JSONL line to disk (best-effort, a write failure is logged, never
    /// fatal to the calling cycle).
    pub fn record(&self, record: AuditRecord) {
        if let Some(path) = &self.path {
            if let Err(e) = self.append_to_disk(path, &record) {
                warn!(error = %e, "failed to append audit record to disk");
            }
        }

        let mut recent = self.recent.write();
        recent.push(record);
        if recent.len() > MAX_RECENT_RECORDS {
            let overflow = recent.len() - MAX_RECENT_RECORDS;
            recent.drain(0..overflow);
        }
    }

    fn append_to_disk(&self, path: &PathBuf, record: &AuditRecord) -> anyhow::Result<()> {
        use std::io::Write;
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let recent = self.recent.read();
        recent.iter().rev().take(count).cloned().collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_path_only_buffers_in_memory() {
        let log = AuditLog::new(None);
        log.record(AuditRecord::new("SPY", AuditOutcome::Entered));
        assert_eq!(log.recent(10).len(), 1);
    }

    #[test]
    fn ring_buffer_caps_at_capacity() {
        let log = AuditLog::new(None);
        for _ in 0..(MAX_RECENT_RECORDS + 10) {
            log.record(AuditRecord::new("SPY", AuditOutcome::SkippedNoDirection));
        }
        assert_eq!(log.recent(10_000).len(), MAX_RECENT_RECORDS);
    }

    #[test]
    fn record_persists_jsonl_line_to_disk() {
        let path = std::env::temp_dir().join(format!("audit_log_test_{}.jsonl", uuid::Uuid::new_v4()));
        let log = AuditLog::new(Some(path.clone()));
        log.record(AuditRecord::new("QQQ", AuditOutcome::Exited).with_reason("take_profit"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("take_profit"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn recent_returns_most_recent_first() {
        let log = AuditLog::new(None);
        log.record(AuditRecord::new("SPY", AuditOutcome::Entered));
        log.record(AuditRecord::new("QQQ", AuditOutcome::Exited));
        let recent = log.recent(1);
        assert_eq!(recent[0].underlying, "QQQ");
    }
}
