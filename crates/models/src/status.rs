use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::source::Source;

/// Last reported state per source. Payloads are opaque and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub vercel_metrics: Value,
    pub supabase_health: Value,
    pub github_actions: Value,
    pub termux_status: Value,
    pub agent_performance: Value,
}

impl SystemState {
    /// Every source at `{"status": "unknown"}`.
    pub fn unknown() -> Self {
        Self {
            vercel_metrics: unknown_state(),
            supabase_health: unknown_state(),
            github_actions: unknown_state(),
            termux_status: unknown_state(),
            agent_performance: unknown_state(),
        }
    }

    pub fn get(&self, source: Source) -> &Value {
        match source {
            Source::VercelMetrics => &self.vercel_metrics,
            Source::SupabaseHealth => &self.supabase_health,
            Source::GithubActions => &self.github_actions,
            Source::TermuxStatus => &self.termux_status,
            Source::AgentPerformance => &self.agent_performance,
        }
    }

    /// Replace the payload for `source`, returning the previous one.
    pub fn set(&mut self, source: Source, data: Value) -> Value {
        let slot = match source {
            Source::VercelMetrics => &mut self.vercel_metrics,
            Source::SupabaseHealth => &mut self.supabase_health,
            Source::GithubActions => &mut self.github_actions,
            Source::TermuxStatus => &mut self.termux_status,
            Source::AgentPerformance => &mut self.agent_performance,
        };
        std::mem::replace(slot, data)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Source, &Value)> + '_ {
        Source::ALL.into_iter().map(move |src| (src, self.get(src)))
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::unknown()
    }
}

fn unknown_state() -> Value {
    json!({ "status": "unknown" })
}

/// The single persisted record aggregating every source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusDocument {
    #[serde(default, with = "crate::timestamp::option")]
    pub last_updated: Option<DateTime<Utc>>,
    pub system_state: SystemState,
}

impl StatusDocument {
    /// Overwrite one source and stamp the document.
    pub fn apply(&mut self, source: Source, data: Value, at: DateTime<Utc>) {
        self.system_state.set(source, data);
        self.last_updated = Some(at);
    }
}

/// POST body accepted by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub source: String,
    pub data: Value,
}

/// Outcome of a successful source update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateResult {
    pub source: Source,
    #[serde(with = "crate::timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl UpdateResult {
    pub fn message(&self) -> String {
        format!("Belief for {} updated.", self.source)
    }
}
