use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// A monitored subsystem that reports into the status document.
///
/// The set is closed: documents always carry exactly these five entries,
/// in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    VercelMetrics,
    SupabaseHealth,
    GithubActions,
    TermuxStatus,
    AgentPerformance,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::VercelMetrics,
        Source::SupabaseHealth,
        Source::GithubActions,
        Source::TermuxStatus,
        Source::AgentPerformance,
    ];

    /// Wire name, identical to the key used in `system_state`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::VercelMetrics => "vercel_metrics",
            Source::SupabaseHealth => "supabase_health",
            Source::GithubActions => "github_actions",
            Source::TermuxStatus => "termux_status",
            Source::AgentPerformance => "agent_performance",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .iter()
            .copied()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| ModelError::UnknownSource(s.to_string()))
    }
}
