//! Election role of this process

use serde::{Deserialize, Serialize};

/// Process-local election state.
///
/// Starts as `Candidate`; only the election primitive's callbacks move it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    #[default]
    Candidate,
    Leader,
}

impl ElectionState {
    pub fn is_leader(&self) -> bool {
        matches!(self, ElectionState::Leader)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionState::Candidate => "candidate",
            ElectionState::Leader => "leader",
        }
    }
}

impl std::fmt::Display for ElectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
