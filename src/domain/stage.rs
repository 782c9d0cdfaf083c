// ============================================================
// Layer 3 — Stage
// ============================================================
// Which phase of an epoch a batch belongs to. The objective
// hook computes auxiliary metrics (classification error) only
// outside of training.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Train,
    Valid,
}

impl Stage {
    pub fn is_train(self) -> bool {
        matches!(self, Stage::Train)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Train => write!(f, "train"),
            Stage::Valid => write!(f, "valid"),
        }
    }
}
