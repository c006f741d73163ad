use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the two-level store orders its entries and picks eviction victims.
///
/// Both policies evict from the front of the order. Under LRU every access
/// promotes the touched function and call entry to the back, so the front is
/// the least recently used; under FIFO accesses leave the order alone, so
/// the front is the earliest inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecencyPolicy {
  #[default]
  Lru,
  Fifo,
}

impl RecencyPolicy {
  /// Whether a read access reorders entries. A no-op under FIFO.
  pub(crate) fn promotes_on_access(self) -> bool {
    matches!(self, RecencyPolicy::Lru)
  }
}

impl fmt::Display for RecencyPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecencyPolicy::Lru => write!(f, "lru"),
      RecencyPolicy::Fifo => write!(f, "fifo"),
    }
  }
}

impl FromStr for RecencyPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "lru" => Ok(RecencyPolicy::Lru),
      "fifo" => Ok(RecencyPolicy::Fifo),
      other => Err(format!("unknown recency policy `{other}`")),
    }
  }
}
