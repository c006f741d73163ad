//! Hit/miss accounting.
//!
//! The reporter lives next to the store behind the same lock, so counters
//! are exact with respect to the operations that produced them. Stats
//! survive eviction on purpose: a function whose entries were evicted for
//! memory pressure keeps its history until [`UsageReporter::clear`].

use std::fmt;

use indexmap::IndexMap;

/// Counters for one memoized function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncStats {
  pub hits: u64,
  pub misses: u64,
}

impl FuncStats {
  pub fn total(&self) -> u64 {
    self.hits + self.misses
  }

  /// Hits over recorded lookups, `0.0` when nothing was recorded.
  pub fn hit_ratio(&self) -> f64 {
    if self.total() == 0 {
      0.0
    } else {
      self.hits as f64 / self.total() as f64
    }
  }
}

#[derive(Debug, Default)]
pub(crate) struct UsageReporter {
  funcs: IndexMap<String, FuncStats, ahash::RandomState>,
}

impl UsageReporter {
  /// Registers a function so it shows up in reports even before its first
  /// recorded lookup.
  pub(crate) fn add_func(&mut self, func: &str) {
    self.funcs.entry(func.to_string()).or_default();
  }

  pub(crate) fn record_hit(&mut self, func: &str) {
    self.funcs.entry(func.to_string()).or_default().hits += 1;
  }

  pub(crate) fn record_miss(&mut self, func: &str) {
    self.funcs.entry(func.to_string()).or_default().misses += 1;
  }

  pub(crate) fn clear(&mut self) {
    self.funcs.clear();
  }

  pub(crate) fn snapshot(&self) -> UsageReport {
    let mut totals = FuncStats::default();
    for stats in self.funcs.values() {
      totals.hits += stats.hits;
      totals.misses += stats.misses;
    }
    UsageReport {
      funcs: self
        .funcs
        .iter()
        .map(|(name, stats)| (name.clone(), *stats))
        .collect(),
      totals,
    }
  }
}

/// Point-in-time copy of the reporter's counters, detached from the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
  funcs: Vec<(String, FuncStats)>,
  totals: FuncStats,
}

impl UsageReport {
  pub fn totals(&self) -> FuncStats {
    self.totals
  }

  pub fn func(&self, name: &str) -> Option<FuncStats> {
    self
      .funcs
      .iter()
      .find(|(func, _)| func == name)
      .map(|(_, stats)| *stats)
  }

  pub fn funcs(&self) -> impl Iterator<Item = (&str, FuncStats)> {
    self.funcs.iter().map(|(name, stats)| (name.as_str(), *stats))
  }

  pub fn is_empty(&self) -> bool {
    self.funcs.is_empty()
  }
}

impl fmt::Display for UsageReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "cache usage: {} hits / {} misses ({:.1}% hit ratio)",
      self.totals.hits,
      self.totals.misses,
      self.totals.hit_ratio() * 100.0
    )?;
    for (name, stats) in &self.funcs {
      writeln!(
        f,
        "  {name}: {} hits / {} misses ({:.1}%)",
        stats.hits,
        stats.misses,
        stats.hit_ratio() * 100.0
      )?;
    }
    Ok(())
  }
}
