//! Approximate, cycle-safe memory footprint estimation.
//!
//! Eviction is driven by an estimate of how much memory a function's cached
//! results occupy: the shallow size of every node plus its heap buffers,
//! walked recursively. Each measurement pass carries a visited set of heap
//! addresses, so shared substructure (and any cycle reachable through
//! [`Value::Shared`]) contributes its allocation once and nothing on later
//! encounters. This is a heuristic upper bound, not exact accounting.

use std::collections::HashSet;
use std::mem;

use crate::key::CallKey;
use crate::value::Value;

/// One measurement pass. Re-measuring after an eviction starts a fresh pass
/// so previously visited nodes are counted again.
pub(crate) struct FootprintPass {
  seen: HashSet<usize, ahash::RandomState>,
}

impl FootprintPass {
  pub(crate) fn new() -> Self {
    FootprintPass {
      seen: HashSet::default(),
    }
  }

  /// Marks a heap address, returning `true` the first time it is seen.
  fn mark(&mut self, addr: usize) -> bool {
    self.seen.insert(addr)
  }

  pub(crate) fn value(&mut self, v: &Value) -> usize {
    let slot = mem::size_of::<Value>();
    match v {
      Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => slot,
      Value::Str(s) => {
        if self.mark(s.as_ptr() as usize) {
          slot + s.capacity()
        } else {
          slot
        }
      }
      Value::List(items) => {
        if self.mark(items.as_ptr() as usize) {
          let spare = items.capacity().saturating_sub(items.len()) * slot;
          slot + spare + items.iter().map(|item| self.value(item)).sum::<usize>()
        } else {
          slot
        }
      }
      Value::Map(pairs) => {
        if self.mark(pairs.as_ptr() as usize) {
          let spare =
            pairs.capacity().saturating_sub(pairs.len()) * mem::size_of::<(Value, Value)>();
          slot
            + spare
            + pairs
              .iter()
              .map(|(k, val)| self.value(k) + self.value(val))
              .sum::<usize>()
        } else {
          slot
        }
      }
      Value::Shared(inner) => {
        if self.mark(inner.as_ref() as *const Value as usize) {
          slot + self.value(inner)
        } else {
          slot
        }
      }
    }
  }

  pub(crate) fn string(&mut self, s: &str) -> usize {
    let shallow = mem::size_of::<String>();
    if self.mark(s.as_ptr() as usize) {
      shallow + s.len()
    } else {
      shallow
    }
  }

  pub(crate) fn key(&mut self, key: &CallKey) -> usize {
    let mut size = self.string(key.func());
    if let Some(args) = key.args() {
      size += args.iter().map(|a| self.value(a)).sum::<usize>();
    }
    if let Some(kwargs) = key.kwargs() {
      size += kwargs
        .iter()
        .map(|(name, v)| self.string(name) + self.value(v))
        .sum::<usize>();
    }
    size
  }
}

/// Estimates the footprint of a single value with a fresh pass.
pub fn estimate_value(v: &Value) -> usize {
  FootprintPass::new().value(v)
}
