//! The two-level ordered store: function name → ordered call cache.
//!
//! Both levels are insertion-ordered maps. Recency is expressed purely
//! through ordering: writes always move the touched function and call entry
//! to the back, reads do so only under LRU, and every eviction takes the
//! front slot. The store itself is policy-agnostic apart from that one
//! promotion decision; the layered threshold logic lives in
//! [`crate::eviction`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::estimator::FootprintPass;
use crate::key::CallKey;
use crate::policy::RecencyPolicy;
use crate::value::Value;

type OrderedMap<K, V> = IndexMap<K, V, ahash::RandomState>;

/// Outcome of a keyed lookup, distinguishing an unknown function from a
/// known function that simply lacks the call entry. Only the latter is
/// recorded as a miss, matching the hit/miss accounting contract.
#[derive(Debug)]
pub(crate) enum Lookup {
  UnknownFunc,
  Miss,
  Hit(Value),
}

/// The ordered per-function call cache.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct FuncCache {
  entries: OrderedMap<CallKey, Value>,
}

impl FuncCache {
  pub(crate) fn from_entries(entries: Vec<(CallKey, Value)>) -> Self {
    FuncCache {
      entries: entries.into_iter().collect(),
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub(crate) fn iter(&self) -> impl Iterator<Item = (&CallKey, &Value)> {
    self.entries.iter()
  }

  /// Removes the front (eviction-victim) entry.
  fn evict_front(&mut self) -> Option<(CallKey, Value)> {
    self.entries.shift_remove_index(0)
  }

  fn promote(&mut self, key: &CallKey) {
    if let Some(index) = self.entries.get_index_of(key) {
      let back = self.entries.len() - 1;
      self.entries.move_index(index, back);
    }
  }

  pub(crate) fn footprint(&self, pass: &mut FootprintPass) -> usize {
    let mut size = std::mem::size_of::<Self>();
    for (key, value) in &self.entries {
      size += pass.key(key) + pass.value(value);
    }
    size
  }
}

/// The bank: an insertion-ordered map of function name → call cache.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Bank {
  funcs: OrderedMap<String, FuncCache>,
}

impl Bank {
  pub(crate) fn new() -> Self {
    Bank::default()
  }

  pub(crate) fn from_parts(funcs: Vec<(String, FuncCache)>) -> Self {
    Bank {
      funcs: funcs.into_iter().collect(),
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.funcs.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.funcs.is_empty()
  }

  pub(crate) fn contains(&self, func: &str) -> bool {
    self.funcs.contains_key(func)
  }

  pub(crate) fn func_names(&self) -> Vec<String> {
    self.funcs.keys().cloned().collect()
  }

  #[cfg(test)]
  pub(crate) fn func_len(&self, func: &str) -> Option<usize> {
    self.funcs.get(func).map(FuncCache::len)
  }

  pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &FuncCache)> {
    self.funcs.iter()
  }

  /// Looks up a call entry, promoting both levels to most-recently-used
  /// when the policy reorders on access.
  pub(crate) fn lookup(&mut self, key: &CallKey, policy: RecencyPolicy) -> Lookup {
    let Some(func_index) = self.funcs.get_index_of(key.func()) else {
      return Lookup::UnknownFunc;
    };

    let hit = {
      let (_, cache) = self
        .funcs
        .get_index_mut(func_index)
        .expect("index fetched above");
      match cache.entries.get(key) {
        Some(value) => {
          let value = value.clone();
          if policy.promotes_on_access() {
            cache.promote(key);
          }
          Some(value)
        }
        None => None,
      }
    };

    match hit {
      Some(value) => {
        if policy.promotes_on_access() {
          let back = self.funcs.len() - 1;
          self.funcs.move_index(func_index, back);
        }
        Lookup::Hit(value)
      }
      None => Lookup::Miss,
    }
  }

  /// Inserts or overwrites a call entry, moving both levels to the back.
  /// Returns `true` when the function was not previously present.
  pub(crate) fn insert(&mut self, key: CallKey, value: Value) -> bool {
    let func = key.func().to_string();
    let was_new = !self.funcs.contains_key(&func);

    let cache = self.funcs.entry(func.clone()).or_default();
    cache.entries.insert(key.clone(), value);
    cache.promote(&key);

    if let Some(index) = self.funcs.get_index_of(&func) {
      let back = self.funcs.len() - 1;
      self.funcs.move_index(index, back);
    }
    was_new
  }

  /// Evicts the whole front function entry.
  pub(crate) fn evict_front_func(&mut self) -> Option<(String, usize)> {
    self
      .funcs
      .shift_remove_index(0)
      .map(|(name, cache)| (name, cache.len()))
  }

  /// Evicts one call entry from the front function, dropping the function
  /// once it is emptied. Used by the total-memory pass.
  pub(crate) fn evict_one_from_front(&mut self) -> Option<(String, CallKey)> {
    let (name, cache) = self.funcs.get_index_mut(0)?;
    let name = name.clone();
    let victim = cache.evict_front().map(|(key, _)| key)?;
    if self.funcs[0].is_empty() {
      self.funcs.shift_remove_index(0);
    }
    Some((name, victim))
  }

  /// Evicts one call entry from the named function's front.
  pub(crate) fn evict_one_from(&mut self, func: &str) -> Option<CallKey> {
    let cache = self.funcs.get_mut(func)?;
    let victim = cache.evict_front().map(|(key, _)| key);
    if self.funcs.get(func).is_some_and(FuncCache::is_empty) {
      self.funcs.shift_remove(func);
    }
    victim
  }

  pub(crate) fn remove_func(&mut self, func: &str) -> bool {
    self.funcs.shift_remove(func).is_some()
  }

  pub(crate) fn clear(&mut self) {
    self.funcs.clear();
  }

  /// Estimated footprint of the whole bank, measured in one fresh pass so
  /// shared substructure across functions is counted once.
  pub(crate) fn footprint(&self) -> usize {
    let mut pass = FootprintPass::new();
    let mut size = std::mem::size_of::<Self>();
    for (name, cache) in &self.funcs {
      size += pass.string(name) + cache.footprint(&mut pass);
    }
    size
  }

  pub(crate) fn func_footprint(&self, func: &str) -> Option<usize> {
    let cache = self.funcs.get(func)?;
    Some(cache.footprint(&mut FootprintPass::new()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::key::make_key;

  fn key(func: &str, arg: i64) -> CallKey {
    make_key(func, &[Value::Int(arg)], &[]).unwrap()
  }

  #[test]
  fn lru_lookup_promotes_both_levels() {
    let mut bank = Bank::new();
    bank.insert(key("a", 1), Value::Int(10));
    bank.insert(key("b", 1), Value::Int(20));

    // Touch `a`, making `b` the front (LRU) function.
    assert!(matches!(
      bank.lookup(&key("a", 1), RecencyPolicy::Lru),
      Lookup::Hit(Value::Int(10))
    ));
    assert_eq!(bank.evict_front_func().map(|(name, _)| name), Some("b".to_string()));
  }

  #[test]
  fn fifo_lookup_leaves_order_alone() {
    let mut bank = Bank::new();
    bank.insert(key("a", 1), Value::Int(10));
    bank.insert(key("b", 1), Value::Int(20));

    assert!(matches!(
      bank.lookup(&key("a", 1), RecencyPolicy::Fifo),
      Lookup::Hit(_)
    ));
    // `a` was inserted first, so it is still the front.
    assert_eq!(bank.evict_front_func().map(|(name, _)| name), Some("a".to_string()));
  }

  #[test]
  fn unknown_function_is_not_a_plain_miss() {
    let mut bank = Bank::new();
    bank.insert(key("a", 1), Value::Int(10));

    assert!(matches!(
      bank.lookup(&key("zzz", 1), RecencyPolicy::Lru),
      Lookup::UnknownFunc
    ));
    assert!(matches!(
      bank.lookup(&key("a", 2), RecencyPolicy::Lru),
      Lookup::Miss
    ));
  }

  #[test]
  fn eviction_drops_emptied_functions() {
    let mut bank = Bank::new();
    bank.insert(key("a", 1), Value::Int(10));

    assert!(bank.evict_one_from_front().is_some());
    assert!(bank.is_empty());
  }

  #[test]
  fn overwrite_keeps_a_single_entry() {
    let mut bank = Bank::new();
    bank.insert(key("a", 1), Value::Int(1));
    bank.insert(key("a", 1), Value::Int(2));

    assert_eq!(bank.func_len("a"), Some(1));
    assert!(matches!(
      bank.lookup(&key("a", 1), RecencyPolicy::Lru),
      Lookup::Hit(Value::Int(2))
    ));
  }
}
