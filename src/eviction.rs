//! Layered eviction passes.
//!
//! Three independent bounds keep the bank in shape, each enforced by its own
//! pass over the store:
//!
//! 1. bank slots: at most `max_bank_size` distinct functions, enforced by
//!    dropping whole front functions before a new function is admitted;
//! 2. total memory: the estimated footprint of the whole bank, trimmed one
//!    call entry at a time from the front function;
//! 3. per-function memory: each function's own footprint against its bound
//!    or override, trimmed one call entry at a time.
//!
//! Every pass re-measures after each eviction rather than trusting a stale
//! estimate, since evicting a shared value may free less than its first
//! measurement suggested.

use crate::config::BankConfig;
use crate::store::Bank;

/// Makes room for one more function when the bank is full. A no-op when the
/// new function already exists or slots remain.
pub(crate) fn reserve_bank_slot(bank: &mut Bank, max_bank_size: usize) {
  while bank.len() >= max_bank_size {
    match bank.evict_front_func() {
      Some((func, entries)) => {
        tracing::debug!(func = %func, entries, "evicted function to reserve a bank slot");
      }
      None => break,
    }
  }
}

/// Trims the whole bank down under the total memory ceiling. The bound is
/// inclusive: a bank sitting exactly at the ceiling is trimmed, so a write
/// landing at the limit still leaves headroom.
pub(crate) fn enforce_total_memory(bank: &mut Bank, max_total: usize) {
  while !bank.is_empty() && bank.footprint() >= max_total {
    match bank.evict_one_from_front() {
      Some((func, _key)) => {
        tracing::debug!(func = %func, "evicted call entry for total memory pressure");
      }
      None => break,
    }
  }
}

/// Trims one function's cache down to its memory bound. Exclusive: a cache
/// exactly at the bound is left alone.
pub(crate) fn enforce_func_memory(bank: &mut Bank, func: &str, bound: usize) {
  while bank.func_footprint(func).is_some_and(|size| size > bound) {
    if bank.evict_one_from(func).is_none() {
      break;
    }
    tracing::debug!(func = %func, bound, "evicted call entry for function memory pressure");
  }
}

/// Re-applies every bound to a bank that arrived from outside the write
/// path, e.g. one just decoded from disk.
pub(crate) fn enforce_all(bank: &mut Bank, config: &BankConfig) {
  while bank.len() > config.max_bank_size {
    if bank.evict_front_func().is_none() {
      break;
    }
  }
  enforce_total_memory(bank, config.max_total_memory_size);
  for func in bank.func_names() {
    enforce_func_memory(bank, &func, config.func_bound(&func));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::key::make_key;
  use crate::value::Value;

  fn filled(funcs: &[&str]) -> Bank {
    let mut bank = Bank::new();
    for func in funcs {
      let key = make_key(func, &[Value::Int(1)], &[]).unwrap();
      bank.insert(key, Value::Int(0));
    }
    bank
  }

  #[test]
  fn slot_reservation_drops_front_functions() {
    let mut bank = filled(&["a", "b", "c"]);
    reserve_bank_slot(&mut bank, 3);

    assert_eq!(bank.len(), 2);
    assert!(!bank.contains("a"));
    assert!(bank.contains("c"));
  }

  #[test]
  fn slot_reservation_is_a_noop_below_capacity() {
    let mut bank = filled(&["a", "b"]);
    reserve_bank_slot(&mut bank, 3);
    assert_eq!(bank.len(), 2);
  }

  #[test]
  fn total_pass_trims_entries_not_whole_functions() {
    let mut bank = Bank::new();
    for arg in 0..4 {
      let key = make_key("a", &[Value::Int(arg)], &[]).unwrap();
      bank.insert(key, Value::Str("x".repeat(256)));
    }
    bank.insert(
      make_key("b", &[Value::Int(0)], &[]).unwrap(),
      Value::Int(1),
    );

    let before = bank.footprint();
    enforce_total_memory(&mut bank, before);

    // Inclusive bound: at least one entry had to go, from `a` (the front),
    // and `a` itself survives because it still holds entries.
    assert!(bank.footprint() < before);
    assert!(bank.contains("a"));
    assert!(bank.func_len("a").unwrap() < 4);
    assert_eq!(bank.func_len("b"), Some(1));
  }

  #[test]
  fn func_pass_respects_the_exclusive_bound() {
    let mut bank = Bank::new();
    bank.insert(
      make_key("a", &[Value::Int(1)], &[]).unwrap(),
      Value::Str("x".repeat(512)),
    );

    let exact = bank.func_footprint("a").unwrap();
    enforce_func_memory(&mut bank, "a", exact);
    assert_eq!(bank.func_len("a"), Some(1));

    enforce_func_memory(&mut bank, "a", exact - 1);
    assert!(!bank.contains("a"));
  }

  #[test]
  fn enforce_all_applies_every_bound() {
    let mut bank = filled(&["a", "b", "c", "d"]);
    let mut config = BankConfig::default();
    config.max_bank_size = 2;

    enforce_all(&mut bank, &config);
    assert_eq!(bank.len(), 2);
    assert!(bank.contains("c") && bank.contains("d"));
  }
}
