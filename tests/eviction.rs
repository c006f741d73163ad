//! Eviction behavior observed through the public API.

use memobank::{CacheBank, RecencyPolicy, Value, KIB};

fn arg(n: i64) -> Vec<Value> {
  vec![Value::Int(n)]
}

#[test]
fn lru_keeps_the_recently_read_function() {
  let bank = CacheBank::builder().max_bank_size(2).build().unwrap();
  bank.set("a", &arg(1), &[], Value::Int(1)).unwrap();
  bank.set("b", &arg(1), &[], Value::Int(2)).unwrap();

  // Reading `a` makes `b` the least recently used.
  bank.get("a", &arg(1), &[]).unwrap();
  bank.set("c", &arg(1), &[], Value::Int(3)).unwrap();

  assert!(bank.contains("a"));
  assert!(!bank.contains("b"));
  assert!(bank.contains("c"));
}

#[test]
fn fifo_evicts_the_earliest_inserted_function() {
  let bank = CacheBank::builder()
    .max_bank_size(2)
    .recency_policy(RecencyPolicy::Fifo)
    .build()
    .unwrap();
  bank.set("a", &arg(1), &[], Value::Int(1)).unwrap();
  bank.set("b", &arg(1), &[], Value::Int(2)).unwrap();

  // Under FIFO the read does not save `a`.
  bank.get("a", &arg(1), &[]).unwrap();
  bank.set("c", &arg(1), &[], Value::Int(3)).unwrap();

  assert!(!bank.contains("a"));
  assert!(bank.contains("b"));
  assert!(bank.contains("c"));
}

#[test]
fn writing_an_existing_function_never_evicts_for_slots() {
  let bank = CacheBank::builder().max_bank_size(2).build().unwrap();
  bank.set("a", &arg(1), &[], Value::Int(1)).unwrap();
  bank.set("b", &arg(1), &[], Value::Int(2)).unwrap();

  // `a` already holds a slot, so the full bank stays intact.
  bank.set("a", &arg(2), &[], Value::Int(3)).unwrap();
  assert_eq!(bank.len(), 2);
}

#[test]
fn per_function_bound_sheds_oldest_entries_first() {
  let bank = CacheBank::builder()
    .max_func_memory_size(4 * KIB)
    .build()
    .unwrap();

  // Each entry is roughly 1 KiB of string payload; the fifth write must
  // push the earliest entries out.
  for n in 0..5 {
    bank
      .set("f", &arg(n), &[], Value::Str("x".repeat(KIB)))
      .unwrap();
  }

  assert!(bank.func_estimated_size("f").unwrap() <= 4 * KIB);
  assert_eq!(bank.get("f", &arg(0), &[]).unwrap(), None);
  assert!(bank.get("f", &arg(4), &[]).unwrap().is_some());
}

#[test]
fn func_size_override_beats_the_default_bound() {
  let bank = CacheBank::builder()
    .max_func_memory_size(64 * KIB)
    .func_size_override("tight", 2 * KIB)
    .build()
    .unwrap();

  for n in 0..8 {
    bank
      .set("tight", &arg(n), &[], Value::Str("x".repeat(KIB)))
      .unwrap();
    bank
      .set("roomy", &arg(n), &[], Value::Str("x".repeat(KIB)))
      .unwrap();
  }

  assert!(bank.func_estimated_size("tight").unwrap() <= 2 * KIB);
  // The default bound left the other function alone.
  assert!(bank.get("roomy", &arg(0), &[]).unwrap().is_some());
}

#[test]
fn total_memory_ceiling_trims_across_functions() {
  let bank = CacheBank::builder()
    .max_total_memory_size(8 * KIB)
    .max_func_memory_size(8 * KIB)
    .build()
    .unwrap();

  for n in 0..4 {
    bank
      .set("a", &arg(n), &[], Value::Str("x".repeat(KIB)))
      .unwrap();
    bank
      .set("b", &arg(n), &[], Value::Str("x".repeat(KIB)))
      .unwrap();
  }

  assert!(bank.estimated_size() < 8 * KIB);
  // The most recent write always survives.
  assert!(bank.get("b", &arg(3), &[]).unwrap().is_some());
}

#[test]
fn tightened_bounds_apply_from_the_next_write() {
  let bank = CacheBank::builder().max_bank_size(4).build().unwrap();
  for name in ["a", "b", "c"] {
    bank.set(name, &arg(1), &[], Value::Int(1)).unwrap();
  }

  // Shrinking the slot count does not evict anything by itself.
  bank.set_max_bank_size(2).unwrap();
  assert_eq!(bank.len(), 3);

  // The next new function triggers enforcement down to the new limit.
  bank.set("d", &arg(1), &[], Value::Int(1)).unwrap();
  assert_eq!(bank.len(), 2);
  assert!(bank.contains("d"));
}
