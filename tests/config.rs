//! Construction-time validation and runtime reconfiguration.

use memobank::{BankFormat, CacheBank, CacheBankBuilder, Error, RecencyPolicy, Value, KIB, MIB};

#[test]
fn builder_rejects_degenerate_limits() {
  assert!(matches!(
    CacheBankBuilder::new().max_bank_size(0).build(),
    Err(Error::Construction(_))
  ));
  assert!(matches!(
    CacheBankBuilder::new().max_func_memory_size(64).build(),
    Err(Error::Construction(_))
  ));
  assert!(matches!(
    CacheBankBuilder::new()
      .max_total_memory_size(MIB)
      .max_func_memory_size(2 * MIB)
      .build(),
    Err(Error::Construction(_))
  ));
  assert!(matches!(
    CacheBankBuilder::new().max_file_size(0).build(),
    Err(Error::Construction(_))
  ));
}

#[test]
fn builder_applies_every_knob() {
  let bank = CacheBankBuilder::new()
    .max_bank_size(5)
    .max_total_memory_size(MIB)
    .max_func_memory_size(32 * KIB)
    .func_size_override("hot", 64 * KIB)
    .recency_policy(RecencyPolicy::Fifo)
    .format(BankFormat::Yaml)
    .path("caches/bank.yaml")
    .max_file_size(MIB)
    .build()
    .unwrap();

  let config = bank.config();
  assert_eq!(config.max_bank_size, 5);
  assert_eq!(config.policy, RecencyPolicy::Fifo);
  assert_eq!(config.format, BankFormat::Yaml);
  assert_eq!(config.func_size_overrides.get("hot").copied(), Some(64 * KIB));
}

#[test]
fn setters_validate_eagerly() {
  let bank = CacheBank::new();

  assert!(bank.set_max_bank_size(0).is_err());
  assert!(bank.set_max_func_memory_size(16).is_err());
  // A rejected change leaves the configuration untouched.
  assert_eq!(bank.config().max_bank_size, 100);

  bank.set_max_bank_size(3).unwrap();
  assert_eq!(bank.config().max_bank_size, 3);
}

#[test]
fn json_config_builds_a_working_bank() {
  let bank = CacheBankBuilder::from_json(
    r#"{
      "max_bank_size": 2,
      "policy": "fifo",
      "format": "json"
    }"#,
  )
  .unwrap()
  .build()
  .unwrap();

  bank.set("a", &[Value::Int(1)], &[], Value::Int(1)).unwrap();
  bank.set("b", &[Value::Int(1)], &[], Value::Int(2)).unwrap();
  bank.set("c", &[Value::Int(1)], &[], Value::Int(3)).unwrap();

  // FIFO with two slots: `a` went first.
  assert!(!bank.contains("a"));
  assert_eq!(bank.len(), 2);
}

#[test]
fn apply_config_updates_a_live_bank() {
  let bank = CacheBank::new();
  let map = serde_json::json!({
    "max_bank_size": 9,
    "path": "elsewhere.gz",
    "unknown_knob": [1, 2, 3]
  });

  bank.apply_config(map.as_object().unwrap()).unwrap();
  let config = bank.config();
  assert_eq!(config.max_bank_size, 9);
  assert_eq!(config.path, std::path::PathBuf::from("elsewhere.gz"));
}

#[test]
fn apply_config_json_parses_and_applies() {
  let bank = CacheBank::new();
  bank
    .apply_config_json(r#"{"max_bank_size": 4, "policy": "fifo"}"#)
    .unwrap();

  assert_eq!(bank.config().max_bank_size, 4);
  assert_eq!(bank.config().policy, RecencyPolicy::Fifo);

  assert!(bank.apply_config_json("[1, 2]").is_err());
  assert!(bank.apply_config_json("not json at all").is_err());
}

#[test]
fn apply_config_rejects_malformed_known_keys() {
  let bank = CacheBank::new();
  let map = serde_json::json!({ "policy": "mru" });

  let err = bank.apply_config(map.as_object().unwrap()).unwrap_err();
  assert!(matches!(err, Error::Config { .. }));
  // Nothing was committed.
  assert_eq!(bank.config().policy, RecencyPolicy::Lru);
}
