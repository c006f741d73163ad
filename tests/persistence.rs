//! Save/load through the filesystem.

use std::fs;

use memobank::{BankFormat, CacheBank, Error, LoadError, SaveError, Value, KIB};
use tempfile::tempdir;

fn populated() -> CacheBank {
  let bank = CacheBank::new();
  bank
    .set("square", &[Value::Int(3)], &[], Value::Int(9))
    .unwrap();
  bank
    .set(
      "greet",
      &[Value::Str("ada".into())],
      &[("loud".to_string(), Value::Bool(true))],
      Value::Str("HELLO ADA".into()),
    )
    .unwrap();
  bank
}

#[test]
fn every_format_restores_the_bank() {
  let dir = tempdir().unwrap();
  for format in [
    BankFormat::Bincode,
    BankFormat::Zlib,
    BankFormat::Gzip,
    BankFormat::Json,
    BankFormat::Yaml,
  ] {
    let source = populated();
    let path = dir.path().join(format!("bank.{}", format.suffix()));
    let written = source.save_as(&path, 6).unwrap();
    assert_eq!(written, path);

    let restored = CacheBank::new();
    restored.load_from(&path).unwrap();
    assert_eq!(
      restored.get("square", &[Value::Int(3)], &[]).unwrap(),
      Some(Value::Int(9)),
      "format {format}"
    );
    assert_eq!(restored.len(), 2, "format {format}");
  }
}

#[test]
fn unrecognized_save_suffix_is_coerced_to_the_configured_format() {
  let dir = tempdir().unwrap();
  let bank = populated();
  bank.set_format(BankFormat::Json).unwrap();

  let written = bank.save_as(dir.path().join("bank.dat"), 0).unwrap();
  assert_eq!(written, dir.path().join("bank.json"));

  let restored = CacheBank::new();
  restored.load_from(&written).unwrap();
  assert_eq!(restored.len(), 2);
}

#[test]
fn default_path_follows_the_configured_format() {
  let dir = tempdir().unwrap();
  let bank = populated();
  bank.set_path(dir.path().join("bank.gz")).unwrap();

  let written = bank.save().unwrap();
  assert_eq!(written, dir.path().join("bank.gz"));

  let restored = CacheBank::new();
  restored.set_path(written).unwrap();
  restored.load().unwrap();
  assert_eq!(restored.len(), 2);
}

#[test]
fn suffixless_path_round_trips_through_the_configured_format() {
  let dir = tempdir().unwrap();
  let bank = populated();
  bank.set_path(dir.path().join("mybank")).unwrap();

  // Save coerces the bare stem to the configured format's suffix; load
  // must follow the same rule to find the file again.
  let written = bank.save().unwrap();
  assert_eq!(written, dir.path().join("mybank.gz"));

  let restored = CacheBank::new();
  restored.set_path(dir.path().join("mybank")).unwrap();
  restored.load().unwrap();
  assert_eq!(restored.len(), 2);
}

#[test]
fn load_refuses_oversized_files_without_reading_them() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("bank.bin");
  fs::write(&path, vec![0u8; 64 * KIB]).unwrap();

  let bank = CacheBank::new();
  bank.set_max_file_size(KIB).unwrap();
  let err = bank.load_from(&path).unwrap_err();
  assert!(matches!(
    err,
    Error::Load {
      source: LoadError::TooLarge {
        size,
        limit
      },
      ..
    } if size == 64 * KIB && limit == KIB
  ));
}

#[test]
fn load_infers_strictly_from_the_suffix() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("bank.pickle");
  fs::write(&path, b"whatever").unwrap();

  let err = CacheBank::new().load_from(&path).unwrap_err();
  assert!(matches!(
    err,
    Error::Load {
      source: LoadError::UnknownFormat(_),
      ..
    }
  ));
}

#[test]
fn loading_a_missing_file_is_a_typed_error() {
  let dir = tempdir().unwrap();
  let err = CacheBank::new()
    .load_from(dir.path().join("nope.gz"))
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Load {
      source: LoadError::NotFound(_),
      ..
    }
  ));
}

#[test]
fn saving_into_a_missing_directory_is_a_typed_error() {
  let dir = tempdir().unwrap();
  let err = populated()
    .save_as(dir.path().join("no_such_dir").join("bank.gz"), 6)
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Save {
      source: SaveError::MissingParent(_),
      ..
    }
  ));
}

#[test]
fn oversized_payloads_are_rejected_before_writing() {
  let dir = tempdir().unwrap();
  let bank = CacheBank::builder()
    .max_func_memory_size(256 * KIB)
    .build()
    .unwrap();
  bank
    .set("blob", &[Value::Int(1)], &[], Value::Str("x".repeat(64 * KIB)))
    .unwrap();
  bank.set_max_file_size(KIB).unwrap();

  let path = dir.path().join("bank.bin");
  let err = bank.save_as(&path, 0).unwrap_err();
  assert!(matches!(
    err,
    Error::Save {
      source: SaveError::TooLarge { .. },
      ..
    }
  ));
  assert!(!path.exists());
}

#[test]
fn corrupt_payloads_leave_the_live_bank_untouched() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("bank.gz");
  fs::write(&path, b"this is not gzip").unwrap();

  let bank = populated();
  let err = bank.load_from(&path).unwrap_err();
  assert!(matches!(
    err,
    Error::Load {
      source: LoadError::Corrupt(_),
      ..
    }
  ));
  // The failed load replaced nothing.
  assert_eq!(
    bank.get("square", &[Value::Int(3)], &[]).unwrap(),
    Some(Value::Int(9))
  );
}

#[test]
fn loaded_banks_are_trimmed_to_the_local_bounds() {
  let dir = tempdir().unwrap();
  let source = CacheBank::new();
  for name in ["a", "b", "c", "d"] {
    source.set(name, &[Value::Int(1)], &[], Value::Int(1)).unwrap();
  }
  let path = source.save_as(dir.path().join("bank.gz"), 6).unwrap();

  let tight = CacheBank::builder().max_bank_size(2).build().unwrap();
  tight.load_from(&path).unwrap();

  assert_eq!(tight.len(), 2);
  // The most recently written functions survive the trim.
  assert!(tight.contains("c") && tight.contains("d"));
}

#[test]
fn json_dump_is_human_readable() {
  let dir = tempdir().unwrap();
  let path = populated()
    .save_as(dir.path().join("bank.json"), 0)
    .unwrap();

  let text = fs::read_to_string(path).unwrap();
  // JSON escapes the quotes inside the rendered key literal.
  assert!(text.contains(r#"(\"square\", (3,))"#));
  assert!(text.contains("HELLO ADA"));
}
