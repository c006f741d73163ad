//! On-disk formats and the encode/decode pipeline.
//!
//! Two families share one pipeline. The binary family (`bin`, `zlib`, `gz`)
//! serializes the bank with bincode, optionally wrapped in a compression
//! stream, and round-trips keys exactly. The text family (`json`, `yaml`)
//! writes a human-readable two-level mapping of function name to
//! `key literal → value`, with every [`CallKey`] rendered through
//! [`crate::literal`]; it trades key fidelity for inspectability.
//!
//! Decoding is strict: a payload either decodes fully into a bank or fails
//! with [`LoadError::Corrupt`], so a failed load never leaves a partially
//! restored cache behind.

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use indexmap::IndexMap;

use crate::error::{LoadError, SaveError};
use crate::literal::{parse_key, render_key};
use crate::store::{Bank, FuncCache};
use crate::value::Value;

/// Default compression level for the `zlib` and `gz` formats. Low by
/// default: these payloads are small and save latency matters more than
/// ratio.
pub const DEFAULT_COMPRESSION: u32 = 1;

/// The five persistence formats, keyed by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BankFormat {
  /// Raw bincode.
  Bincode,
  /// Bincode in a zlib stream.
  Zlib,
  /// Bincode in a gzip stream.
  Gzip,
  /// Human-readable JSON text form.
  Json,
  /// Human-readable YAML text form.
  Yaml,
}

impl BankFormat {
  pub fn suffix(self) -> &'static str {
    match self {
      BankFormat::Bincode => "bin",
      BankFormat::Zlib => "zlib",
      BankFormat::Gzip => "gz",
      BankFormat::Json => "json",
      BankFormat::Yaml => "yaml",
    }
  }

  /// Resolves a suffix, with or without the leading dot.
  pub fn from_suffix(suffix: &str) -> Option<BankFormat> {
    match suffix.trim_start_matches('.') {
      "bin" => Some(BankFormat::Bincode),
      "zlib" => Some(BankFormat::Zlib),
      "gz" => Some(BankFormat::Gzip),
      "json" => Some(BankFormat::Json),
      "yaml" | "yml" => Some(BankFormat::Yaml),
      _ => None,
    }
  }

  pub fn from_path(path: &Path) -> Option<BankFormat> {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(BankFormat::from_suffix)
  }

  fn compressed(self) -> bool {
    matches!(self, BankFormat::Zlib | BankFormat::Gzip)
  }
}

impl fmt::Display for BankFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.suffix())
  }
}

/// The shape both text formats serialize: function name → key literal →
/// cached value, all orders preserved.
type TextForm = IndexMap<String, IndexMap<String, Value>>;

fn to_text_form(bank: &Bank) -> TextForm {
  bank
    .iter()
    .map(|(func, cache)| {
      let entries = cache
        .iter()
        .map(|(key, value)| (render_key(key), value.clone()))
        .collect();
      (func.clone(), entries)
    })
    .collect()
}

fn from_text_form(form: TextForm) -> Result<Bank, LoadError> {
  let mut funcs = Vec::with_capacity(form.len());
  for (func, entries) in form {
    let mut parsed = Vec::with_capacity(entries.len());
    for (literal, value) in entries {
      let key = parse_key(&literal)
        .map_err(|e| LoadError::Corrupt(format!("key literal under `{func}`: {e}")))?;
      if key.func() != func {
        return Err(LoadError::Corrupt(format!(
          "key literal names `{}` but sits under `{func}`",
          key.func()
        )));
      }
      parsed.push((key, value));
    }
    funcs.push((func, FuncCache::from_entries(parsed)));
  }
  Ok(Bank::from_parts(funcs))
}

/// Encodes a bank into one in-memory payload. Nothing touches the
/// filesystem here; the caller owns path handling and size limits.
pub(crate) fn encode(bank: &Bank, format: BankFormat, level: u32) -> Result<Vec<u8>, SaveError> {
  if format.compressed() && level > 9 {
    return Err(SaveError::Encode(format!(
      "compression level {level} out of range, expected 0 to 9"
    )));
  }

  match format {
    BankFormat::Bincode => bincode::serialize(bank).map_err(|e| SaveError::Encode(e.to_string())),
    BankFormat::Zlib => {
      let raw = bincode::serialize(bank).map_err(|e| SaveError::Encode(e.to_string()))?;
      let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
      encoder.write_all(&raw)?;
      Ok(encoder.finish()?)
    }
    BankFormat::Gzip => {
      let raw = bincode::serialize(bank).map_err(|e| SaveError::Encode(e.to_string()))?;
      let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
      encoder.write_all(&raw)?;
      Ok(encoder.finish()?)
    }
    BankFormat::Json => {
      serde_json::to_vec_pretty(&to_text_form(bank)).map_err(|e| SaveError::Encode(e.to_string()))
    }
    BankFormat::Yaml => serde_yaml::to_string(&to_text_form(bank))
      .map(String::into_bytes)
      .map_err(|e| SaveError::Encode(e.to_string())),
  }
}

/// Decodes a payload back into a bank.
pub(crate) fn decode(data: &[u8], format: BankFormat) -> Result<Bank, LoadError> {
  match format {
    BankFormat::Bincode => {
      bincode::deserialize(data).map_err(|e| LoadError::Corrupt(e.to_string()))
    }
    BankFormat::Zlib => {
      let mut raw = Vec::new();
      ZlibDecoder::new(data)
        .read_to_end(&mut raw)
        .map_err(|e| LoadError::Corrupt(e.to_string()))?;
      bincode::deserialize(&raw).map_err(|e| LoadError::Corrupt(e.to_string()))
    }
    BankFormat::Gzip => {
      let mut raw = Vec::new();
      GzDecoder::new(data)
        .read_to_end(&mut raw)
        .map_err(|e| LoadError::Corrupt(e.to_string()))?;
      bincode::deserialize(&raw).map_err(|e| LoadError::Corrupt(e.to_string()))
    }
    BankFormat::Json => {
      let form: TextForm =
        serde_json::from_slice(data).map_err(|e| LoadError::Corrupt(e.to_string()))?;
      from_text_form(form)
    }
    BankFormat::Yaml => {
      let form: TextForm =
        serde_yaml::from_slice(data).map_err(|e| LoadError::Corrupt(e.to_string()))?;
      from_text_form(form)
    }
  }
}
