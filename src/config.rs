//! Configuration, validation, and the builder.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::handles::sync::CacheBank;
use crate::persist::BankFormat;
use crate::policy::RecencyPolicy;

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// A per-function bound below this would evict almost every insert.
const MIN_FUNC_MEMORY: usize = 128;

/// File stem used when no explicit cache path is configured. The suffix
/// always follows the configured format.
const DEFAULT_STEM: &str = "memobank_cache";

/// Complete tuning surface of a cache bank.
///
/// Held behind the bank lock at runtime; mutating setters on the handle
/// validate eagerly and never retroactively evict (thresholds apply from
/// the next write or load onward).
#[derive(Debug, Clone)]
pub struct BankConfig {
  /// Maximum number of distinct functions the bank holds.
  pub max_bank_size: usize,
  /// Estimated-byte ceiling for the whole bank.
  pub max_total_memory_size: usize,
  /// Default estimated-byte ceiling for one function's cache.
  pub max_func_memory_size: usize,
  /// Per-function overrides of `max_func_memory_size`.
  pub func_size_overrides: HashMap<String, usize>,
  pub policy: RecencyPolicy,
  /// On-disk format used by `save`/`load` when the path does not pick one.
  pub format: BankFormat,
  /// Default persistence path.
  pub path: PathBuf,
  /// Largest encoded payload `save` will write and `load` will read.
  pub max_file_size: usize,
}

impl Default for BankConfig {
  fn default() -> Self {
    let format = BankFormat::Gzip;
    BankConfig {
      max_bank_size: 100,
      max_total_memory_size: 10 * MIB,
      max_func_memory_size: 16 * KIB,
      func_size_overrides: HashMap::new(),
      policy: RecencyPolicy::default(),
      format,
      path: PathBuf::from(format!("{DEFAULT_STEM}.{}", format.suffix())),
      max_file_size: 10 * MIB,
    }
  }
}

impl BankConfig {
  /// The effective memory bound for one function's cache.
  pub(crate) fn func_bound(&self, func: &str) -> usize {
    self
      .func_size_overrides
      .get(func)
      .copied()
      .unwrap_or(self.max_func_memory_size)
  }

  /// Rejects configurations that could never hold a single entry.
  pub(crate) fn validate(&self) -> Result<(), Error> {
    if self.max_bank_size == 0 {
      return Err(Error::Construction("max_bank_size must be at least 1".into()));
    }
    if self.max_total_memory_size == 0 {
      return Err(Error::Construction(
        "max_total_memory_size must be non-zero".into(),
      ));
    }
    if self.max_func_memory_size <= MIN_FUNC_MEMORY {
      return Err(Error::Construction(format!(
        "max_func_memory_size must exceed {MIN_FUNC_MEMORY} bytes"
      )));
    }
    if self.max_func_memory_size > self.max_total_memory_size {
      return Err(Error::Construction(
        "max_func_memory_size cannot exceed max_total_memory_size".into(),
      ));
    }
    for (func, bound) in &self.func_size_overrides {
      if *bound <= MIN_FUNC_MEMORY {
        return Err(Error::Construction(format!(
          "size override for `{func}` must exceed {MIN_FUNC_MEMORY} bytes"
        )));
      }
    }
    if self.max_file_size == 0 {
      return Err(Error::Construction("max_file_size must be non-zero".into()));
    }
    Ok(())
  }

  /// Applies a loose JSON mapping of settings onto this configuration.
  ///
  /// Known keys with well-formed values are applied; unknown keys are
  /// skipped with a warning so configurations shared with other tools do
  /// not fail. A known key with a malformed value is an error and leaves
  /// the configuration partially applied only up to that key.
  pub fn apply_map(&mut self, map: &serde_json::Map<String, serde_json::Value>) -> Result<(), Error> {
    for (key, value) in map {
      if !self.apply_entry(key, value)? {
        tracing::warn!(key = %key, "ignoring unknown configuration key");
      }
    }
    self.validate()
  }

  fn apply_entry(&mut self, key: &str, value: &serde_json::Value) -> Result<bool, Error> {
    fn size_of(key: &str, value: &serde_json::Value) -> Result<usize, Error> {
      value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| Error::Config {
          key: key.to_string(),
          reason: format!("expected a non-negative integer, got {value}"),
        })
    }
    fn str_of<'v>(key: &str, value: &'v serde_json::Value) -> Result<&'v str, Error> {
      value.as_str().ok_or_else(|| Error::Config {
        key: key.to_string(),
        reason: format!("expected a string, got {value}"),
      })
    }

    match key {
      "max_bank_size" => self.max_bank_size = size_of(key, value)?,
      "max_total_memory_size" => self.max_total_memory_size = size_of(key, value)?,
      "max_func_memory_size" => self.max_func_memory_size = size_of(key, value)?,
      "max_file_size" => self.max_file_size = size_of(key, value)?,
      "policy" => {
        self.policy = RecencyPolicy::from_str(str_of(key, value)?).map_err(|reason| {
          Error::Config {
            key: key.to_string(),
            reason,
          }
        })?;
      }
      "format" => {
        self.format = BankFormat::from_suffix(str_of(key, value)?).ok_or_else(|| Error::Config {
          key: key.to_string(),
          reason: format!("unknown format {value}"),
        })?;
      }
      "path" => self.path = PathBuf::from(str_of(key, value)?),
      "func_size_overrides" => {
        let object = value.as_object().ok_or_else(|| Error::Config {
          key: key.to_string(),
          reason: "expected an object of function name to byte bound".into(),
        })?;
        for (func, bound) in object {
          let bound = size_of(key, bound)?;
          self.func_size_overrides.insert(func.clone(), bound);
        }
      }
      _ => return Ok(false),
    }
    Ok(true)
  }

  /// Builds a configuration from a JSON object string, starting from
  /// defaults.
  pub fn from_json(text: &str) -> Result<BankConfig, Error> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| Error::Config {
      key: "<root>".into(),
      reason: e.to_string(),
    })?;
    let map = value.as_object().ok_or_else(|| Error::Config {
      key: "<root>".into(),
      reason: "top-level configuration must be a JSON object".into(),
    })?;
    let mut config = BankConfig::default();
    config.apply_map(map)?;
    Ok(config)
  }
}

/// Fluent constructor for [`CacheBank`].
///
/// ```
/// use memobank::{CacheBankBuilder, RecencyPolicy};
///
/// let bank = CacheBankBuilder::new()
///   .max_bank_size(32)
///   .recency_policy(RecencyPolicy::Fifo)
///   .build()
///   .unwrap();
/// assert!(bank.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct CacheBankBuilder {
  config: BankConfig,
}

impl CacheBankBuilder {
  pub fn new() -> Self {
    CacheBankBuilder::default()
  }

  pub fn max_bank_size(mut self, functions: usize) -> Self {
    self.config.max_bank_size = functions;
    self
  }

  pub fn max_total_memory_size(mut self, bytes: usize) -> Self {
    self.config.max_total_memory_size = bytes;
    self
  }

  pub fn max_func_memory_size(mut self, bytes: usize) -> Self {
    self.config.max_func_memory_size = bytes;
    self
  }

  pub fn func_size_override(mut self, func: impl Into<String>, bytes: usize) -> Self {
    self.config.func_size_overrides.insert(func.into(), bytes);
    self
  }

  pub fn recency_policy(mut self, policy: RecencyPolicy) -> Self {
    self.config.policy = policy;
    self
  }

  pub fn format(mut self, format: BankFormat) -> Self {
    self.config.format = format;
    self
  }

  pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
    self.config.path = path.into();
    self
  }

  pub fn max_file_size(mut self, bytes: usize) -> Self {
    self.config.max_file_size = bytes;
    self
  }

  /// Seeds the builder from a JSON object string. Later chained setters
  /// still win.
  pub fn from_json(text: &str) -> Result<Self, Error> {
    Ok(CacheBankBuilder {
      config: BankConfig::from_json(text)?,
    })
  }

  pub fn build(self) -> Result<CacheBank, Error> {
    self.config.validate()?;
    Ok(CacheBank::from_config(self.config))
  }
}
