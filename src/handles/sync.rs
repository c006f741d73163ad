use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{BankConfig, CacheBankBuilder};
use crate::error::{Error, LoadError, SaveError};
use crate::eviction;
use crate::handles::BankShared;
use crate::invoke::{Callable, Memoized};
use crate::key::{make_key, CallKey};
use crate::persist::{self, BankFormat, DEFAULT_COMPRESSION};
use crate::reporter::UsageReport;
use crate::store::Lookup;
use crate::value::Value;

/// A thread-safe, synchronous memoization cache.
///
/// Cloning the handle is cheap and every clone sees the same bank. Results
/// are keyed by function name plus canonicalized arguments, bounded by the
/// configured slot and memory limits, and survive restarts through
/// [`save`](CacheBank::save)/[`load`](CacheBank::load).
///
/// ```
/// use memobank::{CacheBank, Value};
///
/// let bank = CacheBank::new();
/// bank.set("square", &[Value::Int(3)], &[], Value::Int(9)).unwrap();
/// assert_eq!(
///   bank.get("square", &[Value::Int(3)], &[]).unwrap(),
///   Some(Value::Int(9))
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CacheBank {
  pub(crate) shared: Arc<BankShared>,
}

impl Default for CacheBank {
  fn default() -> Self {
    CacheBank::new()
  }
}

impl CacheBank {
  /// A bank with the default configuration.
  pub fn new() -> Self {
    CacheBank::from_config(BankConfig::default())
  }

  pub fn builder() -> CacheBankBuilder {
    CacheBankBuilder::new()
  }

  pub(crate) fn from_config(config: BankConfig) -> Self {
    CacheBank {
      shared: Arc::new(BankShared::with_config(config)),
    }
  }

  /// Converts this synchronous handle into an asynchronous one.
  /// This is a zero-cost conversion.
  #[cfg(feature = "tokio")]
  pub fn to_async(&self) -> crate::AsyncCacheBank {
    crate::AsyncCacheBank {
      shared: self.shared.clone(),
    }
  }

  // --- Lookups and stores ---

  /// Canonicalizes the call and looks it up. `Ok(None)` is a miss.
  pub fn get(
    &self,
    func: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
  ) -> Result<Option<Value>, Error> {
    let key = make_key(func, args, kwargs).map_err(|e| Error::Get(e.to_string()))?;
    Ok(self.get_key(&key))
  }

  /// Looks up an already-canonicalized key.
  ///
  /// A lookup against a function the bank has never seen is not counted as
  /// a miss; only a known function's absent entry is.
  pub fn get_key(&self, key: &CallKey) -> Option<Value> {
    let mut inner = self.shared.inner.lock();
    let policy = inner.config.policy;
    match inner.bank.lookup(key, policy) {
      Lookup::Hit(value) => {
        inner.reporter.record_hit(key.func());
        Some(value)
      }
      Lookup::Miss => {
        inner.reporter.record_miss(key.func());
        None
      }
      Lookup::UnknownFunc => None,
    }
  }

  /// Canonicalizes the call and stores its result.
  pub fn set(
    &self,
    func: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
    value: Value,
  ) -> Result<(), Error> {
    let key = make_key(func, args, kwargs).map_err(|e| Error::Set(e.to_string()))?;
    self.set_key(key, value);
    Ok(())
  }

  /// Stores a result under an already-canonicalized key, evicting as
  /// needed. Storing `Value::Null` is a no-op: null is the miss sentinel
  /// and can never be cached.
  pub fn set_key(&self, key: CallKey, value: Value) {
    if matches!(value, Value::Null) {
      tracing::debug!(func = %key.func(), "refusing to cache a null result");
      return;
    }

    let mut inner = self.shared.inner.lock();
    let func = key.func().to_string();

    if !inner.bank.contains(&func) {
      let max_bank_size = inner.config.max_bank_size;
      eviction::reserve_bank_slot(&mut inner.bank, max_bank_size);
      inner.reporter.add_func(&func);
    }
    if inner.bank.insert(key, value) {
      tracing::debug!(func = %func, "registered new function cache");
    }

    let max_total = inner.config.max_total_memory_size;
    eviction::enforce_total_memory(&mut inner.bank, max_total);
    let bound = inner.config.func_bound(&func);
    eviction::enforce_func_memory(&mut inner.bank, &func, bound);
  }

  /// Drops one function's entire cache. Returns whether it existed.
  pub fn remove(&self, func: &str) -> bool {
    let mut inner = self.shared.inner.lock();
    let removed = inner.bank.remove_func(func);
    if !removed {
      tracing::warn!(func = %func, "remove requested for a function the bank does not hold");
    }
    removed
  }

  /// Drops every cached entry and all usage counters.
  pub fn clear(&self) {
    let mut inner = self.shared.inner.lock();
    inner.bank.clear();
    inner.reporter.clear();
  }

  // --- Introspection ---

  /// Number of distinct functions currently cached.
  pub fn len(&self) -> usize {
    self.shared.inner.lock().bank.len()
  }

  pub fn is_empty(&self) -> bool {
    self.shared.inner.lock().bank.is_empty()
  }

  /// Whether every function slot is occupied, meaning the next new
  /// function will evict one.
  pub fn is_full(&self) -> bool {
    let inner = self.shared.inner.lock();
    inner.bank.len() >= inner.config.max_bank_size
  }

  pub fn contains(&self, func: &str) -> bool {
    self.shared.inner.lock().bank.contains(func)
  }

  pub fn func_names(&self) -> Vec<String> {
    self.shared.inner.lock().bank.func_names()
  }

  /// Estimated memory footprint of the whole bank, in bytes.
  pub fn estimated_size(&self) -> usize {
    self.shared.inner.lock().bank.footprint()
  }

  /// Estimated footprint of one function's cache, `None` when unknown.
  pub fn func_estimated_size(&self, func: &str) -> Option<usize> {
    self.shared.inner.lock().bank.func_footprint(func)
  }

  /// Point-in-time copy of the hit/miss counters.
  pub fn report(&self) -> UsageReport {
    self.shared.inner.lock().reporter.snapshot()
  }

  /// Copy of the current configuration.
  pub fn config(&self) -> BankConfig {
    self.shared.inner.lock().config.clone()
  }

  /// Canonicalizes a call the way `get`/`set` would.
  pub fn make_key(
    &self,
    func: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
  ) -> Result<CallKey, Error> {
    make_key(func, args, kwargs)
  }

  // --- Reconfiguration ---
  //
  // Setters validate eagerly and apply from the next write or load onward;
  // a tightened bound never retroactively evicts live entries.

  pub fn set_max_bank_size(&self, functions: usize) -> Result<(), Error> {
    self.update_config(|config| config.max_bank_size = functions)
  }

  pub fn set_max_total_memory_size(&self, bytes: usize) -> Result<(), Error> {
    self.update_config(|config| config.max_total_memory_size = bytes)
  }

  pub fn set_max_func_memory_size(&self, bytes: usize) -> Result<(), Error> {
    self.update_config(|config| config.max_func_memory_size = bytes)
  }

  /// Overrides the memory bound for one function.
  pub fn set_func_size_override(&self, func: impl Into<String>, bytes: usize) -> Result<(), Error> {
    let func = func.into();
    self.update_config(|config| {
      config.func_size_overrides.insert(func, bytes);
    })
  }

  pub fn set_policy(&self, policy: crate::RecencyPolicy) -> Result<(), Error> {
    self.update_config(|config| config.policy = policy)
  }

  pub fn set_format(&self, format: BankFormat) -> Result<(), Error> {
    self.update_config(|config| config.format = format)
  }

  pub fn set_path(&self, path: impl Into<PathBuf>) -> Result<(), Error> {
    let path = path.into();
    self.update_config(|config| config.path = path)
  }

  pub fn set_max_file_size(&self, bytes: usize) -> Result<(), Error> {
    self.update_config(|config| config.max_file_size = bytes)
  }

  /// Applies a loose JSON settings mapping, skipping unknown keys with a
  /// warning.
  pub fn apply_config(&self, map: &serde_json::Map<String, serde_json::Value>) -> Result<(), Error> {
    let mut inner = self.shared.inner.lock();
    let mut candidate = inner.config.clone();
    candidate.apply_map(map)?;
    inner.config = candidate;
    Ok(())
  }

  /// Parses a JSON object string and applies it like
  /// [`apply_config`](CacheBank::apply_config).
  pub fn apply_config_json(&self, text: &str) -> Result<(), Error> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| Error::Config {
      key: "<root>".into(),
      reason: e.to_string(),
    })?;
    let map = value.as_object().ok_or_else(|| Error::Config {
      key: "<root>".into(),
      reason: "top-level configuration must be a JSON object".into(),
    })?;
    self.apply_config(map)
  }

  /// Restores the default configuration and drops all cached state.
  pub fn reset_default(&self) {
    let mut inner = self.shared.inner.lock();
    inner.config = BankConfig::default();
    inner.bank.clear();
    inner.reporter.clear();
  }

  fn update_config(&self, mutate: impl FnOnce(&mut BankConfig)) -> Result<(), Error> {
    let mut inner = self.shared.inner.lock();
    let mut candidate = inner.config.clone();
    mutate(&mut candidate);
    candidate.validate()?;
    inner.config = candidate;
    Ok(())
  }

  // --- Memoization ---

  /// Wraps a callable so its results flow through this bank.
  pub fn memoize(&self, target: Arc<dyn Callable>) -> Memoized {
    Memoized::new(self.clone(), target)
  }

  /// Like [`memoize`](CacheBank::memoize), also pinning a memory bound for
  /// the callable's cache.
  pub fn memoize_with_bound(
    &self,
    target: Arc<dyn Callable>,
    bytes: usize,
  ) -> Result<Memoized, Error> {
    self.set_func_size_override(target.name().to_string(), bytes)?;
    Ok(self.memoize(target))
  }

  #[cfg(feature = "tokio")]
  pub fn memoize_async(&self, target: Arc<dyn crate::AsyncCallable>) -> crate::AsyncMemoized {
    crate::AsyncMemoized::new(self.to_async(), target)
  }

  // --- Persistence ---

  /// Saves the bank to the configured path with the default compression
  /// level. Returns the path actually written.
  pub fn save(&self) -> Result<PathBuf, Error> {
    let path = self.shared.inner.lock().config.path.clone();
    self.save_as(path, DEFAULT_COMPRESSION)
  }

  /// Saves the bank to an explicit path.
  ///
  /// A recognized suffix picks the format; otherwise the configured format
  /// applies and the suffix is rewritten to match, so the file can always
  /// be loaded back by inference. `level` only affects the compressed
  /// formats.
  pub fn save_as(&self, path: impl Into<PathBuf>, level: u32) -> Result<PathBuf, Error> {
    let requested: PathBuf = path.into();
    let inner = self.shared.inner.lock();

    let (target, format) = resolve_save_target(&requested, inner.config.format);
    let wrap = |source: SaveError| Error::Save {
      path: target.clone(),
      source,
    };

    if let Some(parent) = target.parent() {
      if !parent.as_os_str().is_empty() && !parent.is_dir() {
        return Err(wrap(SaveError::MissingParent(parent.to_path_buf())));
      }
    }
    if target.exists() {
      tracing::warn!(path = %target.display(), "overwriting existing cache file");
    } else {
      tracing::info!(path = %target.display(), format = %format, "creating cache file");
    }

    let payload = persist::encode(&inner.bank, format, level).map_err(wrap)?;
    if payload.len() > inner.config.max_file_size {
      return Err(wrap(SaveError::TooLarge {
        size: payload.len(),
        limit: inner.config.max_file_size,
      }));
    }
    fs::write(&target, &payload).map_err(|e| wrap(SaveError::Io(e)))?;

    tracing::info!(
      path = %target.display(),
      bytes = payload.len(),
      format = %format,
      "cache saved"
    );
    Ok(target)
  }

  /// Loads the bank from the configured path.
  pub fn load(&self) -> Result<(), Error> {
    let path = self.shared.inner.lock().config.path.clone();
    self.load_from(path)
  }

  /// Loads the bank from an explicit path, replacing the live contents.
  ///
  /// A recognized suffix picks the format; a suffix-less path falls back
  /// to the configured format with its suffix appended, matching what
  /// [`save_as`](CacheBank::save_as) would have written. An explicit
  /// foreign suffix is still refused. Decoding happens before anything is
  /// replaced, so a failed load leaves the live bank untouched. The
  /// restored bank is re-trimmed against every configured bound.
  pub fn load_from(&self, path: impl Into<PathBuf>) -> Result<(), Error> {
    let requested: PathBuf = path.into();
    let mut inner = self.shared.inner.lock();

    let (path, format) = match BankFormat::from_path(&requested) {
      Some(format) => (requested, format),
      None if requested.extension().is_none() => {
        let mut target = requested;
        target.set_extension(inner.config.format.suffix());
        (target, inner.config.format)
      }
      None => {
        return Err(Error::Load {
          path: requested.clone(),
          source: LoadError::UnknownFormat(requested.display().to_string()),
        })
      }
    };
    let wrap = |source: LoadError| Error::Load {
      path: path.clone(),
      source,
    };

    if !path.exists() {
      return Err(wrap(LoadError::NotFound(path.clone())));
    }

    // Gate on the on-disk size so an oversized file is never read in.
    let meta = fs::metadata(&path).map_err(|e| wrap(LoadError::Io(e)))?;
    if meta.len() > inner.config.max_file_size as u64 {
      return Err(wrap(LoadError::TooLarge {
        size: meta.len() as usize,
        limit: inner.config.max_file_size,
      }));
    }

    let payload = fs::read(&path).map_err(|e| wrap(LoadError::Io(e)))?;

    let mut bank = persist::decode(&payload, format).map_err(wrap)?;
    eviction::enforce_all(&mut bank, &inner.config);
    for func in bank.func_names() {
      inner.reporter.add_func(&func);
    }
    let funcs = bank.len();
    inner.bank = bank;

    tracing::info!(
      path = %path.display(),
      bytes = payload.len(),
      funcs,
      format = %format,
      "cache loaded"
    );
    Ok(())
  }
}

/// Picks the on-disk format and final path for a save. An unrecognized or
/// missing suffix is rewritten to the configured format's.
fn resolve_save_target(path: &Path, configured: BankFormat) -> (PathBuf, BankFormat) {
  match BankFormat::from_path(path) {
    Some(format) => (path.to_path_buf(), format),
    None => {
      let mut target = path.to_path_buf();
      if target.extension().is_some() {
        tracing::warn!(
          path = %path.display(),
          format = %configured,
          "rewriting unrecognized suffix to match the configured format"
        );
      }
      target.set_extension(configured.suffix());
      (target, configured)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unrecognized_suffix_is_rewritten() {
    let (path, format) = resolve_save_target(Path::new("bank.dat"), BankFormat::Gzip);
    assert_eq!(path, PathBuf::from("bank.gz"));
    assert_eq!(format, BankFormat::Gzip);
  }

  #[test]
  fn explicit_suffix_wins_over_configured_format() {
    let (path, format) = resolve_save_target(Path::new("bank.json"), BankFormat::Gzip);
    assert_eq!(path, PathBuf::from("bank.json"));
    assert_eq!(format, BankFormat::Json);
  }

  #[test]
  fn bare_stem_gets_the_configured_suffix() {
    let (path, format) = resolve_save_target(Path::new("bank"), BankFormat::Yaml);
    assert_eq!(path, PathBuf::from("bank.yaml"));
    assert_eq!(format, BankFormat::Yaml);
  }
}
