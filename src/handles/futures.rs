use std::path::PathBuf;
use std::sync::Arc;

use crate::config::BankConfig;
use crate::error::{Error, LoadError, SaveError};
use crate::handles::BankShared;
use crate::invoke::{AsyncCallable, AsyncMemoized};
use crate::key::CallKey;
use crate::persist::DEFAULT_COMPRESSION;
use crate::reporter::UsageReport;
use crate::value::Value;
use crate::CacheBank;

/// A thread-safe, asynchronous memoization cache.
///
/// Shares its state with the [`CacheBank`] it was converted from. In-memory
/// operations are quick lock-bound calls and stay synchronous; only the
/// filesystem half of `save`/`load` moves to a blocking worker so the async
/// runtime is never stalled on I/O.
#[derive(Debug, Clone)]
pub struct AsyncCacheBank {
  pub(crate) shared: Arc<BankShared>,
}

impl AsyncCacheBank {
  /// Converts this asynchronous handle into a synchronous one.
  /// This is a zero-cost conversion.
  pub fn to_sync(&self) -> CacheBank {
    CacheBank {
      shared: self.shared.clone(),
    }
  }

  // --- Lock-bound operations, shared with the sync handle ---

  pub fn get(
    &self,
    func: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
  ) -> Result<Option<Value>, Error> {
    self.to_sync().get(func, args, kwargs)
  }

  pub fn get_key(&self, key: &CallKey) -> Option<Value> {
    self.to_sync().get_key(key)
  }

  pub fn set(
    &self,
    func: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
    value: Value,
  ) -> Result<(), Error> {
    self.to_sync().set(func, args, kwargs, value)
  }

  pub fn set_key(&self, key: CallKey, value: Value) {
    self.to_sync().set_key(key, value)
  }

  pub fn remove(&self, func: &str) -> bool {
    self.to_sync().remove(func)
  }

  pub fn clear(&self) {
    self.to_sync().clear()
  }

  pub fn len(&self) -> usize {
    self.to_sync().len()
  }

  pub fn is_empty(&self) -> bool {
    self.to_sync().is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.to_sync().is_full()
  }

  pub fn contains(&self, func: &str) -> bool {
    self.to_sync().contains(func)
  }

  pub fn func_names(&self) -> Vec<String> {
    self.to_sync().func_names()
  }

  pub fn estimated_size(&self) -> usize {
    self.to_sync().estimated_size()
  }

  pub fn report(&self) -> UsageReport {
    self.to_sync().report()
  }

  pub fn config(&self) -> BankConfig {
    self.to_sync().config()
  }

  /// Wraps an async callable so its results flow through this bank.
  pub fn memoize_async(&self, target: Arc<dyn AsyncCallable>) -> AsyncMemoized {
    AsyncMemoized::new(self.clone(), target)
  }

  // --- Persistence on a blocking worker ---

  /// Saves the bank to the configured path. See [`CacheBank::save`].
  pub async fn save(&self) -> Result<PathBuf, Error> {
    let path = self.config().path;
    self.save_as(path, DEFAULT_COMPRESSION).await
  }

  /// Saves the bank to an explicit path. See [`CacheBank::save_as`].
  pub async fn save_as(&self, path: impl Into<PathBuf>, level: u32) -> Result<PathBuf, Error> {
    let sync = self.to_sync();
    let path: PathBuf = path.into();
    let worker_path = path.clone();
    tokio::task::spawn_blocking(move || sync.save_as(worker_path, level))
      .await
      .map_err(|e| Error::Save {
        path,
        source: SaveError::Worker(e.to_string()),
      })?
  }

  /// Loads the bank from the configured path. See [`CacheBank::load`].
  pub async fn load(&self) -> Result<(), Error> {
    let path = self.config().path;
    self.load_from(path).await
  }

  /// Loads the bank from an explicit path. See [`CacheBank::load_from`].
  pub async fn load_from(&self, path: impl Into<PathBuf>) -> Result<(), Error> {
    let sync = self.to_sync();
    let path: PathBuf = path.into();
    let worker_path = path.clone();
    tokio::task::spawn_blocking(move || sync.load_from(worker_path))
      .await
      .map_err(|e| Error::Load {
        path,
        source: LoadError::Worker(e.to_string()),
      })?
  }
}
