use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the cache. One variant per subsystem; the original
/// failure travels in the source chain.
#[derive(Debug, Error)]
pub enum Error {
  /// The cache was given an invalid initial configuration.
  #[error("invalid configuration: {0}")]
  Construction(String),

  /// A lookup was attempted against a malformed call description.
  #[error("lookup failed: {0}")]
  Get(String),

  /// A store was attempted with a malformed call description or value.
  #[error("store failed: {0}")]
  Set(String),

  /// A call could not be canonicalized into a `CallKey`.
  #[error("cannot derive a call key: {0}")]
  MakeHashable(String),

  /// Persisting the bank to disk failed.
  #[error("save to {} failed: {source}", path.display())]
  Save {
    path: PathBuf,
    #[source]
    source: SaveError,
  },

  /// Restoring the bank from disk failed. The live bank is untouched.
  #[error("load from {} failed: {source}", path.display())]
  Load {
    path: PathBuf,
    #[source]
    source: LoadError,
  },

  /// A configuration mapping carried a value the setters reject.
  #[error("bad config value for `{key}`: {reason}")]
  Config { key: String, reason: String },
}

/// Failure modes of the encode-and-write half of persistence.
#[derive(Debug, Error)]
pub enum SaveError {
  /// The target file's parent directory does not exist.
  #[error("parent directory {} does not exist", .0.display())]
  MissingParent(PathBuf),

  /// The encoded buffer exceeded the configured maximum file size. Nothing
  /// was written.
  #[error("encoded payload is {size} bytes, over the {limit} byte file limit")]
  TooLarge { size: usize, limit: usize },

  /// Serialization or compression failed.
  #[error("encoding failed: {0}")]
  Encode(String),

  /// The background save worker failed before completing.
  #[error("background save worker failed: {0}")]
  Worker(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Failure modes of the read-and-decode half of persistence.
#[derive(Debug, Error)]
pub enum LoadError {
  /// The source file does not exist.
  #[error("file {} does not exist", .0.display())]
  NotFound(PathBuf),

  /// The file suffix does not name a known format.
  #[error("unrecognized suffix `{0}`; expected one of .bin, .zlib, .gz, .json, .yaml")]
  UnknownFormat(String),

  /// The file on disk exceeds the configured maximum file size.
  #[error("file is {size} bytes, over the {limit} byte file limit")]
  TooLarge { size: usize, limit: usize },

  /// The payload could not be decoded back into a bank.
  #[error("payload is corrupt: {0}")]
  Corrupt(String),

  /// The background load worker failed before completing.
  #[error("background load worker failed: {0}")]
  Worker(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
