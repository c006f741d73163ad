//! The invocation adapter: wrapping callables so their results memoize.
//!
//! A [`Callable`] is any named operation over [`Value`] arguments. Wrapping
//! one through [`crate::CacheBank::memoize`] yields a [`Memoized`] handle
//! whose `call` consults the bank before invoking the target, and stores
//! the result afterwards. A `Value::Null` result is passed through but
//! never stored, so a null-returning call is recomputed every time.

use std::sync::Arc;

use crate::error::Error;
use crate::value::Value;

#[cfg(feature = "tokio")]
use std::future::Future;
#[cfg(feature = "tokio")]
use std::pin::Pin;

/// A named, invokable operation. The name doubles as the cache key's
/// function component, so two callables sharing a name share cache entries.
pub trait Callable: Send + Sync {
  fn name(&self) -> &str;

  fn invoke(&self, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, Error>;
}

type CallableFn = dyn Fn(&[Value], &[(String, Value)]) -> Result<Value, Error> + Send + Sync;

/// Adapts a plain closure into a [`Callable`].
///
/// ```
/// use memobank::{FnCallable, Value};
///
/// let square = FnCallable::new("square", |args, _kwargs| {
///   match args {
///     [Value::Int(n)] => Ok(Value::Int(n * n)),
///     _ => Ok(Value::Null),
///   }
/// });
/// ```
pub struct FnCallable {
  name: String,
  f: Box<CallableFn>,
}

impl FnCallable {
  pub fn new<F>(name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&[Value], &[(String, Value)]) -> Result<Value, Error> + Send + Sync + 'static,
  {
    FnCallable {
      name: name.into(),
      f: Box::new(f),
    }
  }
}

impl Callable for FnCallable {
  fn name(&self) -> &str {
    &self.name
  }

  fn invoke(&self, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, Error> {
    (self.f)(args, kwargs)
  }
}

/// A callable with leading positional arguments bound in advance.
///
/// Keeps the inner callable's name, so partial and direct invocations of
/// the same underlying function land in one function cache. The bound
/// arguments are prepended at invoke time only and never enter the cache
/// key: a memoized partial keys by the arguments visible at the call site.
pub struct PartialCallable {
  inner: Arc<dyn Callable>,
  bound: Vec<Value>,
}

impl PartialCallable {
  pub fn new(inner: Arc<dyn Callable>, bound: Vec<Value>) -> Self {
    PartialCallable { inner, bound }
  }
}

impl Callable for PartialCallable {
  fn name(&self) -> &str {
    self.inner.name()
  }

  fn invoke(&self, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, Error> {
    let mut full = Vec::with_capacity(self.bound.len() + args.len());
    full.extend_from_slice(&self.bound);
    full.extend_from_slice(args);
    self.inner.invoke(&full, kwargs)
  }
}

/// A callable wired through a cache bank.
pub struct Memoized {
  bank: crate::CacheBank,
  target: Arc<dyn Callable>,
}

impl Memoized {
  pub(crate) fn new(bank: crate::CacheBank, target: Arc<dyn Callable>) -> Self {
    Memoized { bank, target }
  }

  pub fn name(&self) -> &str {
    self.target.name()
  }

  /// Cache-first invocation. The target only runs on a miss; its result is
  /// stored unless it is `Value::Null`.
  pub fn call(&self, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, Error> {
    let key = crate::key::make_key(self.target.name(), args, kwargs)?;
    if let Some(value) = self.bank.get_key(&key) {
      return Ok(value);
    }
    let value = self.target.invoke(args, kwargs)?;
    if !matches!(value, Value::Null) {
      self.bank.set_key(key, value.clone());
    }
    Ok(value)
  }
}

/// Async counterpart of [`Callable`].
#[cfg(feature = "tokio")]
pub trait AsyncCallable: Send + Sync {
  fn name(&self) -> &str;

  fn invoke<'a>(
    &'a self,
    args: &'a [Value],
    kwargs: &'a [(String, Value)],
  ) -> Pin<Box<dyn Future<Output = Result<Value, Error>> + Send + 'a>>;
}

#[cfg(feature = "tokio")]
type AsyncCallableFn = dyn for<'a> Fn(
    &'a [Value],
    &'a [(String, Value)],
  ) -> Pin<Box<dyn Future<Output = Result<Value, Error>> + Send + 'a>>
  + Send
  + Sync;

/// Adapts an async closure into an [`AsyncCallable`]. The closure returns a
/// boxed future; async blocks box cleanly through `Box::pin`.
#[cfg(feature = "tokio")]
pub struct AsyncFnCallable {
  name: String,
  f: Box<AsyncCallableFn>,
}

#[cfg(feature = "tokio")]
impl AsyncFnCallable {
  pub fn new<F>(name: impl Into<String>, f: F) -> Self
  where
    F: for<'a> Fn(
        &'a [Value],
        &'a [(String, Value)],
      ) -> Pin<Box<dyn Future<Output = Result<Value, Error>> + Send + 'a>>
      + Send
      + Sync
      + 'static,
  {
    AsyncFnCallable {
      name: name.into(),
      f: Box::new(f),
    }
  }
}

#[cfg(feature = "tokio")]
impl AsyncCallable for AsyncFnCallable {
  fn name(&self) -> &str {
    &self.name
  }

  fn invoke<'a>(
    &'a self,
    args: &'a [Value],
    kwargs: &'a [(String, Value)],
  ) -> Pin<Box<dyn Future<Output = Result<Value, Error>> + Send + 'a>> {
    (self.f)(args, kwargs)
  }
}

/// Async callable wired through a cache bank. Lookups and stores are quick
/// lock-bound operations; only the target's own future awaits.
#[cfg(feature = "tokio")]
pub struct AsyncMemoized {
  bank: crate::AsyncCacheBank,
  target: Arc<dyn AsyncCallable>,
}

#[cfg(feature = "tokio")]
impl AsyncMemoized {
  pub(crate) fn new(bank: crate::AsyncCacheBank, target: Arc<dyn AsyncCallable>) -> Self {
    AsyncMemoized { bank, target }
  }

  pub fn name(&self) -> &str {
    self.target.name()
  }

  pub async fn call(&self, args: &[Value], kwargs: &[(String, Value)]) -> Result<Value, Error> {
    let key = crate::key::make_key(self.target.name(), args, kwargs)?;
    if let Some(value) = self.bank.get_key(&key) {
      return Ok(value);
    }
    let value = self.target.invoke(args, kwargs).await?;
    if !matches!(value, Value::Null) {
      self.bank.set_key(key, value.clone());
    }
    Ok(value)
  }
}
