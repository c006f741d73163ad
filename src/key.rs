use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::Value;

/// Canonical, hashable identifier for one memoized invocation.
///
/// A key is a variable-arity tuple of the function name, the normalized
/// positional arguments, and the normalized keyword arguments. Components
/// that are absent are *omitted* rather than padded: a call with only
/// positional arguments carries no kwargs component at all, so its literal
/// rendering is a two-element tuple.
///
/// Normalization guarantees that identical logical calls always produce
/// equal keys. Two distinct `Map` arguments that sort to the same pair
/// sequence collide; that risk is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
  func: String,
  args: Option<Vec<Value>>,
  kwargs: Option<Vec<(String, Value)>>,
}

impl CallKey {
  /// Assembles a key from already-normalized parts, applying the omission
  /// rule: empty args/kwargs vanish from the key entirely.
  pub(crate) fn from_parts(
    func: String,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
  ) -> CallKey {
    CallKey {
      func,
      args: if args.is_empty() { None } else { Some(args) },
      kwargs: if kwargs.is_empty() { None } else { Some(kwargs) },
    }
  }

  /// The function name this key belongs to.
  pub fn func(&self) -> &str {
    &self.func
  }

  pub fn args(&self) -> Option<&[Value]> {
    self.args.as_deref()
  }

  pub fn kwargs(&self) -> Option<&[(String, Value)]> {
    self.kwargs.as_deref()
  }
}

/// Canonicalizes a call into a [`CallKey`].
///
/// `func` is the resolved function name (see [`crate::Callable::name`]).
/// Positional arguments are normalized element-wise: `Map`s become sorted
/// sequences of `[key, value]` pairs, `Shared` wrappers are flattened, and
/// normalization recurses so nested maps cannot leak unsorted pair order
/// into the key. Keyword arguments are sorted by name.
///
/// Pure and deterministic. Fails with [`Error::MakeHashable`] when the name
/// is empty or the keyword arguments carry a duplicate name.
pub fn make_key(
  func: &str,
  args: &[Value],
  kwargs: &[(String, Value)],
) -> Result<CallKey, Error> {
  if func.trim().is_empty() {
    let err = Error::MakeHashable("function identity does not resolve to a name".into());
    tracing::error!(error = %err, "key canonicalization failed");
    return Err(err);
  }

  let norm_args: Vec<Value> = args.iter().map(normalize).collect();

  let mut norm_kwargs: Vec<(String, Value)> = kwargs
    .iter()
    .map(|(name, v)| (name.clone(), normalize(v)))
    .collect();
  norm_kwargs.sort_by(|a, b| a.0.cmp(&b.0));
  for pair in norm_kwargs.windows(2) {
    if pair[0].0 == pair[1].0 {
      let err = Error::MakeHashable(format!("duplicate keyword argument `{}`", pair[0].0));
      tracing::error!(error = %err, "key canonicalization failed");
      return Err(err);
    }
  }

  Ok(CallKey::from_parts(func.to_string(), norm_args, norm_kwargs))
}

/// Rewrites a value into its canonical key form: maps become sorted pair
/// sequences, shared wrappers are copied out, everything else is kept as-is.
fn normalize(v: &Value) -> Value {
  match v {
    Value::Map(pairs) => {
      let mut normalized: Vec<(Value, Value)> = pairs
        .iter()
        .map(|(k, val)| (normalize(k), normalize(val)))
        .collect();
      normalized.sort_by(|a, b| a.0.cmp(&b.0));
      Value::List(
        normalized
          .into_iter()
          .map(|(k, val)| Value::List(vec![k, val]))
          .collect(),
      )
    }
    Value::List(items) => Value::List(items.iter().map(normalize).collect()),
    Value::Shared(inner) => normalize(inner),
    scalar => scalar.clone(),
  }
}
