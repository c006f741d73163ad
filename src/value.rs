use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A dynamic, self-describing value stored by the cache.
///
/// Call arguments and memoized results both travel as `Value` trees, which is
/// what lets one store hold results of arbitrary shape and serialize them
/// uniformly across every persistence format.
///
/// `Null` doubles as the "no value" sentinel: a `Null` result is never
/// stored, so a hit can never observe it (see [`crate::CacheBank::set`]).
///
/// Floats compare and hash by bit pattern, which keeps `Value` usable as a
/// map key at the cost of `NaN` payloads being distinguishable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  /// A fixed, ordered sequence.
  List(Vec<Value>),
  /// Order-significant key/value pairs. Key normalization sorts these and
  /// flattens them into `List`s of two-element `List`s.
  Map(Vec<(Value, Value)>),
  /// Shared substructure. Equality, ordering and hashing see through the
  /// wrapper; the size estimator counts the allocation once.
  Shared(Arc<Value>),
}

impl Value {
  /// Follows `Shared` wrappers down to the underlying node.
  pub(crate) fn unshared(&self) -> &Value {
    let mut node = self;
    while let Value::Shared(inner) = node {
      node = inner;
    }
    node
  }

  /// Discriminant rank used to order values of different shapes.
  fn rank(&self) -> u8 {
    match self {
      Value::Null => 0,
      Value::Bool(_) => 1,
      Value::Int(_) => 2,
      Value::Float(_) => 3,
      Value::Str(_) => 4,
      Value::List(_) => 5,
      Value::Map(_) => 6,
      Value::Shared(inner) => inner.rank(),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self.unshared(), other.unshared()) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::List(a), Value::List(b)) => a == b,
      (Value::Map(a), Value::Map(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Value {}

impl Hash for Value {
  fn hash<H: Hasher>(&self, state: &mut H) {
    match self {
      // Hash through the wrapper so `Shared(x)` and `x` collide.
      Value::Shared(inner) => inner.hash(state),
      Value::Null => state.write_u8(0),
      Value::Bool(b) => {
        state.write_u8(1);
        b.hash(state);
      }
      Value::Int(i) => {
        state.write_u8(2);
        i.hash(state);
      }
      Value::Float(f) => {
        state.write_u8(3);
        f.to_bits().hash(state);
      }
      Value::Str(s) => {
        state.write_u8(4);
        s.hash(state);
      }
      Value::List(items) => {
        state.write_u8(5);
        items.hash(state);
      }
      Value::Map(pairs) => {
        state.write_u8(6);
        pairs.hash(state);
      }
    }
  }
}

impl PartialOrd for Value {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Total order over values: shape rank first, then contents. Used to sort
/// map pairs and keyword arguments during key normalization.
impl Ord for Value {
  fn cmp(&self, other: &Self) -> Ordering {
    let (a, b) = (self.unshared(), other.unshared());
    match (a, b) {
      (Value::Null, Value::Null) => Ordering::Equal,
      (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
      (Value::Int(x), Value::Int(y)) => x.cmp(y),
      (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
      (Value::Str(x), Value::Str(y)) => x.cmp(y),
      (Value::List(x), Value::List(y)) => x.cmp(y),
      (Value::Map(x), Value::Map(y)) => x.cmp(y),
      _ => a.rank().cmp(&b.rank()),
    }
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self {
    Value::Int(v)
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::Str(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::Str(v)
  }
}

impl From<Vec<Value>> for Value {
  fn from(v: Vec<Value>) -> Self {
    Value::List(v)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::hash_map::DefaultHasher;

  fn hash_of(v: &Value) -> u64 {
    let mut h = DefaultHasher::new();
    v.hash(&mut h);
    h.finish()
  }

  #[test]
  fn shared_is_transparent() {
    let plain = Value::List(vec![Value::Int(1), Value::Str("x".into())]);
    let shared = Value::Shared(Arc::new(plain.clone()));

    assert_eq!(plain, shared);
    assert_eq!(hash_of(&plain), hash_of(&shared));
    assert_eq!(plain.cmp(&shared), Ordering::Equal);
  }

  #[test]
  fn floats_compare_by_bits() {
    assert_eq!(Value::Float(1.5), Value::Float(1.5));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
  }

  #[test]
  fn cross_shape_order_is_stable() {
    let mut values = vec![
      Value::Str("a".into()),
      Value::Null,
      Value::Int(3),
      Value::Bool(true),
    ];
    values.sort();
    assert_eq!(
      values,
      vec![
        Value::Null,
        Value::Bool(true),
        Value::Int(3),
        Value::Str("a".into()),
      ]
    );
  }
}
