//! Canonical literal text form for call keys.
//!
//! The structured-text formats cannot carry composite map keys, so every
//! [`CallKey`] is rendered into one canonical tuple literal, e.g.
//! `("square", (3,))`, and re-parsed on load with a small recursive-descent
//! parser. The parser accepts exactly the literals the renderer emits
//! (tuples, strings, numbers, `true`/`false`/`null`, `inf`/`NaN`) and is not
//! a general evaluator.
//!
//! Fidelity limit, kept for compatibility with existing dumps: the omission
//! rule makes a kwargs-only key a two-element tuple, which re-parses as an
//! args key. Only calls that use positional arguments (or none) round-trip
//! exactly through the text formats.

use std::fmt::Write as _;

use thiserror::Error;

use crate::key::CallKey;
use crate::value::Value;

/// A literal failed to parse back into a call key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad key literal at offset {pos}: {msg}")]
pub struct LiteralError {
  pub pos: usize,
  pub msg: String,
}

// --- Rendering ---

/// Renders a key into its canonical literal form.
pub fn render_key(key: &CallKey) -> String {
  let mut out = String::new();
  out.push('(');
  render_str(&mut out, key.func());
  match (key.args(), key.kwargs()) {
    (None, None) => out.push(','),
    (Some(args), None) => {
      out.push_str(", ");
      render_tuple(&mut out, args);
    }
    (None, Some(kwargs)) => {
      out.push_str(", ");
      render_kwargs(&mut out, kwargs);
    }
    (Some(args), Some(kwargs)) => {
      out.push_str(", ");
      render_tuple(&mut out, args);
      out.push_str(", ");
      render_kwargs(&mut out, kwargs);
    }
  }
  out.push(')');
  out
}

fn render_tuple(out: &mut String, items: &[Value]) {
  out.push('(');
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      out.push_str(", ");
    }
    render_value(out, item);
  }
  // Single-element tuples keep a trailing comma so the arity survives.
  if items.len() == 1 {
    out.push(',');
  }
  out.push(')');
}

fn render_kwargs(out: &mut String, kwargs: &[(String, Value)]) {
  out.push('(');
  for (i, (name, v)) in kwargs.iter().enumerate() {
    if i > 0 {
      out.push_str(", ");
    }
    out.push('(');
    render_str(out, name);
    out.push_str(", ");
    render_value(out, v);
    out.push(')');
  }
  if kwargs.len() == 1 {
    out.push(',');
  }
  out.push(')');
}

fn render_value(out: &mut String, v: &Value) {
  match v {
    Value::Null => out.push_str("null"),
    Value::Bool(true) => out.push_str("true"),
    Value::Bool(false) => out.push_str("false"),
    Value::Int(i) => {
      let _ = write!(out, "{i}");
    }
    Value::Float(f) => {
      // `{:?}` prints the shortest representation that round-trips, and
      // always marks floats with a `.`, exponent, `inf` or `NaN`.
      let _ = write!(out, "{f:?}");
    }
    Value::Str(s) => render_str(out, s),
    Value::List(items) => render_tuple(out, items),
    // Normalization keeps maps and shared nodes out of keys; render them
    // through their key form anyway so rendering is total.
    Value::Map(pairs) => {
      let items: Vec<Value> = pairs
        .iter()
        .map(|(k, val)| Value::List(vec![k.clone(), val.clone()]))
        .collect();
      render_tuple(out, &items);
    }
    Value::Shared(inner) => render_value(out, inner),
  }
}

fn render_str(out: &mut String, s: &str) {
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      c if c.is_control() => {
        let _ = write!(out, "\\u{{{:x}}}", c as u32);
      }
      c => out.push(c),
    }
  }
  out.push('"');
}

// --- Parsing ---

/// Parses a canonical key literal back into a [`CallKey`], reconstructing
/// the variable arity under the same omission rule that built it.
pub fn parse_key(input: &str) -> Result<CallKey, LiteralError> {
  let mut parser = Parser::new(input);
  parser.skip_ws();
  let value = parser.parse_value()?;
  parser.skip_ws();
  if !parser.at_end() {
    return Err(parser.error("trailing characters after key literal"));
  }

  let parts = match value {
    Value::List(parts) => parts,
    _ => {
      return Err(LiteralError {
        pos: 0,
        msg: "key literal must be a tuple".into(),
      })
    }
  };
  if parts.is_empty() || parts.len() > 3 {
    return Err(LiteralError {
      pos: 0,
      msg: format!("key tuple has arity {}, expected 1 to 3", parts.len()),
    });
  }

  let mut parts = parts.into_iter();
  let func = match parts.next() {
    Some(Value::Str(name)) => name,
    _ => {
      return Err(LiteralError {
        pos: 0,
        msg: "first key element must be the function name".into(),
      })
    }
  };

  let args = match parts.next() {
    None => Vec::new(),
    Some(Value::List(items)) => items,
    // A scalar second element is treated as a single positional argument.
    Some(other) => vec![other],
  };

  let kwargs = match parts.next() {
    None => Vec::new(),
    Some(Value::List(pairs)) => parse_kwarg_pairs(pairs)?,
    Some(_) => {
      return Err(LiteralError {
        pos: 0,
        msg: "third key element must be a tuple of name/value pairs".into(),
      })
    }
  };

  Ok(CallKey::from_parts(func, args, kwargs))
}

fn parse_kwarg_pairs(pairs: Vec<Value>) -> Result<Vec<(String, Value)>, LiteralError> {
  let mut out = Vec::with_capacity(pairs.len());
  for pair in pairs {
    match pair {
      Value::List(mut kv) if kv.len() == 2 => {
        let v = kv.pop().unwrap_or(Value::Null);
        match kv.pop() {
          Some(Value::Str(name)) => out.push((name, v)),
          _ => {
            return Err(LiteralError {
              pos: 0,
              msg: "keyword pair name must be a string".into(),
            })
          }
        }
      }
      _ => {
        return Err(LiteralError {
          pos: 0,
          msg: "keyword component must contain two-element pairs".into(),
        })
      }
    }
  }
  Ok(out)
}

struct Parser<'a> {
  chars: Vec<char>,
  pos: usize,
  _input: &'a str,
}

impl<'a> Parser<'a> {
  fn new(input: &'a str) -> Self {
    Parser {
      chars: input.chars().collect(),
      pos: 0,
      _input: input,
    }
  }

  fn error(&self, msg: impl Into<String>) -> LiteralError {
    LiteralError {
      pos: self.pos,
      msg: msg.into(),
    }
  }

  fn at_end(&self) -> bool {
    self.pos >= self.chars.len()
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek();
    if c.is_some() {
      self.pos += 1;
    }
    c
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_whitespace()) {
      self.pos += 1;
    }
  }

  fn parse_value(&mut self) -> Result<Value, LiteralError> {
    self.skip_ws();
    match self.peek() {
      Some('(') => self.parse_tuple(),
      Some('"') => self.parse_string().map(Value::Str),
      Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_number(),
      Some(c) if c.is_alphabetic() => self.parse_ident(),
      Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
      None => Err(self.error("unexpected end of literal")),
    }
  }

  fn parse_tuple(&mut self) -> Result<Value, LiteralError> {
    self.bump(); // consume '('
    let mut items = Vec::new();
    loop {
      self.skip_ws();
      match self.peek() {
        Some(')') => {
          self.bump();
          return Ok(Value::List(items));
        }
        None => return Err(self.error("unterminated tuple")),
        _ => {}
      }
      items.push(self.parse_value()?);
      self.skip_ws();
      match self.peek() {
        Some(',') => {
          self.bump();
        }
        Some(')') => {
          self.bump();
          return Ok(Value::List(items));
        }
        _ => return Err(self.error("expected `,` or `)` in tuple")),
      }
    }
  }

  fn parse_string(&mut self) -> Result<String, LiteralError> {
    self.bump(); // consume '"'
    let mut out = String::new();
    loop {
      match self.bump() {
        Some('"') => return Ok(out),
        Some('\\') => match self.bump() {
          Some('"') => out.push('"'),
          Some('\\') => out.push('\\'),
          Some('n') => out.push('\n'),
          Some('t') => out.push('\t'),
          Some('r') => out.push('\r'),
          Some('u') => out.push(self.parse_unicode_escape()?),
          Some(c) => return Err(self.error(format!("unknown escape `\\{c}`"))),
          None => return Err(self.error("unterminated escape")),
        },
        Some(c) => out.push(c),
        None => return Err(self.error("unterminated string")),
      }
    }
  }

  fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
    if self.bump() != Some('{') {
      return Err(self.error("expected `{` after `\\u`"));
    }
    let mut hex = String::new();
    loop {
      match self.bump() {
        Some('}') => break,
        Some(c) if c.is_ascii_hexdigit() => hex.push(c),
        _ => return Err(self.error("malformed unicode escape")),
      }
    }
    u32::from_str_radix(&hex, 16)
      .ok()
      .and_then(char::from_u32)
      .ok_or_else(|| self.error("invalid unicode scalar"))
  }

  fn parse_number(&mut self) -> Result<Value, LiteralError> {
    let start = self.pos;
    if matches!(self.peek(), Some('-') | Some('+')) {
      self.bump();
    }
    // `-inf` arrives through the numeric path.
    if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
      let word = self.take_word();
      let text: String = self.chars[start..self.pos].iter().collect();
      return match word.as_str() {
        "inf" => Ok(Value::Float(if text.starts_with('-') {
          f64::NEG_INFINITY
        } else {
          f64::INFINITY
        })),
        _ => Err(self.error(format!("unknown literal `{text}`"))),
      };
    }

    let mut is_float = false;
    while let Some(c) = self.peek() {
      match c {
        '0'..='9' => {
          self.bump();
        }
        '.' | 'e' | 'E' => {
          is_float = true;
          self.bump();
          if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
          }
        }
        _ => break,
      }
    }
    let text: String = self.chars[start..self.pos].iter().collect();
    if is_float {
      text
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| self.error(format!("bad float literal `{text}`")))
    } else {
      text
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| self.error(format!("bad integer literal `{text}`")))
    }
  }

  fn take_word(&mut self) -> String {
    let mut word = String::new();
    while let Some(c) = self.peek() {
      if !c.is_alphanumeric() {
        break;
      }
      word.push(c);
      self.pos += 1;
    }
    word
  }

  fn parse_ident(&mut self) -> Result<Value, LiteralError> {
    let word = self.take_word();
    match word.as_str() {
      "null" => Ok(Value::Null),
      "true" => Ok(Value::Bool(true)),
      "false" => Ok(Value::Bool(false)),
      "inf" => Ok(Value::Float(f64::INFINITY)),
      "NaN" => Ok(Value::Float(f64::NAN)),
      other => Err(self.error(format!("unknown literal `{other}`"))),
    }
  }
}
