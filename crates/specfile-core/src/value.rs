//! Typed interpretation of header values.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

static INTEGER: OnceLock<Regex> = OnceLock::new();
static DECIMAL: OnceLock<Regex> = OnceLock::new();

fn integer_re() -> &'static Regex {
    INTEGER.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("Invalid integer pattern"))
}

fn decimal_re() -> &'static Regex {
    DECIMAL.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("Invalid decimal pattern")
    })
}

/// A header value after numeric interpretation.
///
/// Multi-item values become vectors only when every item has the same
/// numeric kind; `"4 apples"` or `"1 2.5"` stay text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    IntVec(Vec<i64>),
    FloatVec(Vec<f64>),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Int,
    Float,
}

fn kind_of(token: &str) -> Option<Kind> {
    if integer_re().is_match(token) && token.parse::<i64>().is_ok() {
        Some(Kind::Int)
    } else if decimal_re().is_match(token) {
        Some(Kind::Float)
    } else {
        None
    }
}

impl HeaderValue {
    /// Interpret a raw header value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        let kind = match tokens.first().and_then(|t| kind_of(t)) {
            Some(k) => k,
            None => return HeaderValue::Text(raw.to_string()),
        };
        if tokens.iter().any(|t| kind_of(t) != Some(kind)) {
            return HeaderValue::Text(raw.to_string());
        }

        // The regexes above guarantee these parses succeed.
        match (kind, tokens.len()) {
            (Kind::Int, 1) => HeaderValue::Int(tokens[0].parse().unwrap_or_default()),
            (Kind::Float, 1) => HeaderValue::Float(tokens[0].parse().unwrap_or(f64::NAN)),
            (Kind::Int, _) => {
                HeaderValue::IntVec(tokens.iter().map(|t| t.parse().unwrap_or_default()).collect())
            }
            (Kind::Float, _) => HeaderValue::FloatVec(
                tokens.iter().map(|t| t.parse().unwrap_or(f64::NAN)).collect(),
            ),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Scalar as float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric value as a float vector (scalars become one-element vectors).
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            HeaderValue::Int(v) => Some(vec![*v as f64]),
            HeaderValue::Float(v) => Some(vec![*v]),
            HeaderValue::IntVec(v) => Some(v.iter().map(|&x| x as f64).collect()),
            HeaderValue::FloatVec(v) => Some(v.clone()),
            HeaderValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, HeaderValue::Text(_))
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }
        match self {
            HeaderValue::Int(v) => write!(f, "{}", v),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::IntVec(v) => join(f, v),
            HeaderValue::FloatVec(v) => join(f, v),
            HeaderValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(raw: &str) -> Self {
        HeaderValue::parse(raw)
    }
}
