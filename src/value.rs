use std::{fmt::Display, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::expr::Literal;

/// The dynamic value domain: exactly four variants. Equality is derived, so
/// it compares variant first and content second; values of different
/// variants are never equal and never an error to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Absent,
    Boolean(bool),
    Number(f64),
    Text(Rc<str>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Truthiness: absent is false, a boolean is itself, everything else is
    /// true.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Absent => false,
            _ => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_ref()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Absent => write!(f, "nada"),
            Value::Boolean(true) => write!(f, "verdadero"),
            Value::Boolean(false) => write!(f, "falso"),
            // f64's Display is already shortest fixed-point decimal: no
            // exponents, no trailing zeros, integers without a fraction.
            Value::Number(n) => n.fmt(f),
            Value::Text(s) => write!(f, "\"{}\"", s.as_ref()),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Absent => Self::Absent,
            Literal::Boolean(b) => Self::Boolean(b),
            Literal::Number(n) => Self::Number(n),
            Literal::Text(s) => Self::Text(s),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Absent => Self::Absent,
            Literal::Boolean(b) => Self::Boolean(*b),
            Literal::Number(n) => Self::Number(*n),
            Literal::Text(s) => Self::Text(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_variant_then_content() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::Number(2.0));
        assert_eq!(Value::Text(Rc::from("a")), Value::Text(Rc::from("a")));
        assert_eq!(Value::Absent, Value::Absent);

        // Cross-variant comparisons are false, not errors.
        assert_ne!(Value::Number(0.0), Value::Boolean(false));
        assert_ne!(Value::Text(Rc::from("1")), Value::Number(1.0));
        assert_ne!(Value::Absent, Value::Boolean(false));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Absent.as_bool());
        assert!(!Value::Boolean(false).as_bool());
        assert!(Value::Boolean(true).as_bool());
        assert!(Value::Number(0.0).as_bool());
        assert!(Value::Text(Rc::from("")).as_bool());
    }

    #[test]
    fn numbers_render_without_trailing_zeros() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(1_000_002.5).to_string(), "1000002.5");
        assert_eq!(Value::Number(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn booleans_render_in_spanish() {
        assert_eq!(Value::Boolean(true).to_string(), "verdadero");
        assert_eq!(Value::Boolean(false).to_string(), "falso");
    }

    #[test]
    fn text_renders_quoted() {
        assert_eq!(Value::Text(Rc::from("hola")).to_string(), "\"hola\"");
    }

    #[test]
    fn number_literal_round_trips_through_display() {
        let literal = Literal::Number(2.5);
        let value = Value::from(&literal);
        let reparsed: f64 = value.to_string().parse().unwrap();
        assert_eq!(Value::Number(reparsed), value);
    }
}
