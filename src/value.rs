//! Typed values for metadata and annotation records.
//!
//! Literal objects are converted according to their XSD datatype; anything
//! that does not parse as its declared type falls back to its lexical text.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::namespaces::XSD;
use crate::store::{Literal, Term};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Uri(String),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Uri(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        let lexical = literal.lexical.as_str();
        let Some(local) = literal
            .datatype
            .as_deref()
            .and_then(|dt| dt.strip_prefix(XSD))
        else {
            return Value::Text(lexical.to_string());
        };
        let parsed = match local {
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "unsignedInt" | "unsignedLong" => {
                lexical.trim().parse().ok().map(Value::Integer)
            }
            "double" | "float" | "decimal" => lexical.trim().parse().ok().map(Value::Float),
            "boolean" => match lexical.trim() {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            "dateTime" => DateTime::parse_from_rfc3339(lexical.trim())
                .ok()
                .map(Value::DateTime),
            "date" => NaiveDate::parse_from_str(lexical.trim(), "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            _ => None,
        };
        parsed.unwrap_or_else(|| Value::Text(lexical.to_string()))
    }
}

impl From<&Term> for Value {
    fn from(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => Value::Uri(iri.clone()),
            Term::Blank(_) => Value::Uri(term.to_plain_string()),
            Term::Literal(literal) => Value::from(literal),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uri(s) | Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::terms;

    #[test]
    fn numeric_literals_convert() {
        assert_eq!(Value::from(&Literal::integer(42)), Value::Integer(42));
        assert_eq!(Value::from(&Literal::double(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(&Literal::integer(7)).as_f64(), Some(7.0));
    }

    #[test]
    fn unparsable_typed_literal_keeps_lexical_form() {
        let odd = Literal::typed("about ten", terms::XSD_INTEGER);
        assert_eq!(Value::from(&odd), Value::text("about ten"));
    }

    #[test]
    fn date_time_and_plain_literals() {
        let stamp = Literal::typed("2013-12-20T12:20:00+10:00", terms::XSD_DATE_TIME);
        let Value::DateTime(dt) = Value::from(&stamp) else {
            panic!("expected a date-time");
        };
        assert_eq!(dt.to_rfc3339(), "2013-12-20T12:20:00+10:00");
        assert_eq!(Value::from(&Literal::simple("1788")), Value::text("1788"));
        assert_eq!(
            serde_json::to_value(Value::from(&Literal::simple("1788"))).unwrap(),
            serde_json::json!("1788")
        );
    }

    #[test]
    fn iris_and_blank_nodes_become_uris() {
        assert_eq!(
            Value::from(&Term::iri("http://example.org/a")),
            Value::Uri("http://example.org/a".into())
        );
        assert_eq!(Value::from(&Term::blank("b0")).to_string(), "_:b0");
    }
}
