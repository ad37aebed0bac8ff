//! Property definitions, property queries and their matching rules
//!
//! A provider declares each algorithm with a property definition such as
//! `provider=default,fips=no`. Callers select among implementations with a
//! property query:
//!
//! - `name=value` requires the property to have that value
//! - `name!=value` requires the property to be absent or different
//! - `name` is shorthand for `name=yes`
//! - `-name` requires the property to be absent
//! - a leading `?` makes a clause optional: it never rejects a definition but
//!   adds to the match score when satisfied
//!
//! Names are case-insensitive. Unquoted values are case-insensitive, quoted
//! values (`"..."` or `'...'`) are kept verbatim, and all-digit values are
//! numbers. A boolean property that is not defined reads as `no`.

use crate::error::{Result, ValidationError};
use std::fmt;
use std::str::FromStr;

/// Value of a single property
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyValue {
    /// String value (unquoted values are stored lowercase)
    Str(String),
    /// Decimal number value
    Number(i64),
}

impl PropertyValue {
    fn yes() -> Self {
        Self::Str("yes".to_string())
    }

    fn is_no(&self) -> bool {
        matches!(self, Self::Str(s) if s == "no")
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)
                if !s.is_empty()
                    && s.parse::<i64>().is_err()
                    && s.chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_-.".contains(c)) =>
            {
                write!(f, "{s}")
            }
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Comparison a query clause performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `name=value`
    Equal,
    /// `name!=value`
    NotEqual,
    /// `-name`
    Absent,
}

/// One clause of a property query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub name: String,
    pub operator: Operator,
    pub value: Option<PropertyValue>,
    pub optional: bool,
}

impl Clause {
    fn is_satisfied_by(&self, definition: &PropertyDefinition) -> bool {
        let actual = definition.get(&self.name);
        match (self.operator, &self.value) {
            (Operator::Absent, _) => actual.is_none(),
            (Operator::Equal, Some(expected)) => match actual {
                Some(actual) => actual == expected,
                None => expected.is_no(),
            },
            (Operator::NotEqual, Some(expected)) => match actual {
                Some(actual) => actual != expected,
                None => !expected.is_no(),
            },
            (_, None) => false,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "?")?;
        }
        match (self.operator, &self.value) {
            (Operator::Absent, _) => write!(f, "-{}", self.name),
            (Operator::Equal, Some(value)) => write!(f, "{}={value}", self.name),
            (Operator::NotEqual, Some(value)) => write!(f, "{}!={value}", self.name),
            (_, None) => write!(f, "{}", self.name),
        }
    }
}

/// Properties declared by one algorithm implementation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyDefinition {
    /// Sorted by name, names unique
    properties: Vec<(String, PropertyValue)>,
}

impl PropertyDefinition {
    /// Parse a definition such as `provider=default,fips=yes`
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input);
        let mut properties: Vec<(String, PropertyValue)> = Vec::new();

        parser.skip_ws();
        if parser.at_end() {
            return Ok(Self::default());
        }
        loop {
            let start = parser.pos;
            let name = parser.name()?;
            parser.skip_ws();
            let value = if parser.eat('=') {
                parser.value()?
            } else {
                PropertyValue::yes()
            };
            match properties.binary_search_by(|(n, _)| n.as_str().cmp(&name)) {
                Ok(_) => return Err(parser.error_at(start, "duplicate property name")),
                Err(index) => properties.insert(index, (name, value)),
            }
            if !parser.separator()? {
                break;
            }
        }
        Ok(Self { properties })
    }

    /// Value of a property, if defined
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        let name = name.to_ascii_lowercase();
        self.properties
            .binary_search_by(|(n, _)| n.as_str().cmp(&name))
            .ok()
            .map(|index| &self.properties[index].1)
    }

    /// Number of defined properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no property is defined
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl FromStr for PropertyDefinition {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Selection expression evaluated against property definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyQuery {
    clauses: Vec<Clause>,
}

impl PropertyQuery {
    /// Parse a query such as `provider=default,-fips,?quality=high`
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input);
        let mut clauses: Vec<Clause> = Vec::new();

        parser.skip_ws();
        if parser.at_end() {
            return Ok(Self::default());
        }
        loop {
            let start = parser.pos;
            let optional = parser.eat('?');
            parser.skip_ws();
            let clause = if parser.eat('-') {
                let name = parser.name()?;
                Clause {
                    name,
                    operator: Operator::Absent,
                    value: None,
                    optional,
                }
            } else {
                let name = parser.name()?;
                parser.skip_ws();
                let (operator, value) = if parser.eat_str("!=") {
                    (Operator::NotEqual, parser.value()?)
                } else if parser.eat('=') {
                    (Operator::Equal, parser.value()?)
                } else {
                    (Operator::Equal, PropertyValue::yes())
                };
                Clause {
                    name,
                    operator,
                    value: Some(value),
                    optional,
                }
            };
            if clauses.iter().any(|c| c.name == clause.name) {
                return Err(parser.error_at(start, "property named more than once"));
            }
            clauses.push(clause);
            if !parser.separator()? {
                break;
            }
        }
        Ok(Self { clauses })
    }

    /// Clauses in the order they were written
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether the query selects everything
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate a definition against this query.
    ///
    /// Returns `None` when a mandatory clause is not satisfied, otherwise the
    /// number of satisfied clauses. A higher score is a more specific match.
    pub fn match_score(&self, definition: &PropertyDefinition) -> Option<usize> {
        let mut score = 0;
        for clause in &self.clauses {
            if clause.is_satisfied_by(definition) {
                score += 1;
            } else if !clause.optional {
                return None;
            }
        }
        Some(score)
    }

    /// Whether every mandatory clause is satisfied by `definition`
    pub fn matches(&self, definition: &PropertyDefinition) -> bool {
        self.match_score(definition).is_some()
    }

    /// Overlay this query on `defaults`: clauses here win over default
    /// clauses that name the same property.
    pub fn merged_over(&self, defaults: &PropertyQuery) -> PropertyQuery {
        let mut clauses = self.clauses.clone();
        clauses.extend(
            defaults
                .clauses
                .iter()
                .filter(|d| !self.clauses.iter().any(|c| c.name == d.name))
                .cloned(),
        );
        PropertyQuery { clauses }
    }
}

impl FromStr for PropertyQuery {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error_at(&self, position: usize, reason: &str) -> crate::Error {
        ValidationError::invalid_property(self.input, position, reason).into()
    }

    /// Consume a `,` separator; `false` at end of input
    fn separator(&mut self) -> Result<bool> {
        self.skip_ws();
        if self.at_end() {
            return Ok(false);
        }
        if self.eat(',') {
            self.skip_ws();
            if self.at_end() {
                return Err(self.error_at(self.pos, "trailing ','"));
            }
            return Ok(true);
        }
        Err(self.error_at(self.pos, "expected ','"))
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error_at(start, "expected a property name")),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            self.bump();
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn value(&mut self) -> Result<PropertyValue> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let body_start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let body = self.input[body_start..self.pos].to_string();
                        self.bump();
                        return Ok(PropertyValue::Str(body));
                    }
                    self.bump();
                }
                Err(self.error_at(start, "unterminated quoted value"))
            }
            _ => {
                while self
                    .peek()
                    .is_some_and(|c| c != ',' && c != '=' && c != '!' && !c.is_whitespace())
                {
                    self.bump();
                }
                let raw = &self.input[start..self.pos];
                if raw.is_empty() {
                    return Err(self.error_at(start, "expected a value"));
                }
                let is_number = raw.strip_prefix('-').unwrap_or(raw);
                if !is_number.is_empty() && is_number.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(n) = raw.parse::<i64>() {
                        return Ok(PropertyValue::Number(n));
                    }
                }
                Ok(PropertyValue::Str(raw.to_ascii_lowercase()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(s: &str) -> PropertyDefinition {
        PropertyDefinition::parse(s).unwrap()
    }

    fn query(s: &str) -> PropertyQuery {
        PropertyQuery::parse(s).unwrap()
    }

    #[test]
    fn test_parse_definition() {
        let d = def("provider=default, fips=yes,Version=3");
        assert_eq!(d.len(), 3);
        assert_eq!(d.get("PROVIDER"), Some(&PropertyValue::Str("default".into())));
        assert_eq!(d.get("version"), Some(&PropertyValue::Number(3)));
        assert_eq!(d.to_string(), "fips=yes,provider=default,version=3");
    }

    #[test]
    fn test_bare_name_means_yes() {
        let d = def("fips");
        assert_eq!(d.get("fips"), Some(&PropertyValue::Str("yes".into())));
    }

    #[test]
    fn test_quoted_values_keep_case() {
        let d = def("owner='Acme Corp'");
        assert_eq!(d.get("owner"), Some(&PropertyValue::Str("Acme Corp".into())));
        assert!(query("owner=\"Acme Corp\"").matches(&d));
        assert!(!query("owner=\"acme corp\"").matches(&d));
    }

    #[test]
    fn test_empty_strings_parse() {
        assert!(def("").is_empty());
        assert!(query("   ").is_empty());
        assert_eq!(query("").match_score(&def("provider=x")), Some(0));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["provider=", "=x", "a=1,", "a=1 b=2", "a='open", "a=1,a=2"] {
            assert!(PropertyDefinition::parse(bad).is_err(), "{bad}");
        }
        for bad in ["provider==x", "-", "?", "a,a", "a!x"] {
            assert!(PropertyQuery::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_equal_and_not_equal() {
        let d = def("provider=p1");
        assert!(query("provider=p1").matches(&d));
        assert!(query("provider=P1").matches(&d));
        assert!(!query("provider=p2").matches(&d));
        assert!(query("provider!=p2").matches(&d));
        assert!(!query("provider!=p1").matches(&d));
    }

    #[test]
    fn test_absent_operator() {
        assert!(query("-fips").matches(&def("provider=p1")));
        assert!(!query("-fips").matches(&def("provider=p1,fips=no")));
    }

    #[test]
    fn test_undefined_boolean_reads_as_no() {
        let d = def("provider=default");
        assert!(query("fips=no").matches(&d));
        assert!(!query("fips").matches(&d));
        assert!(query("fips!=yes").matches(&d));
        assert!(!query("fips!=no").matches(&d));
    }

    #[test]
    fn test_optional_clauses_only_score() {
        let q = query("provider=p1,?quality=high");
        assert_eq!(q.match_score(&def("provider=p1")), Some(1));
        assert_eq!(q.match_score(&def("provider=p1,quality=high")), Some(2));
        assert_eq!(q.match_score(&def("provider=p2,quality=high")), None);
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let defaults = query("provider=p1,fips=yes");
        let merged = query("provider=p2").merged_over(&defaults);
        assert_eq!(merged.to_string(), "provider=p2,fips=yes");

        let merged = PropertyQuery::default().merged_over(&defaults);
        assert_eq!(merged, defaults);
    }

    #[test]
    fn test_query_display_roundtrip() {
        let q = query("?provider=p1,-fips,level!=2,owner='A B'");
        assert_eq!(q.to_string(), "?provider=p1,-fips,level!=2,owner=\"A B\"");
        assert_eq!(query(&q.to_string()), q);
    }
}
