use std::collections::BTreeMap;

use crate::core::{CompressionError, Result};
use crate::header::KeywordValue;

/// Named codec parameters, keyed by lower-case name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, KeywordValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: AsRef<str>>(mut self, name: S, value: impl Into<KeywordValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set<S: AsRef<str>>(&mut self, name: S, value: impl Into<KeywordValue>) {
        self.values
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&KeywordValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value.as_integer().map(Some).ok_or_else(|| {
                CompressionError::params(format!("{} must be an integer, got {}", name, value))
            }),
        }
    }

    /// Logical parameters also accept the integers 0 and 1 used by `ZVALn`.
    pub fn logical(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(KeywordValue::Logical(b)) => Ok(Some(*b)),
            Some(KeywordValue::Integer(0)) => Ok(Some(false)),
            Some(KeywordValue::Integer(1)) => Ok(Some(true)),
            Some(other) => Err(CompressionError::params(format!(
                "{} must be logical, got {}",
                name, other
            ))),
        }
    }

    pub fn integer_or(&self, name: &str, default: i64) -> Result<i64> {
        Ok(self.integer(name)?.unwrap_or(default))
    }

    pub fn required_integer(&self, name: &str) -> Result<i64> {
        self.integer(name)?
            .ok_or_else(|| CompressionError::params(format!("missing parameter {}", name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Optional,
    /// Needed only to decompress, such as the pixel count of a tile.
    Decompress,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub requirement: Requirement,
}

impl ParamSpec {
    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Optional,
        }
    }

    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Always,
        }
    }

    pub const fn for_decompress(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Decompress,
        }
    }

    pub(crate) fn check_type(&self, params: &Parameters) -> Result<()> {
        match self.kind {
            ParamKind::Integer => params.integer(self.name).map(|_| ()),
            ParamKind::Logical => params.logical(self.name).map(|_| ()),
        }
    }
}
