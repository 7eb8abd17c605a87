use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Option<KeywordValue>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeywordValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

impl Keyword {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            value: None,
            comment: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<KeywordValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn logical<S: Into<String>>(name: S, value: bool) -> Self {
        Self::new(name).with_value(value)
    }

    pub fn integer<S: Into<String>>(name: S, value: i64) -> Self {
        Self::new(name).with_value(value)
    }

    pub fn real<S: Into<String>>(name: S, value: f64) -> Self {
        Self::new(name).with_value(value)
    }

    pub fn string<S: Into<String>, V: Into<String>>(name: S, value: V) -> Self {
        Self::new(name).with_value(KeywordValue::String(value.into()))
    }

    /// Whether this is one of the `ZNAXISn`/`ZTILEn` style indexed keywords
    /// with the given prefix.
    pub fn index_of(&self, prefix: &str) -> Option<usize> {
        let digits = self.name.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl KeywordValue {
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}", self.name)?;
        if let Some(value) = &self.value {
            write!(f, "= {}", value)?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " / {}", comment)?;
        }
        Ok(())
    }
}

impl From<bool> for KeywordValue {
    fn from(value: bool) -> Self {
        Self::Logical(value)
    }
}

impl From<i64> for KeywordValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for KeywordValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<usize> for KeywordValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for KeywordValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for KeywordValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for KeywordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Name lookup over a list of header keywords; the first match wins.
pub trait KeywordLookup {
    fn value_of(&self, name: &str) -> Option<&KeywordValue>;

    fn integer_of(&self, name: &str) -> Option<i64> {
        self.value_of(name).and_then(KeywordValue::as_integer)
    }

    fn real_of(&self, name: &str) -> Option<f64> {
        self.value_of(name).and_then(KeywordValue::as_real)
    }

    fn string_of(&self, name: &str) -> Option<&str> {
        self.value_of(name).and_then(KeywordValue::as_string)
    }

    fn logical_of(&self, name: &str) -> Option<bool> {
        self.value_of(name).and_then(KeywordValue::as_logical)
    }
}

impl KeywordLookup for [Keyword] {
    fn value_of(&self, name: &str) -> Option<&KeywordValue> {
        self.iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
            .and_then(|k| k.value.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordBuilder {
    keywords: Vec<Keyword>,
}

impl KeywordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(&mut self, kw: Keyword) -> &mut Self {
        self.keywords.push(kw);
        self
    }

    pub fn value<S: Into<String>>(
        &mut self,
        name: S,
        value: impl Into<KeywordValue>,
        comment: &str,
    ) -> &mut Self {
        self.keyword(Keyword::new(name).with_value(value).with_comment(comment))
    }

    pub fn build(self) -> Vec<Keyword> {
        self.keywords
    }
}

impl From<KeywordBuilder> for Vec<Keyword> {
    fn from(builder: KeywordBuilder) -> Self {
        builder.keywords
    }
}
