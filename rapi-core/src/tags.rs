//! Typed value containers.
//!
//! [`Param`] carries a named aligner option; [`Tag`] carries a per-alignment
//! auxiliary field with a short inline key.  Both are discriminated over the
//! same four value types.  Typed getters return a [`RapiError::Type`] when
//! the stored variant does not match the requested one.

use serde::{Deserialize, Serialize};

use crate::error::{RapiError, Result};

/// Type code for character values.
pub const VTYPE_CHAR: u8 = 1;
/// Type code for text values.
pub const VTYPE_TEXT: u8 = 2;
/// Type code for integer values.
pub const VTYPE_INT: u8 = 3;
/// Type code for real values.
pub const VTYPE_REAL: u8 = 4;

/// Maximum tag key length, in bytes.
pub const MAX_TAG_LEN: usize = 6;

/// A value discriminated over the four supported types.
///
/// Text values own their storage; replacing a text value with another
/// variant drops the old payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Char(char),
    Text(String),
    Int(i64),
    Real(f64),
}

impl Value {
    /// The wire-stable type code for this variant.
    pub fn type_code(&self) -> u8 {
        match self {
            Value::Char(_) => VTYPE_CHAR,
            Value::Text(_) => VTYPE_TEXT,
            Value::Int(_) => VTYPE_INT,
            Value::Real(_) => VTYPE_REAL,
        }
    }

    /// The SAM optional-field type letter for this variant.
    pub fn sam_type_char(&self) -> char {
        match self {
            Value::Char(_) => 'A',
            Value::Text(_) => 'Z',
            Value::Int(_) => 'i',
            Value::Real(_) => 'f',
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Char(_) => "char",
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
        }
    }

    fn as_char(&self) -> Result<char> {
        match self {
            Value::Char(c) => Ok(*c),
            other => Err(mismatch("char", other)),
        }
    }

    fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", other)),
        }
    }

    fn as_long(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch("int", other)),
        }
    }

    fn as_real(&self) -> Result<f64> {
        match self {
            Value::Real(v) => Ok(*v),
            other => Err(mismatch("real", other)),
        }
    }
}

fn mismatch(wanted: &str, found: &Value) -> RapiError {
    RapiError::Type(format!("requested {} but value is {}", wanted, found.type_name()))
}

/// A named aligner parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    name: String,
    value: Value,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), value }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_char(&mut self, value: char) {
        self.value = Value::Char(value);
    }

    /// Stores a copy of `value`; the parameter owns its text.
    pub fn set_text(&mut self, value: &str) {
        self.value = Value::Text(value.to_string());
    }

    pub fn set_long(&mut self, value: i64) {
        self.value = Value::Int(value);
    }

    pub fn set_real(&mut self, value: f64) {
        self.value = Value::Real(value);
    }

    pub fn get_char(&self) -> Result<char> {
        self.value.as_char()
    }

    pub fn get_text(&self) -> Result<&str> {
        self.value.as_text()
    }

    pub fn get_long(&self) -> Result<i64> {
        self.value.as_long()
    }

    pub fn get_real(&self) -> Result<f64> {
        self.value.as_real()
    }
}

/// Fixed-capacity inline tag key.  Longer keys are truncated to
/// [`MAX_TAG_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagKey {
    bytes: [u8; MAX_TAG_LEN],
    len: u8,
}

impl TagKey {
    pub fn new(key: &str) -> Self {
        let mut bytes = [0u8; MAX_TAG_LEN];
        let mut len = 0u8;
        for &b in key.as_bytes().iter().take(MAX_TAG_LEN) {
            bytes[len as usize] = b;
            len += 1;
        }
        Self { bytes, len }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

/// A per-alignment auxiliary field.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    key: TagKey,
    value: Value,
}

impl Tag {
    pub fn new(key: &str, value: Value) -> Self {
        Self { key: TagKey::new(key), value }
    }

    pub fn char(key: &str, value: char) -> Self {
        Self::new(key, Value::Char(value))
    }

    /// Builds a text tag with an owned copy of `value`.
    pub fn text(key: &str, value: &str) -> Self {
        Self::new(key, Value::Text(value.to_string()))
    }

    pub fn int(key: &str, value: i64) -> Self {
        Self::new(key, Value::Int(value))
    }

    pub fn real(key: &str, value: f64) -> Self {
        Self::new(key, Value::Real(value))
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_key(&mut self, key: &str) {
        self.key = TagKey::new(key);
    }

    pub fn set_char(&mut self, value: char) {
        self.value = Value::Char(value);
    }

    pub fn set_text(&mut self, value: &str) {
        self.value = Value::Text(value.to_string());
    }

    pub fn set_long(&mut self, value: i64) {
        self.value = Value::Int(value);
    }

    pub fn set_real(&mut self, value: f64) {
        self.value = Value::Real(value);
    }

    pub fn get_char(&self) -> Result<char> {
        self.value.as_char()
    }

    pub fn get_text(&self) -> Result<&str> {
        self.value.as_text()
    }

    pub fn get_long(&self) -> Result<i64> {
        self.value.as_long()
    }

    pub fn get_real(&self) -> Result<f64> {
        self.value.as_real()
    }
}
