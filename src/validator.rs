//! Field-level validation error accumulator.
//!
//! Model code declares constraints with [`Validator::check`]; handlers decide
//! how to report the collected errors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// ASCII letters only, at least one.
pub static USERNAME_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("username pattern is valid"));

/// Collects at most one message per field. The first failed check for a
/// field wins; later checks against the same field are ignored.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no check has failed.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records `message` for `field` unless the field already has one.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    /// Records `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }
}

/// `true` when `value` matches `pattern`. Anchor the pattern (`^...$`) to
/// require a full match.
pub fn matches(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}
