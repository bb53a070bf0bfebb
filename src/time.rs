//! Conversion between the API's textual timestamps and `NaiveDateTime`.

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write;

/// Parses and formats timestamps using one strftime-style format string,
/// e.g. `%Y-%m-%d %H:%M:%S`.
#[derive(Debug, Clone)]
pub struct TimeParser {
    format: String,
}

impl TimeParser {
    /// # Errors
    ///
    /// Returns an error if `format` contains an unknown specifier or one a
    /// zone-less timestamp cannot render, such as `%z`.
    pub fn new(format: &str) -> Result<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            bail!("invalid time format '{format}'");
        }
        let mut rendered = String::new();
        if write!(rendered, "{}", NaiveDateTime::default().format(format)).is_err() {
            bail!("time format '{format}' needs a time zone");
        }
        Ok(Self {
            format: format.to_string(),
        })
    }

    pub fn parse(&self, time: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(time, &self.format)
            .with_context(|| format!("'{time}' does not match time format '{}'", self.format))
    }

    pub fn format(&self, time: &NaiveDateTime) -> String {
        time.format(&self.format).to_string()
    }
}
