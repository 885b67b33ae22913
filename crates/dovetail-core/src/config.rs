//! Converter settings.
//!
//! Loaded once per process from environment variables (and an optional
//! `.env` file); conversion calls receive them by reference.

use anyhow::Result;
use config::Config;
use serde::Deserialize;

/// Tunable conversion behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterSettings {
    /// PRODID emitted on generated calendars.
    #[serde(default = "default_prodid")]
    pub prodid: String,
    /// Reminder minutes substituted for the store's "use default" sentinel.
    #[serde(default = "default_reminder_minutes")]
    pub default_reminder_minutes: u32,
    /// Safety cap on occurrence enumeration per rule.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: u32,
    /// Timezone assumed for floating wire times, Olson name.
    #[serde(default)]
    pub floating_timezone: Option<String>,
}

fn default_prodid() -> String {
    "-//Dovetail//Dovetail Groupware Converter//EN".to_string()
}

const fn default_reminder_minutes() -> u32 {
    15
}

const fn default_max_occurrences() -> u32 {
    10_000
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            prodid: default_prodid(),
            default_reminder_minutes: default_reminder_minutes(),
            max_occurrences: default_max_occurrences(),
            floating_timezone: None,
        }
    }
}

impl ConverterSettings {
    /// ## Summary
    /// Loads settings from `.env` and `DOVETAIL_`-prefixed environment
    /// variables. Environment variables take precedence over `.env` values.
    ///
    /// ## Errors
    /// Returns an error if a variable fails to deserialize.
    pub fn new() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .add_source(config::Environment::with_prefix("DOVETAIL"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
