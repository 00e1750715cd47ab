use anyhow::Result;
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use serde::{de::Visitor, Deserialize, Deserializer};
use std::{fmt, str::FromStr};
use tracing::Level;

const LOG_LEVELS: [&str; 5] = ["DEBUG", "ERROR", "INFO", "TRACE", "WARN"];

struct LevelVisitor;

impl<'de> Visitor<'de> for LevelVisitor {
    type Value = Level;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a log level name, one of ")?;
        formatter.write_str(&LOG_LEVELS.join(","))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        FromStr::from_str(v).map_err(|_| E::unknown_variant(v, &LOG_LEVELS))
    }
}

pub fn deserialize_level<'de, D>(de: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    de.deserialize_string(LevelVisitor)
}

/// Which spidev node to target when the command line names none.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Port {
    pub bus: u32,
    pub device: u32,
}

/// Clocking applied to transfers unless overridden per call.
///
/// `None` falls back to whatever the node reports at open time.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Transfer {
    pub speed_hz: Option<u32>,
    pub bits_per_word: Option<u8>,
    pub delay_usecs: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: Port,
    pub transfer: Transfer,
    #[serde(deserialize_with = "deserialize_level")]
    pub loglevel: Level,
    pub json_logs: bool,
}

impl Settings {
    pub fn new() -> Result<Settings> {
        let reader = ConfigBuilder::<DefaultState>::default()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::default())
            .build()?;

        Ok(reader.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: Default::default(),
            transfer: Default::default(),
            loglevel: Level::INFO,
            json_logs: false,
        }
    }
}
