use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Smallest ring that still lets the producer stage while one copy is queued.
pub const MIN_UPLOAD_SLOTS: usize = 2;
pub const DEFAULT_UPLOAD_SLOTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameConfig {
    pub version: u32,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub presenter: PresenterConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default, deserialize_with = "deserialize_filter")]
    pub filter: FilterSetting,
    #[serde(default)]
    pub lcd_filter: bool,
    #[serde(default)]
    pub smoothing: bool,
    #[serde(default)]
    pub integer_scale: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresenterConfig {
    #[serde(default = "default_upload_slots")]
    pub upload_slots: usize,
    #[serde(
        default = "default_wait_timeout",
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_timeout: Option<Duration>,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            upload_slots: default_upload_slots(),
            wait_timeout: default_wait_timeout(),
        }
    }
}

/// CRT shader family requested for CRT-type screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterSetting {
    #[default]
    Off,
    Crt,
    SimpleCrt,
}

impl FilterSetting {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Crt => "crt",
            Self::SimpleCrt => "simple-crt",
        }
    }
}

impl fmt::Display for FilterSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_upload_slots() -> usize {
    DEFAULT_UPLOAD_SLOTS
}

fn default_wait_timeout() -> Option<Duration> {
    Some(Duration::from_millis(250))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            match v.trim() {
                "off" | "none" | "never" => Ok(None),
                raw => humantime::parse_duration(raw)
                    .map(Some)
                    .map_err(|err| E::custom(format!("invalid duration '{v}': {err}"))),
            }
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a finite non-negative number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_filter<'de, D>(deserializer: D) -> Result<FilterSetting, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_filter(&raw).map_err(de::Error::custom)
}

/// Accepts the canonical filter names plus a few spellings users reach for.
///
/// Shared by the config file and the command line.
pub fn parse_filter(raw: &str) -> Result<FilterSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
    match normalized.as_str() {
        "" | "off" | "none" | "disabled" => Ok(FilterSetting::Off),
        "crt" | "classic" | "crt-classic" => Ok(FilterSetting::Crt),
        "simple-crt" | "simple" | "crt-simple" => Ok(FilterSetting::SimpleCrt),
        other => Err(format!("invalid filter '{other}'")),
    }
}

impl FrameConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FrameConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.presenter.upload_slots < MIN_UPLOAD_SLOTS {
            return Err(ConfigError::Invalid(format!(
                "presenter.upload_slots must be >= {MIN_UPLOAD_SLOTS}, got {}",
                self.presenter.upload_slots
            )));
        }

        if let Some(timeout) = self.presenter.wait_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::Invalid(
                    "presenter.wait_timeout must be greater than zero; use \"off\" to disable"
                        .into(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: 1,
            video: VideoConfig::default(),
            presenter: PresenterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version = 1

[video]
filter = "simple-crt"
lcd_filter = true
smoothing = false
integer_scale = true

[presenter]
upload_slots = 4
wait_timeout = "100ms"
"#;

    #[test]
    fn parses_sample_config() {
        let config = FrameConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.video.filter, FilterSetting::SimpleCrt);
        assert!(config.video.lcd_filter);
        assert!(config.video.integer_scale);
        assert_eq!(config.presenter.upload_slots, 4);
        assert_eq!(
            config.presenter.wait_timeout,
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = FrameConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.video.filter, FilterSetting::Off);
        assert!(!config.video.smoothing);
        assert_eq!(config.presenter.upload_slots, DEFAULT_UPLOAD_SLOTS);
        assert_eq!(
            config.presenter.wait_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn wait_timeout_accepts_seconds_and_off() {
        let seconds = FrameConfig::from_toml_str(
            r#"
version = 1
[presenter]
wait_timeout = 0.5
"#,
        )
        .unwrap();
        assert_eq!(
            seconds.presenter.wait_timeout,
            Some(Duration::from_millis(500))
        );

        let off = FrameConfig::from_toml_str(
            r#"
version = 1
[presenter]
wait_timeout = "off"
"#,
        )
        .unwrap();
        assert_eq!(off.presenter.wait_timeout, None);
    }

    #[test]
    fn rejects_single_upload_slot() {
        let err = FrameConfig::from_toml_str(
            r#"
version = 1
[presenter]
upload_slots = 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeout_and_bad_version() {
        let zero = FrameConfig::from_toml_str(
            r#"
version = 1
[presenter]
wait_timeout = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(zero, ConfigError::Invalid(_)));

        let version = FrameConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(version, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_filter_is_a_parse_error() {
        let err = FrameConfig::from_toml_str(
            r#"
version = 1
[video]
filter = "scanlines"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(parse_filter(" Classic "), Ok(FilterSetting::Crt));
    }

    #[test]
    fn filter_names_normalise() {
        assert_eq!(parse_filter(""), Ok(FilterSetting::Off));
        assert_eq!(parse_filter("Off"), Ok(FilterSetting::Off));
        assert_eq!(parse_filter("CRT"), Ok(FilterSetting::Crt));
        assert_eq!(parse_filter("Simple CRT"), Ok(FilterSetting::SimpleCrt));
        assert_eq!(parse_filter("crt_simple"), Ok(FilterSetting::SimpleCrt));
        assert!(parse_filter("scanlines").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retroview.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        drop(file);

        let config = FrameConfig::from_path(&path).unwrap();
        assert_eq!(config.video.filter.name(), "simple-crt");

        let missing = FrameConfig::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
