//! INI configuration read through `configparser`.
//!
//! Values are trimmed and a key with a blank value reads as absent, so
//! `fundamentals =` and a missing `fundamentals` line mean the same thing.

use crate::domain::error::EquiscoreError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EquiscoreError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| EquiscoreError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EquiscoreError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EquiscoreError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.value(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.value(section, key)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.value(section, key)
            .and_then(|v| Self::parse_bool(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
price_dir = data/prices
fundamentals =
tickers =  RELIANCE.NS,TCS.NS

[pipeline]
max_workers = 8
batch_size = lots
retry_failed = off

[risk]
risk_free_rate = 0.07

[scoring]
macro_score = nan
"#;

    fn sample() -> FileConfigAdapter {
        FileConfigAdapter::from_string(SAMPLE).unwrap()
    }

    #[test]
    fn values_are_trimmed() {
        assert_eq!(
            sample().get_string("data", "tickers"),
            Some("RELIANCE.NS,TCS.NS".to_string())
        );
    }

    #[test]
    fn blank_value_reads_as_absent() {
        let config = sample();
        assert_eq!(config.get_string("data", "fundamentals"), None);
        assert_eq!(config.get_string("data", "missing"), None);
        assert_eq!(config.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numbers_fall_back_to_default_when_unparseable() {
        let config = sample();
        assert_eq!(config.get_int("pipeline", "max_workers", 0), 8);
        assert_eq!(config.get_int("pipeline", "batch_size", 10), 10);
        assert_eq!(config.get_double("risk", "risk_free_rate", 0.0), 0.07);
        // non-finite is never a usable score
        assert_eq!(config.get_double("scoring", "macro_score", 50.0), 50.0);
    }

    #[test]
    fn bool_spellings() {
        let config = FileConfigAdapter::from_string(
            "[cache]
a = Yes
b = on
c = 1
d = FALSE
e = no
f = 0
g = maybe
",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert!(config.get_bool("cache", key, false), "{key}");
        }
        for key in ["d", "e", "f"] {
            assert!(!config.get_bool("cache", key, true), "{key}");
        }
        assert!(config.get_bool("cache", "g", true));
        assert!(!sample().get_bool("pipeline", "retry_failed", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[cache]\npath = /tmp/equiscore.sqlite\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("cache", "path"),
            Some("/tmp/equiscore.sqlite".to_string())
        );
    }

    #[test]
    fn missing_file_is_a_parse_error_naming_the_file() {
        match FileConfigAdapter::from_file("/nonexistent/path/equiscore.ini") {
            Err(EquiscoreError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/equiscore.ini");
            }
            Err(other) => panic!("expected ConfigParse, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
