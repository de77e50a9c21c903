//! INI file configuration adapter.
//!
//! Sections and keys are case-insensitive.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const FULL: &str = r#"
[bot]
pair = BTC/USDT
poll_interval_seconds = 60
initial_balance = 10000.0
short_window = 5
long_window = 20

[forecast]
order = 1,1,1
seasonal_order = 1,1,1,7

[data]
csv_dir = ./data
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(FULL).unwrap();
        assert_eq!(adapter.get_string("bot", "pair"), Some("BTC/USDT".to_string()));
        assert_eq!(
            adapter.get_string("forecast", "seasonal_order"),
            Some("1,1,1,7".to_string())
        );
        assert_eq!(adapter.get_string("data", "csv_dir"), Some("./data".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[bot]\nshort_window = 5\n").unwrap();
        assert_eq!(adapter.get_string("bot", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[BOT]\nShort_Window = 5\n").unwrap();
        assert_eq!(adapter.get_int("bot", "short_window", 0), 5);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string(FULL).unwrap();
        assert_eq!(adapter.get_int("bot", "long_window", 0), 20);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[bot]\nhistory_limit = abc\n").unwrap();
        assert_eq!(adapter.get_int("bot", "missing", 42), 42);
        assert_eq!(adapter.get_int("bot", "history_limit", 200), 200);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string(FULL).unwrap();
        assert_eq!(adapter.get_double("bot", "initial_balance", 0.0), 10000.0);
        assert_eq!(adapter.get_double("bot", "poll_interval_seconds", 0.0), 60.0);
    }

    #[test]
    fn get_double_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[bot]\ninitial_balance = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("bot", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("bot", "initial_balance", 99.9), 99.9);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(FULL);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_int("bot", "short_window", 0), 5);
        assert_eq!(adapter.get_string("forecast", "order"), Some("1,1,1".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
