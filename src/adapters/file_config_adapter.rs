//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; `configparser` stores them
//! lower-cased. Load failures surface as `MacrossError::ConfigParse` naming
//! the source.

use crate::domain::error::MacrossError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MacrossError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| MacrossError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, MacrossError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| MacrossError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    // Non-numeric values fall back to `default`; config_validation reports them.
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

    fn get_keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
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

    const SAMPLE: &str = r#"
[backtest]
initial_cash = 100000
start_date = 2020-01-01
end_date = 2024-12-31
tickers = SPY,QQQ

[strategy]
type = adaptive_ma
short_window = 20
volatility_threshold = 0.025
average = ema

[allocations]
QQQ = 0.5
IWM = 0.25
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "tickers"),
            Some("SPY,QQQ".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "type"),
            Some("adaptive_ma".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_cash = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("strategy", "short_window", 0), 20);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nlong_window = abc\n").unwrap();
        assert_eq!(adapter.get_int("strategy", "long_window", 42), 42);
        assert_eq!(adapter.get_int("strategy", "missing", 7), 7);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("strategy", "volatility_threshold", 0.0), 0.025);
        assert_eq!(adapter.get_double("backtest", "initial_cash", 0.0), 100000.0);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_cash = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_cash", 99.9), 99.9);
    }

    #[test]
    fn get_keys_lists_section_keys_lowercased() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_keys("allocations"), vec!["iwm", "qqq"]);
        assert_eq!(adapter.get_keys("ALLOCATIONS"), vec!["iwm", "qqq"]);
        assert!(adapter.get_keys("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("strategy", "average"), Some("ema".to_string()));
    }

    #[test]
    fn from_file_missing_file_is_config_parse_error() {
        let Err(err) = FileConfigAdapter::from_file("/nonexistent/path/config.ini") else {
            panic!("expected missing file to fail");
        };
        assert!(
            matches!(err, MacrossError::ConfigParse { ref file, .. } if file == "/nonexistent/path/config.ini")
        );
    }

    #[test]
    fn per_ticker_keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("allocations", "qqq", 1.0), 0.5);
        assert_eq!(adapter.get_double("Allocations", "IWM", 1.0), 0.25);
        assert_eq!(adapter.get_double("allocations", "SPY", 1.0), 1.0);
    }
}
