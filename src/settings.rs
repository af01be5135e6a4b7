use std::path::PathBuf;

use unidata_compact::OutputSettings;
use unidata_logging::{LogCategory, LogLevel, log_error};
use unidata_toml::{Item, Toml};

const LOG_CAT : LogCategory = LogCategory::new("Settings");

/// Settings file, looked up in the working directory
pub const SETTINGS_FILE : &str = "unidata.toml";

/// Run settings
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Settings {
    /// Directory holding the UCD text files
    pub data_dir     : PathBuf,
    pub output       : OutputSettings,
    pub log_level    : LogLevel,
    /// Extra file to write the log to
    pub log_file     : Option<PathBuf>,
    pub always_flush : bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output: OutputSettings::default(),
            log_level: LogLevel::Info,
            log_file: None,
            always_flush: false,
        }
    }
}

impl Settings {
    /// Parse the settings, keys which are not set keep their default value.
    ///
    /// Returns `None` if the file cannot be parsed or if a key has an unexpected value.
    pub fn load(toml: &str) -> Option<Settings> {
        let toml = match Toml::parse(toml) {
            Ok(toml) => toml,
            Err(err) => {
                log_error!(LOG_CAT, Self::load, "Failed to parse '{SETTINGS_FILE}', err: {err}");
                return None;
            }
        };
        let mut settings = Settings::default();

        if let Some(paths) = toml.get_table("paths") {
            if let Some(item) = paths.get_item("data-dir") {
                settings.data_dir = PathBuf::from(expect_str(item, "paths.data-dir")?);
            }
            if let Some(item) = paths.get_item("out-dir") {
                settings.output.out_dir = PathBuf::from(expect_str(item, "paths.out-dir")?);
            }
            if let Some(item) = paths.get_item("file-prefix") {
                let prefix = expect_str(item, "paths.file-prefix")?;
                if prefix.is_empty() || prefix.contains(['/', '\\']) {
                    log_error!(LOG_CAT, Self::load, "'paths.file-prefix' needs to be a non-empty file name, found '{prefix}'");
                    return None;
                }
                settings.output.file_prefix = prefix.to_string();
            }
        }

        if let Some(logging) = toml.get_table("logging") {
            if let Some(item) = logging.get_item("level") {
                let level = expect_str(item, "logging.level")?;
                settings.log_level = match LogLevel::parse(level) {
                    Some(level) => level,
                    None => {
                        log_error!(LOG_CAT, Self::load, "Unknown log level '{level}'");
                        return None;
                    }
                };
            }
            if let Some(item) = logging.get_item("log-file") {
                settings.log_file = Some(PathBuf::from(expect_str(item, "logging.log-file")?));
            }
            if let Some(item) = logging.get_item("always-flush") {
                settings.always_flush = expect_bool(item, "logging.always-flush")?;
            }
        }

        if let Some(output) = toml.get_table("output") {
            if let Some(item) = output.get_item("verify") {
                settings.output.verify = expect_bool(item, "output.verify")?;
            }
        }

        Some(settings)
    }
}

fn expect_str<'a>(item: &'a Item, key: &str) -> Option<&'a str> {
    match item {
        Item::String(s) => Some(s),
        _ => {
            log_error!(LOG_CAT, expect_str, "'{key}' needs to be a string");
            None
        }
    }
}

fn expect_bool(item: &Item, key: &str) -> Option<bool> {
    match item {
        Item::Boolean(val) => Some(*val),
        _ => {
            log_error!(LOG_CAT, expect_bool, "'{key}' needs to be a boolean");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Settings::load(""), Some(Settings::default()));
        let settings = Settings::default();
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.output.file_prefix, "data");
        assert!(settings.output.verify);
    }

    #[test]
    fn reads_every_key() {
        let settings = Settings::load(r#"
# unidata settings
[paths]
data-dir = "ucd/15.0"
out-dir = 'build/json'
file-prefix = "unicode"

[logging]
level = "verbose"
log-file = "unidata.log"
always-flush = true

[output]
verify = false
"#).unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("ucd/15.0"));
        assert_eq!(settings.output.out_dir, PathBuf::from("build/json"));
        assert_eq!(settings.output.file_prefix, "unicode");
        assert!(!settings.output.verify);
        assert_eq!(settings.log_level, LogLevel::Verbose);
        assert_eq!(settings.log_file, Some(PathBuf::from("unidata.log")));
        assert!(settings.always_flush);
    }

    #[test]
    fn dotted_keys_work_too() {
        let settings = Settings::load("paths.out-dir = \"out\"\noutput.verify = false").unwrap();
        assert_eq!(settings.output.out_dir, PathBuf::from("out"));
        assert!(!settings.output.verify);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(Settings::load("[logging]\nlevel = \"loud\""), None);
        assert_eq!(Settings::load("[output]\nverify = \"yes\""), None);
        assert_eq!(Settings::load("[paths]\nfile-prefix = \"a/b\""), None);
        assert_eq!(Settings::load("[paths\ndata-dir = \"x\""), None);
    }
}
