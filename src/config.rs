use crate::status::scheme;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".updateme";
const CONFIG_FILE: &str = "config.json";
const SCHEME_FILE: &str = "scheme.json";
const DEFAULT_REMINDER_TIME: &str = "17:00";

pub const FISCAL_FORMATS: [&str; 3] = ["FY-YY", "FY-YYYY", "FYXX"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub scheme_path: PathBuf,
    pub category_scheme: String,
    pub export_dir: PathBuf,
    pub api_port: u16,
    pub reminder_enabled: bool,
    pub reminder_time: String,
    pub end_of_week_reminder: bool,
    pub fiscal_year_start_month: u32,
    pub fiscal_year_start_day: u32,
    pub fiscal_year_format: String,
    pub use_quarters: bool,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("updateme.db"),
            scheme_path: root.join(SCHEME_FILE),
            category_scheme: "classic".to_string(),
            export_dir: default_export_dir(),
            api_port: 7892,
            reminder_enabled: true,
            reminder_time: DEFAULT_REMINDER_TIME.to_string(),
            end_of_week_reminder: true,
            fiscal_year_start_month: 1,
            fiscal_year_start_day: 1,
            fiscal_year_format: "FY-YY".to_string(),
            use_quarters: true,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!(
                "Failed to create export directory: {}",
                self.export_dir.as_path().display()
            )
        })?;

        if !self.scheme_path.exists() {
            self.write_builtin_scheme()?;
        }

        Ok(())
    }

    /// Overwrites the scheme file with the built-in tables for the
    /// configured scheme name. Discards any hand edits to the file.
    pub fn write_builtin_scheme(&self) -> Result<()> {
        let seed = scheme::builtin_scheme(&self.category_scheme).unwrap_or(scheme::CLASSIC_SCHEME);

        fs::write(&self.scheme_path, seed).with_context(|| {
            format!(
                "Failed to write scheme file: {}",
                self.scheme_path.display()
            )
        })?;
        set_mode_600(&self.scheme_path)
    }

    pub fn parse_reminder_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.reminder_time)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "category_scheme" => {
                let name = value.trim().to_lowercase();
                if scheme::builtin_scheme(&name).is_none() {
                    bail!("category_scheme must be one of: classic, launch");
                }
                self.category_scheme = name;
            }
            "reminder_enabled" => {
                self.reminder_enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("reminder_enabled must be true/false"))?;
            }
            "reminder_time" => {
                parse_hhmm(value)?;
                self.reminder_time = value.to_string();
            }
            "end_of_week_reminder" => {
                self.end_of_week_reminder = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("end_of_week_reminder must be true/false"))?;
            }
            "export_dir" => {
                self.export_dir = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "fiscal_year_start_month" => {
                let month = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("fiscal_year_start_month must be a number"))?;
                if !(1..=12).contains(&month) {
                    bail!("fiscal_year_start_month must be between 1 and 12");
                }
                self.fiscal_year_start_month = month;
            }
            "fiscal_year_start_day" => {
                let day = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("fiscal_year_start_day must be a number"))?;
                if !(1..=31).contains(&day) {
                    bail!("fiscal_year_start_day must be between 1 and 31");
                }
                self.fiscal_year_start_day = day;
            }
            "fiscal_year_format" => {
                let wanted = value.trim();
                let canonical = FISCAL_FORMATS
                    .iter()
                    .find(|format| format.eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        anyhow!("fiscal_year_format must be one of: FY-YY, FY-YYYY, FYXX")
                    })?;
                self.fiscal_year_format = (*canonical).to_string();
            }
            "use_quarters" => {
                self.use_quarters = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("use_quarters must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: category_scheme|scheme, reminder_enabled|reminders.enabled, reminder_time|reminders.time, end_of_week_reminder|reminders.end_of_week, export_dir|export.dir, api_port|api.port, fiscal_year_start_month|fiscal.start_month, fiscal_year_start_day|fiscal.start_day, fiscal_year_format|fiscal.format, use_quarters|fiscal.use_quarters"
                );
            }
        }

        if normalized == "export_dir" {
            fs::create_dir_all(&self.export_dir).with_context(|| {
                format!(
                    "Failed to create export directory: {}",
                    self.export_dir.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "scheme_path" => Some(self.scheme_path.display().to_string()),
            "category_scheme" => Some(self.category_scheme.clone()),
            "export_dir" => Some(self.export_dir.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "reminder_enabled" => Some(self.reminder_enabled.to_string()),
            "reminder_time" => Some(self.reminder_time.clone()),
            "end_of_week_reminder" => Some(self.end_of_week_reminder.to_string()),
            "fiscal_year_start_month" => Some(self.fiscal_year_start_month.to_string()),
            "fiscal_year_start_day" => Some(self.fiscal_year_start_day.to_string()),
            "fiscal_year_format" => Some(self.fiscal_year_format.clone()),
            "use_quarters" => Some(self.use_quarters.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "category_scheme" | "scheme" | "scheme.name" => "category_scheme",
        "reminder_enabled" | "reminders.enabled" => "reminder_enabled",
        "reminder_time" | "reminders.time" => "reminder_time",
        "end_of_week_reminder" | "reminders.end_of_week" => "end_of_week_reminder",
        "export_dir" | "export.dir" => "export_dir",
        "api_port" | "api.port" => "api_port",
        "fiscal_year_start_month" | "fiscal.start_month" => "fiscal_year_start_month",
        "fiscal_year_start_day" | "fiscal.start_day" => "fiscal_year_start_day",
        "fiscal_year_format" | "fiscal.format" => "fiscal_year_format",
        "use_quarters" | "fiscal.use_quarters" => "use_quarters",
        "db_path" | "db.path" => "db_path",
        "scheme_path" | "scheme.path" => "scheme_path",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 17:00 (24-hour format)",))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_export_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("UpdateMe")
        .join("reports")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_onboarding_story() {
        let config = Config::default();

        assert_eq!(config.category_scheme, "classic");
        assert_eq!(config.reminder_time, "17:00");
        assert!(config.reminder_enabled);
        assert!(config.end_of_week_reminder);
        assert_eq!(config.fiscal_year_start_month, 1);
        assert_eq!(config.fiscal_year_format, "FY-YY");
        assert!(config.use_quarters);
    }

    #[test]
    fn dotted_aliases_reach_the_same_fields() {
        let mut config = Config::default();

        config.set_value("reminders.time", "09:30").expect("set");
        assert_eq!(config.reminder_time, "09:30");
        assert_eq!(config.get_value("reminder_time").as_deref(), Some("09:30"));

        config.set_value("scheme", "launch").expect("set");
        assert_eq!(config.category_scheme, "launch");
        assert_eq!(config.get_value("scheme.name").as_deref(), Some("launch"));

        config.set_value("fiscal.start_month", "4").expect("set");
        assert_eq!(config.fiscal_year_start_month, 4);

        config.set_value("reminders.end_of_week", "false").expect("set");
        assert!(!config.end_of_week_reminder);
    }

    #[test]
    fn fiscal_format_is_canonicalized() {
        let mut config = Config::default();

        config.set_value("fiscal.format", "fy-yyyy").expect("set");
        assert_eq!(config.fiscal_year_format, "FY-YYYY");

        config.set_value("fiscal.format", "FYXX").expect("set");
        assert_eq!(config.fiscal_year_format, "FYXX");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = Config::default();

        assert!(config.set_value("reminders.time", "25:99").is_err());
        assert!(config.set_value("scheme", "unknown").is_err());
        assert!(config.set_value("fiscal.start_month", "13").is_err());
        assert!(config.set_value("fiscal.start_day", "0").is_err());
        assert!(config.set_value("fiscal.format", "QY").is_err());
        assert!(config.set_value("api.port", "not-a-port").is_err());
        assert!(config.set_value("no_such_key", "1").is_err());
    }

    #[test]
    fn read_only_paths_are_gettable_but_not_settable() {
        let mut config = Config::default();

        assert!(config.get_value("db.path").is_some());
        assert!(config.get_value("scheme.path").is_some());
        assert!(config.set_value("db.path", "/tmp/elsewhere.db").is_err());
    }

    #[test]
    fn export_dir_is_created_on_set() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("reports");
        let mut config = Config::default();

        config
            .set_value("export.dir", &target.display().to_string())
            .expect("set");

        assert_eq!(config.export_dir, target);
        assert!(target.is_dir());
    }
}
