use crate::error::ConfigError;
use crate::i18n::Language;
use crate::APP_NAME;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const CONFIG_FILE_NAME: &str = "config.json";
const LOG_FILE_NAME: &str = "pastemd.log";
const LEGACY_AUTO_OPEN_KEY: &str = "auto_open_on_no_app";

/// What to do with a generated artifact when no office application is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoAppAction {
    #[default]
    Open,
    Save,
    Clipboard,
    None,
}

impl NoAppAction {
    const ALL: [&'static str; 4] = ["open", "save", "clipboard", "none"];

    /// Open and save always persist the artifact, clipboard only with keep_file.
    pub fn keeps_file(self, keep_file: bool) -> bool {
        match self {
            NoAppAction::Clipboard => keep_file,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlFormatting {
    pub strikethrough_to_del: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for HtmlFormatting {
    fn default() -> Self {
        Self {
            strikethrough_to_del: true,
            extra: Map::new(),
        }
    }
}

/// User preferences, persisted as a flat JSON object.
///
/// Keys this version does not know about are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub hotkey: String,
    pub pandoc_path: String,
    pub reference_docx: Option<String>,
    /// Stored unexpanded, see [`Config::resolved_save_dir`].
    pub save_dir: String,
    pub keep_file: bool,
    pub notify: bool,
    pub enable_excel: bool,
    pub excel_keep_format: bool,
    pub no_app_action: NoAppAction,
    pub md_disable_first_para_indent: bool,
    pub html_disable_first_para_indent: bool,
    pub html_formatting: HtmlFormatting,
    pub move_cursor_to_end: bool,
    pub keep_original_formula: bool,
    pub pandoc_filters: Vec<String>,
    pub temp_dir: Option<String>,
    pub language: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const DEFAULT_PANDOC_PATH: &str = "pandoc";

impl Default for Config {
    fn default() -> Self {
        let save_dir = if cfg!(windows) {
            r"%USERPROFILE%\Documents\pastemd"
        } else {
            "~/Documents/pastemd"
        };

        Self {
            hotkey: "<ctrl>+b".to_string(),
            pandoc_path: DEFAULT_PANDOC_PATH.to_string(),
            reference_docx: None,
            save_dir: save_dir.to_string(),
            keep_file: false,
            notify: true,
            enable_excel: true,
            excel_keep_format: true,
            no_app_action: NoAppAction::Open,
            md_disable_first_para_indent: true,
            html_disable_first_para_indent: true,
            html_formatting: HtmlFormatting::default(),
            move_cursor_to_end: true,
            keep_original_formula: false,
            pandoc_filters: Vec::new(),
            temp_dir: None,
            language: "zh".to_string(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Save directory with environment variables and `~` expanded.
    pub fn resolved_save_dir(&self) -> PathBuf {
        expand_path(&self.save_dir)
    }

    pub fn resolved_temp_dir(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(expand_path)
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language)
    }
}

/// Merge defaults into a raw config object.
///
/// Returns the reconciled object and whether anything had to change.
pub fn reconcile(mut raw: Map<String, Value>) -> (Map<String, Value>, bool) {
    let mut changed = false;

    let defaults = match serde_json::to_value(Config::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if !raw.contains_key("no_app_action") {
        if let Some(auto_open) = raw.get(LEGACY_AUTO_OPEN_KEY).and_then(Value::as_bool) {
            let action = if auto_open { "open" } else { "none" };
            tracing::info!("Migrating legacy {LEGACY_AUTO_OPEN_KEY}={auto_open} to no_app_action={action}");
            raw.insert("no_app_action".to_string(), Value::from(action));
            changed = true;
        }
    }

    for (key, default_value) in &defaults {
        match raw.get_mut(key) {
            None => {
                raw.insert(key.clone(), default_value.clone());
                changed = true;
            }
            Some(existing) if key == "html_formatting" => match existing {
                Value::Object(user_formatting) => {
                    if let Value::Object(default_formatting) = default_value {
                        for (sub_key, sub_default) in default_formatting {
                            if !user_formatting.contains_key(sub_key) {
                                user_formatting.insert(sub_key.clone(), sub_default.clone());
                                changed = true;
                            }
                        }
                    }
                }
                _ => {
                    *existing = default_value.clone();
                    changed = true;
                }
            },
            Some(_) => {}
        }
    }

    let action_is_valid = raw
        .get("no_app_action")
        .and_then(Value::as_str)
        .is_some_and(|action| NoAppAction::ALL.contains(&action));
    if !action_is_valid {
        tracing::warn!(
            "Unknown no_app_action {:?}, resetting to default.",
            raw.get("no_app_action")
        );
        raw.insert("no_app_action".to_string(), Value::from("open"));
        changed = true;
    }

    (raw, changed)
}

/// Per-user data directory: `%APPDATA%\PasteMD` on Windows, `~/.pastemd` elsewhere.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = if cfg!(windows) {
        dirs::config_dir().map(|dir| dir.join(APP_NAME))
    } else {
        dirs::home_dir().map(|home| home.join(".pastemd"))
    };
    dir.ok_or(ConfigError::NoDataDir)
}

pub fn log_path() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join(LOG_FILE_NAME))
}

/// Reads and writes the JSON config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_reconciled().map(|(config, _)| config)
    }

    /// Load the config, back-filling defaults. The file is (re)written only
    /// when it was missing or reconciliation changed it; the flag reports that.
    pub fn load_reconciled(&self) -> Result<(Config, bool), ConfigError> {
        if !self.path.exists() {
            tracing::info!("No config at {}, writing defaults.", self.path.display());
            let config = Config::default();
            self.save(&config)?;
            return Ok((config, true));
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let raw: Value =
            serde_json::from_str(&content).map_err(|source| ConfigError::InvalidJson {
                path: self.path.clone(),
                source,
            })?;
        let Value::Object(raw) = raw else {
            return Err(ConfigError::NotAnObject);
        };

        let (reconciled, changed) = reconcile(raw);
        let config: Config = serde_json::from_value(Value::Object(reconciled)).map_err(
            |source| ConfigError::InvalidJson {
                path: self.path.clone(),
                source,
            },
        )?;

        if changed {
            tracing::info!("Config was missing keys, rewriting {}.", self.path.display());
            self.save(&config)?;
        }

        Ok((config, changed))
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content =
            serde_json::to_string_pretty(config).map_err(|source| ConfigError::InvalidJson {
                path: self.path.clone(),
                source,
            })?;

        fs::write(&self.path, content).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Apply a change and persist it right away.
    pub fn update(
        &self,
        config: &mut Config,
        change: impl FnOnce(&mut Config),
    ) -> Result<(), ConfigError> {
        change(config);
        self.save(config)
    }
}

static PERCENT_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").unwrap());
static DOLLAR_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Expand `%VAR%`, `${VAR}`, `$VAR` and a leading `~`. Unset variables are
/// left as written.
pub fn expand_path(raw: &str) -> PathBuf {
    let lookup = |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str()).to_string();
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|name| std::env::var(name.as_str()).ok())
            .unwrap_or(whole)
    };

    let expanded = PERCENT_VAR.replace_all(raw, lookup);
    let expanded = DOLLAR_VAR.replace_all(&expanded, lookup).into_owned();

    if expanded == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    PathBuf::from(expanded)
}
