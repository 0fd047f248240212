use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::policy::{OrgPolicy, OrgPolicyDraft};
use crate::errors::PolicyError;

pub const DEFAULT_CONFIG_FILE: &str = "fieldforce.toml";
pub const NESTED_CONFIG_FILE: &str = "config/fieldforce.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub directory: DirectoryConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
    pub organizations: Vec<OrgPolicy>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Where employee directory documents are read from.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    pub base_dir: PathBuf,
    /// When set, documents are fetched over HTTP instead of from `base_dir`.
    pub base_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Directory rows with these names are dropped on load.
    pub exclude_names: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub directory_base_dir: Option<PathBuf>,
    pub directory_base_url: Option<String>,
    pub report_output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("organization #{position} ({key}): {source}")]
    Organization { position: usize, key: String, source: PolicyError },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://fieldforce.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            directory: DirectoryConfig {
                base_dir: PathBuf::from("data/directory"),
                base_url: None,
                api_token: None,
                timeout_secs: 30,
            },
            report: ReportConfig {
                output_dir: PathBuf::from("reports"),
                exclude_names: vec!["Training".to_string()],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            organizations: Vec::new(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn organization(&self, key: &str) -> Option<&OrgPolicy> {
        self.organizations.iter().find(|policy| policy.key.eq_ignore_ascii_case(key))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(base_dir) = directory.base_dir {
                self.directory.base_dir = base_dir;
            }
            if let Some(base_url) = directory.base_url {
                self.directory.base_url = Some(base_url);
            }
            if let Some(directory_api_token_value) = directory.api_token {
                self.directory.api_token = Some(secret_value(directory_api_token_value));
            }
            if let Some(timeout_secs) = directory.timeout_secs {
                self.directory.timeout_secs = timeout_secs;
            }
        }

        if let Some(report) = patch.report {
            if let Some(output_dir) = report.output_dir {
                self.report.output_dir = output_dir;
            }
            if let Some(exclude_names) = report.exclude_names {
                self.report.exclude_names = exclude_names;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(organizations) = patch.organizations {
            self.organizations = organizations
                .into_iter()
                .enumerate()
                .map(|(position, draft)| {
                    let key = draft.key.clone().unwrap_or_else(|| "<unnamed>".to_string());
                    draft.into_policy().map_err(|source| ConfigError::Organization {
                        position: position + 1,
                        key,
                        source,
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FIELDFORCE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("FIELDFORCE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("FIELDFORCE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("FIELDFORCE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("FIELDFORCE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FIELDFORCE_DIRECTORY_BASE_DIR") {
            self.directory.base_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("FIELDFORCE_DIRECTORY_BASE_URL") {
            self.directory.base_url = Some(value);
        }
        if let Some(value) = read_env("FIELDFORCE_DIRECTORY_API_TOKEN") {
            self.directory.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("FIELDFORCE_DIRECTORY_TIMEOUT_SECS") {
            self.directory.timeout_secs = parse_u64("FIELDFORCE_DIRECTORY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FIELDFORCE_REPORT_OUTPUT_DIR") {
            self.report.output_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("FIELDFORCE_LOGGING_LEVEL").or_else(|| read_env("FIELDFORCE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FIELDFORCE_LOGGING_FORMAT").or_else(|| read_env("FIELDFORCE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_dir) = overrides.directory_base_dir {
            self.directory.base_dir = base_dir;
        }
        if let Some(base_url) = overrides.directory_base_url {
            self.directory.base_url = Some(base_url);
        }
        if let Some(output_dir) = overrides.report_output_dir {
            self.report.output_dir = output_dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_directory(&self.directory)?;
        validate_organizations(&self.organizations)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &directory.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "directory.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    let empty_token = directory
        .api_token
        .as_ref()
        .map(|token| token.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if empty_token {
        return Err(ConfigError::Validation(
            "directory.api_token must not be empty when set".to_string(),
        ));
    }

    if directory.timeout_secs == 0 || directory.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "directory.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_organizations(organizations: &[OrgPolicy]) -> Result<(), ConfigError> {
    let mut keys = BTreeSet::new();
    for (position, policy) in organizations.iter().enumerate() {
        policy.validate().map_err(|source| ConfigError::Organization {
            position: position + 1,
            key: policy.key.clone(),
            source,
        })?;
        if !keys.insert(policy.key.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "organization key `{}` is declared more than once",
                policy.key
            )));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    directory: Option<DirectoryPatch>,
    report: Option<ReportPatch>,
    logging: Option<LoggingPatch>,
    organizations: Option<Vec<OrgPolicyDraft>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    base_dir: Option<PathBuf>,
    base_url: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    output_dir: Option<PathBuf>,
    exclude_names: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
