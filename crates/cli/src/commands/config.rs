use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fieldforce_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigFile {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl ConfigFile {
    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        field_source(key_path, env_keys, self.doc.as_ref(), self.path.as_deref())
    }
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file = ConfigFile {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        file.source("database.url", &["FIELDFORCE_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        file.source("database.max_connections", &["FIELDFORCE_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        file.source("database.timeout_secs", &["FIELDFORCE_DATABASE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "directory.base_dir",
        &config.directory.base_dir.display().to_string(),
        file.source("directory.base_dir", &["FIELDFORCE_DIRECTORY_BASE_DIR"]),
    ));
    lines.push(render_line(
        "directory.base_url",
        config.directory.base_url.as_deref().unwrap_or("<unset>"),
        file.source("directory.base_url", &["FIELDFORCE_DIRECTORY_BASE_URL"]),
    ));
    let api_token = config
        .directory
        .api_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line(
        "directory.api_token",
        &api_token,
        file.source("directory.api_token", &["FIELDFORCE_DIRECTORY_API_TOKEN"]),
    ));
    lines.push(render_line(
        "directory.timeout_secs",
        &config.directory.timeout_secs.to_string(),
        file.source("directory.timeout_secs", &["FIELDFORCE_DIRECTORY_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "report.output_dir",
        &config.report.output_dir.display().to_string(),
        file.source("report.output_dir", &["FIELDFORCE_REPORT_OUTPUT_DIR"]),
    ));
    lines.push(render_line(
        "report.exclude_names",
        &config.report.exclude_names.join(", "),
        file.source("report.exclude_names", &[]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        file.source("logging.level", &["FIELDFORCE_LOGGING_LEVEL", "FIELDFORCE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        file.source("logging.format", &["FIELDFORCE_LOGGING_FORMAT", "FIELDFORCE_LOG_FORMAT"]),
    ));

    for policy in &config.organizations {
        let levels =
            policy.levels_present.iter().map(|level| level.as_str()).collect::<Vec<_>>().join("|");
        lines.push(format!(
            "- organizations.{} = org_id {}, leaf {}, levels {}, expected {}/leaf + {}/area manager, directory {} (source: {})",
            policy.key,
            policy.org_id,
            policy.leaf_role,
            levels,
            policy.expected_camps_per_leaf,
            policy.expected_camps_per_area_manager,
            policy.directory_source,
            file.source("organizations", &[]),
        ));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
