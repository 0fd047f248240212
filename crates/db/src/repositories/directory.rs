use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use fieldforce_core::config::DirectoryConfig;
use fieldforce_core::domain::employee::{Designation, Employee, EmployeeId, Location, ReportingChain};

use super::{DirectoryRepository, RepositoryError};

#[derive(Debug, Default, Deserialize)]
struct DirectoryEntry {
    #[serde(default)]
    mr_name: Option<String>,
    #[serde(default)]
    mr_designation: Option<String>,
    #[serde(default)]
    abm_name: Option<String>,
    #[serde(default)]
    rbm_name: Option<String>,
    #[serde(default)]
    sm_name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    mr_region: Option<String>,
    #[serde(default)]
    region_list: Option<RegionList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegionList {
    Many(Vec<String>),
    One(String),
}

impl RegionList {
    fn joined(self) -> String {
        match self {
            Self::Many(regions) => regions.join(", "),
            Self::One(region) => region,
        }
    }
}

/// Document entries in the order they appear, keyed by employee id.
struct OrderedEntries(Vec<(String, DirectoryEntry)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object keyed by employee id")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, entry)) = access.next_entry::<String, DirectoryEntry>()? {
                    entries.push((id, entry));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parses a directory document into employees, keeping document order.
///
/// Rows whose name is listed in `exclude_names` are dropped. Rows with a
/// designation outside mr|abm|rbm|sm are skipped with a warning.
pub fn parse_directory(
    source_name: &str,
    document: &str,
    exclude_names: &[String],
) -> Result<Vec<Employee>, RepositoryError> {
    let OrderedEntries(entries) = serde_json::from_str(document).map_err(|error| {
        RepositoryError::Document { source_name: source_name.to_string(), message: error.to_string() }
    })?;

    let mut employees = Vec::with_capacity(entries.len());
    let mut excluded = 0usize;
    for (id, entry) in entries {
        let name = entry.mr_name.unwrap_or_default();
        if exclude_names.iter().any(|excluded_name| excluded_name == &name) {
            excluded += 1;
            continue;
        }

        let raw_designation = entry.mr_designation.unwrap_or_default();
        let designation = match raw_designation.parse::<Designation>() {
            Ok(designation) => designation,
            Err(error) => {
                warn!(
                    event_name = "directory.row.skipped",
                    source = source_name,
                    emp_id = %id,
                    error = %error,
                    "directory row skipped"
                );
                continue;
            }
        };

        let chain = ReportingChain::new(
            entry.abm_name.unwrap_or_default(),
            entry.rbm_name.unwrap_or_default(),
            entry.sm_name.unwrap_or_default(),
        );
        let location = Location {
            state: entry.state.unwrap_or_default(),
            city: entry.city.unwrap_or_default(),
            hq: entry.mr_region.unwrap_or_default(),
            region_list: entry.region_list.map(RegionList::joined).unwrap_or_default(),
        };
        employees.push(Employee {
            id: EmployeeId(id),
            name,
            designation,
            chain,
            location,
        });
    }

    info!(
        event_name = "directory.loaded",
        source = source_name,
        employees = employees.len(),
        excluded,
        "directory document parsed"
    );
    Ok(employees)
}

/// Reads `<base_dir>/<source>` from the local filesystem.
pub struct JsonFileDirectory {
    base_dir: PathBuf,
    exclude_names: Vec<String>,
}

impl JsonFileDirectory {
    pub fn new(base_dir: impl Into<PathBuf>, exclude_names: Vec<String>) -> Self {
        Self { base_dir: base_dir.into(), exclude_names }
    }
}

#[async_trait::async_trait]
impl DirectoryRepository for JsonFileDirectory {
    async fn load(&self, source: &str) -> Result<Vec<Employee>, RepositoryError> {
        let path = self.base_dir.join(source);
        let document = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| RepositoryError::Io { path: path.clone(), source: error })?;
        parse_directory(source, &document, &self.exclude_names)
    }
}

/// Fetches `<base_url>/<source>` with an optional bearer token.
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
    exclude_names: Vec<String>,
}

impl HttpDirectory {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<SecretString>,
        timeout_secs: u64,
        exclude_names: Vec<String>,
    ) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(Duration::from_secs(timeout_secs.max(1))).build()?;
        Ok(Self { client, base_url: base_url.into(), api_token, exclude_names })
    }

    fn document_url(&self, source: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), source.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl DirectoryRepository for HttpDirectory {
    async fn load(&self, source: &str) -> Result<Vec<Employee>, RepositoryError> {
        let mut request = self.client.get(self.document_url(source));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }
        let document = request.send().await?.error_for_status()?.text().await?;
        parse_directory(source, &document, &self.exclude_names)
    }
}

/// HTTP when a base URL is configured, the local document root otherwise.
pub fn directory_from_config(
    config: &DirectoryConfig,
    exclude_names: &[String],
) -> Result<Box<dyn DirectoryRepository>, RepositoryError> {
    match &config.base_url {
        Some(base_url) => Ok(Box::new(HttpDirectory::new(
            base_url.clone(),
            config.api_token.clone(),
            config.timeout_secs,
            exclude_names.to_vec(),
        )?)),
        None => Ok(Box::new(JsonFileDirectory::new(config.base_dir.clone(), exclude_names.to_vec()))),
    }
}
