use std::collections::HashMap;

use tokio::sync::RwLock;

use fieldforce_core::domain::activity::DoctorMetric;
use fieldforce_core::domain::employee::Employee;
use fieldforce_core::report::ReportPeriod;

use super::{ActivityRepository, DirectoryRepository, RepositoryError};

/// Doctor rows keyed by organization account. The period and prescription
/// key are not applied; callers seed exactly what a query would return.
#[derive(Default)]
pub struct InMemoryActivityRepository {
    metrics: RwLock<HashMap<String, Vec<DoctorMetric>>>,
}

impl InMemoryActivityRepository {
    pub async fn insert(&self, org_id: impl Into<String>, metrics: Vec<DoctorMetric>) {
        let mut all = self.metrics.write().await;
        all.entry(org_id.into()).or_default().extend(metrics);
    }
}

#[async_trait::async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn doctor_metrics(
        &self,
        org_id: &str,
        _prescription_key: Option<&str>,
        _period: ReportPeriod,
    ) -> Result<Vec<DoctorMetric>, RepositoryError> {
        let metrics = self.metrics.read().await;
        Ok(metrics.get(org_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryDirectoryRepository {
    documents: RwLock<HashMap<String, Vec<Employee>>>,
}

impl InMemoryDirectoryRepository {
    pub async fn insert(&self, source: impl Into<String>, employees: Vec<Employee>) {
        let mut documents = self.documents.write().await;
        documents.insert(source.into(), employees);
    }
}

#[async_trait::async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn load(&self, source: &str) -> Result<Vec<Employee>, RepositoryError> {
        let documents = self.documents.read().await;
        documents.get(source).cloned().ok_or_else(|| RepositoryError::Document {
            source_name: source.to_string(),
            message: "no such document".to_string(),
        })
    }
}
