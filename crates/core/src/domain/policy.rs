use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::employee::Designation;
use crate::errors::PolicyError;

/// Per-organization report policy.
///
/// One engine serves every organization; the differences between them
/// (which role does direct camp work, the camp quotas, which levels exist)
/// live here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrgPolicy {
    /// Short key used to select the organization on the command line.
    pub key: String,
    /// Account id of the organization in the activity store.
    pub org_id: String,
    pub display_name: String,
    /// Directory document for the organization, relative to the directory root.
    pub directory_source: String,
    /// Prescription JSON key for rx/strip counts, when the organization records them.
    pub prescription_key: Option<String>,
    pub leaf_role: Designation,
    pub expected_camps_per_leaf: f64,
    /// Quota added once for every area-manager row, real or vacant.
    pub expected_camps_per_area_manager: f64,
    pub levels_present: BTreeSet<Designation>,
}

impl OrgPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.key.trim().is_empty() {
            return Err(PolicyError::MissingField("key"));
        }
        if self.org_id.trim().is_empty() {
            return Err(PolicyError::MissingField("org_id"));
        }
        if !matches!(self.leaf_role, Designation::Mr | Designation::Abm) {
            return Err(PolicyError::UnsupportedLeafRole(self.leaf_role));
        }
        validate_expectation("expected_camps_per_leaf", self.expected_camps_per_leaf)?;
        validate_expectation(
            "expected_camps_per_area_manager",
            self.expected_camps_per_area_manager,
        )?;
        if self.leaf_role == Designation::Abm && self.expected_camps_per_area_manager != 0.0 {
            return Err(PolicyError::AreaQuotaOnLeaf);
        }
        if !self.levels_present.contains(&self.leaf_role) {
            return Err(PolicyError::LeafRoleNotPresent(self.leaf_role));
        }
        if let Some(level) = self.levels_present.iter().find(|level| **level < self.leaf_role) {
            return Err(PolicyError::LevelBelowLeaf { level: *level, leaf: self.leaf_role });
        }
        Ok(())
    }

    pub fn has_level(&self, level: Designation) -> bool {
        self.levels_present.contains(&level)
    }

    pub fn is_leaf(&self, designation: Designation) -> bool {
        designation == self.leaf_role
    }
}

fn validate_expectation(field: &'static str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PolicyError::InvalidExpectation { field, value })
    }
}

/// Unvalidated policy as written in configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrgPolicyDraft {
    pub key: Option<String>,
    pub org_id: Option<String>,
    pub display_name: Option<String>,
    pub directory_source: Option<String>,
    pub prescription_key: Option<String>,
    pub leaf_role: Option<Designation>,
    pub expected_camps_per_leaf: Option<f64>,
    pub expected_camps_per_area_manager: Option<f64>,
    pub levels_present: Option<Vec<Designation>>,
}

impl OrgPolicyDraft {
    pub fn into_policy(self) -> Result<OrgPolicy, PolicyError> {
        let key = self.key.ok_or(PolicyError::MissingField("key"))?;
        let org_id = self.org_id.ok_or(PolicyError::MissingField("org_id"))?;
        let leaf_role = self.leaf_role.ok_or(PolicyError::MissingLeafRole)?;
        let expected_camps_per_leaf =
            self.expected_camps_per_leaf.ok_or(PolicyError::MissingField("expected_camps_per_leaf"))?;

        let levels_present = match self.levels_present {
            Some(levels) => levels.into_iter().collect(),
            None => Designation::ALL.into_iter().filter(|level| *level >= leaf_role).collect(),
        };

        let policy = OrgPolicy {
            display_name: self.display_name.unwrap_or_else(|| key.clone()),
            directory_source: self.directory_source.unwrap_or_else(|| format!("{key}.json")),
            prescription_key: self.prescription_key.filter(|value| !value.trim().is_empty()),
            key,
            org_id,
            leaf_role,
            expected_camps_per_leaf,
            expected_camps_per_area_manager: self.expected_camps_per_area_manager.unwrap_or(0.0),
            levels_present,
        };
        policy.validate()?;
        Ok(policy)
    }
}
