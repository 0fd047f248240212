use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Management level in the field hierarchy, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Designation {
    Mr,
    Abm,
    Rbm,
    Sm,
}

impl Designation {
    pub const ALL: [Designation; 4] =
        [Designation::Mr, Designation::Abm, Designation::Rbm, Designation::Sm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mr => "mr",
            Self::Abm => "abm",
            Self::Rbm => "rbm",
            Self::Sm => "sm",
        }
    }
}

impl fmt::Display for Designation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Designation {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mr" => Ok(Self::Mr),
            "abm" => Ok(Self::Abm),
            "rbm" => Ok(Self::Rbm),
            "sm" => Ok(Self::Sm),
            other => Err(DomainError::UnknownDesignation(other.to_string())),
        }
    }
}

/// Names of the managers an employee reports to, as recorded by the directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingChain {
    pub abm_name: String,
    pub rbm_name: String,
    pub sm_name: String,
}

impl ReportingChain {
    pub fn new(
        abm_name: impl Into<String>,
        rbm_name: impl Into<String>,
        sm_name: impl Into<String>,
    ) -> Self {
        Self { abm_name: abm_name.into(), rbm_name: rbm_name.into(), sm_name: sm_name.into() }
    }

    /// Chain slot for a management level. `None` for `mr`, which has no slot.
    pub fn slot(&self, level: Designation) -> Option<&str> {
        match level {
            Designation::Mr => None,
            Designation::Abm => Some(&self.abm_name),
            Designation::Rbm => Some(&self.rbm_name),
            Designation::Sm => Some(&self.sm_name),
        }
    }

    pub fn slot_mut(&mut self, level: Designation) -> Option<&mut String> {
        match level {
            Designation::Mr => None,
            Designation::Abm => Some(&mut self.abm_name),
            Designation::Rbm => Some(&mut self.rbm_name),
            Designation::Sm => Some(&mut self.sm_name),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub state: String,
    pub city: String,
    pub hq: String,
    pub region_list: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub designation: Designation,
    pub chain: ReportingChain,
    pub location: Location,
}

impl Employee {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        designation: Designation,
        chain: ReportingChain,
    ) -> Self {
        Self {
            id: EmployeeId(id.into()),
            name: name.into(),
            designation,
            chain,
            location: Location::default(),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}
