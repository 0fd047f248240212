use thiserror::Error;

use crate::domain::employee::Designation;

/// Rejection of an organization policy before any processing starts.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("organization policy is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("organization policy must declare a leaf_role")]
    MissingLeafRole,
    #[error("leaf_role `{0}` is not supported (expected mr|abm)")]
    UnsupportedLeafRole(Designation),
    #[error("levels_present must include the leaf role `{0}`")]
    LeafRoleNotPresent(Designation),
    #[error("levels_present includes `{level}` below the leaf role `{leaf}`")]
    LevelBelowLeaf { level: Designation, leaf: Designation },
    #[error("`{field}` must be a finite, non-negative number (got {value})")]
    InvalidExpectation { field: &'static str, value: f64 },
    #[error("expected_camps_per_area_manager must be 0 when area managers are the leaf role")]
    AreaQuotaOnLeaf,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown designation `{0}` (expected mr|abm|rbm|sm)")]
    UnknownDesignation(String),
    #[error("invalid reporting period: {from} is after {to}")]
    InvalidPeriod { from: String, to: String },
    #[error("--org and --all cannot be combined")]
    ConflictingOrgSelection,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("output failure: {0}")]
    Output(String),
}

impl ApplicationError {
    /// Stable class name used in structured command outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Policy(_) => "policy_validation",
            Self::Domain(_) => "invalid_input",
            Self::Persistence(_) => "activity_store",
            Self::Integration(_) => "directory",
            Self::Configuration(_) => "config_validation",
            Self::Output(_) => "output",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Policy(_) | Self::Domain(_) => 3,
            Self::Persistence(_) => 4,
            Self::Integration(_) => 5,
            Self::Output(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::employee::Designation;
    use crate::errors::{ApplicationError, DomainError, PolicyError};

    #[test]
    fn policy_error_maps_to_policy_validation_class() {
        let error = ApplicationError::from(PolicyError::MissingLeafRole);

        assert_eq!(error.error_class(), "policy_validation");
        assert_eq!(error.exit_code(), 3);
        assert_eq!(error.to_string(), "organization policy must declare a leaf_role");
    }

    #[test]
    fn level_below_leaf_message_names_both_levels() {
        let error = PolicyError::LevelBelowLeaf { level: Designation::Mr, leaf: Designation::Abm };

        assert_eq!(error.to_string(), "levels_present includes `mr` below the leaf role `abm`");
    }

    #[test]
    fn collaborator_failures_have_distinct_exit_codes() {
        let persistence = ApplicationError::Persistence("database is locked".to_owned());
        let integration = ApplicationError::Integration("directory returned 503".to_owned());
        let domain = ApplicationError::from(DomainError::UnknownDesignation("vp".to_owned()));

        assert_eq!(persistence.exit_code(), 4);
        assert_eq!(integration.exit_code(), 5);
        assert_eq!(domain.error_class(), "invalid_input");
    }
}
