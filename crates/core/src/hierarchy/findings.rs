use serde::{Deserialize, Serialize};

use crate::domain::employee::Designation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Rows referencing a manager under a parent other than the one the manager asserts.
    Vacancy,
    /// A referenced manager with no row of its own, seen under several parents.
    AmbiguousHierarchy,
    /// Several directory rows claim the same manager name at one level.
    DuplicateManagerName,
    /// Activity recorded for an id the directory does not know.
    UnmatchedActivity,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vacancy => "vacancy",
            Self::AmbiguousHierarchy => "ambiguous_hierarchy",
            Self::DuplicateManagerName => "duplicate_manager_name",
            Self::UnmatchedActivity => "unmatched_activity",
        }
    }
}

/// Data-quality observation made while building the hierarchy. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyFinding {
    pub kind: FindingKind,
    pub level: Option<Designation>,
    pub name: String,
    pub parents: Vec<String>,
    pub rows_affected: usize,
}

impl HierarchyFinding {
    pub fn describe(&self) -> String {
        let level = self.level.map(Designation::as_str).unwrap_or("-");
        match self.kind {
            FindingKind::Vacancy => format!(
                "{level} `{}` referenced under {} relabelled as vacant on {} row(s)",
                self.name,
                quoted(&self.parents),
                self.rows_affected
            ),
            FindingKind::AmbiguousHierarchy => format!(
                "{level} `{}` has no row of its own and is referenced under {}",
                self.name,
                quoted(&self.parents)
            ),
            FindingKind::DuplicateManagerName => format!(
                "{} {level} rows share the name `{}` (parents: {})",
                self.rows_affected,
                self.name,
                quoted(&self.parents)
            ),
            FindingKind::UnmatchedActivity => {
                format!("activity for unknown employee `{}` was not attributed", self.name)
            }
        }
    }
}

fn quoted(values: &[String]) -> String {
    values.iter().map(|value| format!("`{value}`")).collect::<Vec<_>>().join(", ")
}
