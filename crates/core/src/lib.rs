pub mod config;
pub mod domain;
pub mod errors;
pub mod hierarchy;
pub mod report;

pub use domain::activity::{ActivityIndex, ActivityRecord, DoctorMetric};
pub use domain::employee::{Designation, Employee, EmployeeId, Location, ReportingChain};
pub use domain::policy::{OrgPolicy, OrgPolicyDraft};
pub use errors::{ApplicationError, DomainError, PolicyError};
pub use hierarchy::{
    aggregate, linearize, reconcile, FindingKind, HierarchyFinding, HierarchyNode, RowOrigin,
    WaterfallRow,
};
pub use report::{OrgReport, ReportEngine, ReportPeriod};
