//! CVE policy model and mapping
//!
//! - `model.rs`: typed policy (`CvePolicy` and its parts) in the remote wire shape.
//! - `mapper.rs`: conversion between the typed policy and the configuration value tree.

mod mapper;
mod model;

pub use mapper::{policy_from_domain, policy_to_domain, rule_from_domain, rule_to_domain};
pub use model::{
    Condition, CvePolicy, CveRule, Effect, PolicyRule, Resources, Severity, SeverityRating,
    Vulnerability, CVE_POLICY_ID, CVE_POLICY_TYPE,
};
