//! # Portcullis
//!
//! Flat-map attribute addressing and typed CVE policy mapping for declarative
//! security configuration.
//!
//! Configuration tools store nested resource state as a flat mapping of
//! dotted path keys to text. This crate converts between that flat form and
//! a nested [`Value`] tree, and maps the tree to and from the typed CVE
//! policy a container-security platform accepts over its REST API.
//!
//! ## Features
//!
//! - **Flatmap codec**: [`encode`] and [`decode`] between [`Value`] trees and [`FlatMap`]s
//! - **Policy mapper**: [`policy_to_domain`] and [`policy_from_domain`] for [`CvePolicy`]
//! - **Users**: [`user_to_domain`] and [`user_from_domain`] for remote [`User`] accounts
//! - **Resources**: [`CvePolicyResource`] and [`UserResource`] over the [`service`] traits
//! - **Logging**: `tracing` events throughout, with [`observability`] for subscriber setup
//!
//! ## Quick Start
//!
//! ```ignore
//! use portcullis::{decode, encode, policy_to_domain, FlatMap};
//!
//! let flat = FlatMap::parse_lines(&std::fs::read_to_string("policy.flat")?)?;
//! let tree = decode(&flat)?;
//! let policy = policy_to_domain(&tree)?;
//! println!("{}", policy.to_json()?);
//!
//! assert_eq!(encode(&tree)?, flat);
//! ```

pub mod error;
pub mod flatmap;
pub mod observability;
mod parse;
pub mod policy;
pub mod resource;
pub mod service;
pub mod user;
pub mod value;

// Re-exports
pub use error::{Error, Result};
pub use flatmap::{decode, encode, FlatMap};
pub use policy::{
    policy_from_domain, policy_to_domain, Condition, CvePolicy, CveRule, Effect, PolicyRule,
    Resources, Severity, SeverityRating, Vulnerability,
};
pub use resource::{CvePolicyResource, ResourceState, UserResource};
pub use service::{CvePolicyService, MemoryBackend, UserService};
pub use user::{user_from_domain, user_to_domain, AuthType, User, UserRole};
pub use value::Value;
