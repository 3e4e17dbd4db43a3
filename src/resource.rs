//! Resource Round Trip
//!
//! Ties the mappers to the remote services: configuration in, typed call to
//! the service, configuration state back out. Mapping errors surface before
//! any service call is made, so a rejected configuration never causes a
//! partial write.

use tracing::{info, warn};

use crate::error::Result;
use crate::flatmap::{encode, FlatMap};
use crate::policy::{policy_from_domain, policy_to_domain, CvePolicy};
use crate::service::{CvePolicyService, UserService};
use crate::user::{user_from_domain, user_to_domain};
use crate::value::Value;

/// Resource id of the singleton CVE policy
pub const CVE_POLICY_RESOURCE_ID: &str = "cve_policy";

/// State of a managed resource after a read or write
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    pub id: String,
    pub attributes: Value,
}

impl ResourceState {
    /// Flat dump of the attributes, sorted by key
    pub fn flatten(&self) -> Result<FlatMap> {
        encode(&self.attributes)
    }
}

/// The remote system's single CVE policy as a managed resource
#[derive(Debug)]
pub struct CvePolicyResource<S> {
    service: S,
}

impl<S: CvePolicyService> CvePolicyResource<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    /// Write the configured policy, returning the state re-read from the remote system
    ///
    /// Serves both create and update; the remote write is a whole-policy replace.
    pub fn apply(&mut self, config: &Value) -> Result<ResourceState> {
        let policy = policy_to_domain(config)?;
        let stored = self.service.replace_cve_policy(&policy)?;
        info!(rules = stored.rules.len(), "Applied CVE policy");
        Ok(Self::state(&stored))
    }

    /// Read the current policy
    pub fn read(&self) -> Result<ResourceState> {
        let policy = self.service.read_cve_policy()?;
        Ok(Self::state(&policy))
    }

    /// Reset the remote policy to an empty one
    pub fn destroy(&mut self) -> Result<()> {
        warn!("The CVE policy cannot be deleted; writing an empty policy instead");
        self.service.replace_cve_policy(&CvePolicy::default())?;
        Ok(())
    }

    fn state(policy: &CvePolicy) -> ResourceState {
        ResourceState {
            id: CVE_POLICY_RESOURCE_ID.to_string(),
            attributes: policy_from_domain(policy),
        }
    }
}

/// A remote user account as a managed resource
#[derive(Debug)]
pub struct UserResource<S> {
    service: S,
}

impl<S: UserService> UserResource<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    /// Create the configured user; the state id is the id the remote system assigned
    pub fn create(&mut self, config: &Value) -> Result<ResourceState> {
        let user = user_to_domain(config)?;
        let created = self.service.create_user(&user)?;
        info!(id = %created.id, role = %created.role, "Created user");
        Ok(ResourceState {
            id: created.id.clone(),
            attributes: user_from_domain(&created),
        })
    }

    /// Read a user; `Ok(None)` when it no longer exists remotely
    pub fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        Ok(self.service.read_user(id)?.map(|user| ResourceState {
            id: user.id.clone(),
            attributes: user_from_domain(&user),
        }))
    }

    /// Overwrite an existing user with the configured values
    pub fn update(&mut self, id: &str, config: &Value) -> Result<ResourceState> {
        let mut user = user_to_domain(config)?;
        user.id = id.to_string();
        let updated = self.service.update_user(&user)?;
        info!(id = %updated.id, "Updated user");
        Ok(ResourceState {
            id: updated.id.clone(),
            attributes: user_from_domain(&updated),
        })
    }

    /// Delete the user with this id and configuration
    pub fn delete(&mut self, id: &str, config: &Value) -> Result<()> {
        let mut user = user_to_domain(config)?;
        user.id = id.to_string();
        self.service.delete_user(&user)?;
        info!(id = %id, "Deleted user");
        Ok(())
    }

    /// Whether the user still exists remotely
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.service.read_user(id)?.is_some())
    }
}
