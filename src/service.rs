//! Remote collaborator interfaces
//!
//! The transport that talks to the remote REST API lives outside this crate.
//! It plugs in through these traits, which accept and return typed domain
//! objects only. [`MemoryBackend`] implements both traits in memory.

use chrono::Utc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::policy::{CvePolicy, CVE_POLICY_ID, CVE_POLICY_TYPE};
use crate::user::User;

/// Access to the remote system's single CVE policy
pub trait CvePolicyService {
    /// Read the current policy
    fn read_cve_policy(&self) -> Result<CvePolicy>;

    /// Replace the whole policy and return it as re-read from the remote system
    ///
    /// Idempotent. The policy's id and type are always sent as `"cve"`.
    fn replace_cve_policy(&mut self, policy: &CvePolicy) -> Result<CvePolicy>;
}

/// Access to remote user accounts
pub trait UserService {
    /// Create a user and return it with its assigned id
    fn create_user(&mut self, user: &User) -> Result<User>;

    /// Read a user by id; `Ok(None)` when it does not exist
    fn read_user(&self, id: &str) -> Result<Option<User>>;

    /// Update an existing user
    fn update_user(&mut self, user: &User) -> Result<User>;

    /// Delete a user
    fn delete_user(&mut self, user: &User) -> Result<()>;
}

/// In-memory remote system
///
/// Stamps `modified` on stored policy rules and `last_modified` on users the
/// way the remote system does. User ids are the usernames.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    policy: CvePolicy,
    users: Vec<User>,
}

impl MemoryBackend {
    /// Create a backend holding an empty policy and no users
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding `policy`, stored as-is
    pub fn with_policy(policy: CvePolicy) -> Self {
        Self {
            policy,
            users: Vec::new(),
        }
    }

    /// Consume the backend, returning the stored policy
    pub fn into_policy(self) -> CvePolicy {
        self.policy
    }
}

impl CvePolicyService for MemoryBackend {
    fn read_cve_policy(&self) -> Result<CvePolicy> {
        Ok(self.policy.clone())
    }

    fn replace_cve_policy(&mut self, policy: &CvePolicy) -> Result<CvePolicy> {
        let now = Utc::now();
        let mut stored = policy.clone();
        stored.id = CVE_POLICY_ID.to_string();
        stored.policy_type = CVE_POLICY_TYPE.to_string();
        for rule in &mut stored.rules {
            rule.modified = Some(now);
        }
        debug!(rules = stored.rules.len(), "Stored CVE policy");
        self.policy = stored;
        self.read_cve_policy()
    }
}

impl UserService for MemoryBackend {
    fn create_user(&mut self, user: &User) -> Result<User> {
        if self.users.iter().any(|u| u.username == user.username) {
            return Err(Error::backend(format!(
                "user {:?} already exists",
                user.username
            )));
        }
        let mut stored = user.clone();
        stored.id = user.username.clone();
        stored.last_modified = Some(Utc::now());
        self.users.push(stored.clone());
        Ok(stored)
    }

    fn read_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    fn update_user(&mut self, user: &User) -> Result<User> {
        let existing = self
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| Error::backend(format!("user {:?} does not exist", user.id)))?;
        *existing = User {
            last_modified: Some(Utc::now()),
            ..user.clone()
        };
        Ok(existing.clone())
    }

    fn delete_user(&mut self, user: &User) -> Result<()> {
        let before = self.users.len();
        self.users.retain(|u| u.id != user.id);
        if self.users.len() == before {
            return Err(Error::backend(format!("user {:?} does not exist", user.id)));
        }
        Ok(())
    }
}
