//! Ownership-based authorization for write paths.
//!
//! `authorize` is a pure decision: admins may act on anything, everyone
//! else only on resources whose owner field holds their id. Creation has no
//! prior owner and is gated by `require_role` plus, where the resource is
//! limited per owner, `precondition::ensure_single_per_owner`.

pub mod precondition;

use std::fmt;

use thiserror::Error;

use crate::database::Document;
use crate::types::{Principal, Role};

pub use precondition::{ensure_single_per_owner, PreconditionFailed};

/// Mutation a principal is attempting on an existing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
    UploadPhoto,
    AddCourse,
    AddReview,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
            Action::UploadPhoto => "upload a photo to",
            Action::AddCourse => "add a course to",
            Action::AddReview => "add a review to",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Anything carrying the id of the principal that created it
pub trait Ownable {
    fn resource_id(&self) -> &str;
    fn owner_id(&self) -> Option<&str>;
}

impl Ownable for Document {
    fn resource_id(&self) -> &str {
        self.id().unwrap_or_default()
    }

    fn owner_id(&self) -> Option<&str> {
        Document::owner_id(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("User {principal_id} is not authorized to {action} {resource_kind} {resource_id}")]
pub struct DenyReason {
    pub principal_id: String,
    pub resource_kind: String,
    pub resource_id: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert to a `Result` so handlers can use `?`
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

pub fn authorize<R: Ownable + ?Sized>(
    principal: &Principal,
    resource_kind: &str,
    resource: &R,
    action: Action,
) -> Decision {
    if principal.is_admin() || resource.owner_id() == Some(principal.id.as_str()) {
        return Decision::Allow;
    }

    tracing::warn!(
        "Denied {} on {} {} for user {}",
        action,
        resource_kind,
        resource.resource_id(),
        principal.id
    );
    Decision::Deny(DenyReason {
        principal_id: principal.id.clone(),
        resource_kind: resource_kind.to_string(),
        resource_id: resource.resource_id().to_string(),
        action,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("User role {role} is not authorized to access this route")]
pub struct RoleDenied {
    pub role: Role,
}

/// Route-level role gate, applied before any resource is loaded
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), RoleDenied> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(RoleDenied { role: principal.role })
    }
}
