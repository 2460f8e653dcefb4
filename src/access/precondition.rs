use thiserror::Error;

use crate::database::Document;
use crate::types::Principal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The user with ID {principal_id} has already {what}")]
pub struct PreconditionFailed {
    pub principal_id: String,
    pub what: String,
}

/// Creation check for resources limited to one per owner within a scope.
///
/// `existing` is whatever the handler found for this principal in the scope
/// (e.g. their bootcamp, or their review of one bootcamp). Admins bypass it.
pub fn ensure_single_per_owner(
    principal: &Principal,
    existing: Option<&Document>,
    what: &str,
) -> Result<(), PreconditionFailed> {
    match existing {
        Some(_) if !principal.is_admin() => Err(PreconditionFailed {
            principal_id: principal.id.clone(),
            what: what.to_string(),
        }),
        _ => Ok(()),
    }
}
