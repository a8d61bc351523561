//! # Facade Traits
//!
//! Backend calls the form creators need for remote validation and for
//! business-gated fields. Implementations map their transport errors into
//! [`RemoteFailure`]: an error body becomes `Payload`, anything else
//! `Transport`.

use async_trait::async_trait;

use crate::forms::RemoteFailure;

/// Service category checks
#[async_trait]
pub trait ServiceCategoryFacade: Send + Sync {
    /// Ask the backend whether `parent_code` may become the parent of the
    /// category `category_code` (`None` for a category not saved yet).
    ///
    /// Returns `Ok(())` when it may. A refusal comes back as a structured
    /// API error payload whose message key says why.
    async fn validate_parent_category(
        &self,
        category_code: Option<&str>,
        parent_code: &str,
    ) -> Result<(), RemoteFailure>;

    /// Whether any service still references the category
    async fn is_category_assigned(&self, code: &str) -> Result<bool, RemoteFailure>;
}

/// Service checks
#[async_trait]
pub trait ServiceFacade: Send + Sync {
    /// Whether the service is still assigned anywhere
    async fn is_service_assigned(&self, code: &str) -> Result<bool, RemoteFailure>;
}
