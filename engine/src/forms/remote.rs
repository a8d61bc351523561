//! Bridge from remote validation calls to named form errors.
//!
//! A remote check either passes or fails with a [`RemoteFailure`]. Failures
//! that are structured API errors with a known message key become field
//! errors; everything else is escalated as [`FormError::UnmappedRemote`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use super::control::{AbstractControl, AsyncValidationResult, AsyncValidator};
use super::errors::{FormError, RemoteFailure, ValidationErrors};
use crate::io::facades::ServiceCategoryFacade;

pub const NOT_FOUND_PARENT_CATEGORY: &str = "error.service-api.notFoundParentCategory";
pub const INACTIVE_PARENT_CATEGORY: &str = "error.service-api.inactiveParentCategory";
pub const CIRCULAR_CATEGORY_HIERARCHY: &str = "error.service-api.circularServiceCategoryHierarchy";

/// Message key → form error name
#[derive(Debug, Clone, Default)]
pub struct RemoteErrorMap {
    keys: HashMap<String, String>,
}

impl RemoteErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, message_key: &str, error_name: &str) -> Self {
        self.keys
            .insert(message_key.to_string(), error_name.to_string());
        self
    }

    /// Keys the category service answers with when a parent is refused
    pub fn parent_category() -> Self {
        Self::new()
            .map(NOT_FOUND_PARENT_CATEGORY, "parentCategoryInvalid")
            .map(INACTIVE_PARENT_CATEGORY, "parentCategoryInactive")
            .map(CIRCULAR_CATEGORY_HIERARCHY, "parentCategoryCircularHierarchy")
    }

    /// Turn a failure into a field error, or hand it back when the key is
    /// not one this map knows
    pub fn classify(&self, failure: RemoteFailure) -> Result<ValidationErrors, FormError> {
        let error_name = failure
            .message_key()
            .and_then(|key| self.keys.get(key).cloned());
        match error_name {
            Some(name) => {
                debug!("Mapped remote failure to '{}'", name);
                Ok(ValidationErrors::flag(name))
            }
            None => {
                warn!("Remote validation failed with an unrecognized error: {}", failure);
                Err(FormError::UnmappedRemote(failure))
            }
        }
    }
}

/// Async validator backed by a remote check of the control's value.
///
/// The check is only issued when the control is dirty and holds a value, so
/// a form opened on an existing record does not call the backend for data
/// the user has not touched.
pub fn remote_validator<F, Fut>(check: F, errors: RemoteErrorMap) -> AsyncValidator
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RemoteFailure>> + Send + 'static,
{
    let errors = Arc::new(errors);
    Arc::new(move |control: AbstractControl| -> BoxFuture<'static, AsyncValidationResult> {
        let value = control.value();
        if !control.dirty() || value.is_null() {
            return Box::pin(async { AsyncValidationResult::Ok(None) });
        }
        let pending = check(value);
        let errors = errors.clone();
        Box::pin(async move {
            match pending.await {
                Ok(()) => Ok(None),
                Err(failure) => errors.classify(failure).map(Some),
            }
        })
    })
}

/// Code of a reference value: either a `{ code, description }` object or a
/// bare code string
fn reference_code(value: &Value) -> Option<String> {
    match value {
        Value::String(code) if !code.is_empty() => Some(code.clone()),
        Value::Object(fields) => fields
            .get("code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Checks a prospective parent of the category `category_code` with the
/// category service
pub fn parent_category_validator(
    facade: Arc<dyn ServiceCategoryFacade>,
    category_code: Option<String>,
) -> AsyncValidator {
    remote_validator(
        move |value| {
            let facade = facade.clone();
            let category_code = category_code.clone();
            async move {
                match reference_code(&value) {
                    Some(parent_code) => {
                        facade
                            .validate_parent_category(category_code.as_deref(), &parent_code)
                            .await
                    }
                    None => Ok(()),
                }
            }
        },
        RemoteErrorMap::parent_category(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::control::SetValueOptions;
    use crate::forms::lifecycle::Lifecycle;
    use crate::forms::options::{FormContext, FormOptions};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn api_error(message_key: &str) -> RemoteFailure {
        RemoteFailure::Payload(json!({
            "apiVersion": "1.0",
            "error": { "status": 400, "messageKey": message_key }
        }))
    }

    /// Answers every parent check with the configured failure, if any
    struct MockCategoryFacade {
        calls: AtomicUsize,
        failure_key: Mutex<Option<String>>,
    }

    impl MockCategoryFacade {
        fn new(failure_key: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failure_key: Mutex::new(failure_key.map(str::to_string)),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServiceCategoryFacade for MockCategoryFacade {
        async fn validate_parent_category(
            &self,
            _category_code: Option<&str>,
            _parent_code: &str,
        ) -> Result<(), RemoteFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = self.failure_key.lock().unwrap().clone();
            match key {
                Some(key) if key == "transport" => {
                    Err(RemoteFailure::Transport(anyhow::anyhow!("connection reset")))
                }
                Some(key) => Err(api_error(&key)),
                None => Ok(()),
            }
        }

        async fn is_category_assigned(&self, _code: &str) -> Result<bool, RemoteFailure> {
            Ok(false)
        }
    }

    fn context(lifecycle: &Lifecycle) -> FormContext {
        FormOptions::default()
            .with_async_debounce(Duration::from_millis(300))
            .context(lifecycle)
    }

    #[test]
    fn test_classify_known_keys() {
        let map = RemoteErrorMap::parent_category();
        for (key, name) in [
            (NOT_FOUND_PARENT_CATEGORY, "parentCategoryInvalid"),
            (INACTIVE_PARENT_CATEGORY, "parentCategoryInactive"),
            (CIRCULAR_CATEGORY_HIERARCHY, "parentCategoryCircularHierarchy"),
        ] {
            let errors = map.classify(api_error(key)).unwrap();
            assert_eq!(errors.get(name), Some(&json!(true)));
        }
    }

    #[test]
    fn test_classify_rethrows_unknown_failures() {
        let map = RemoteErrorMap::parent_category();
        assert!(matches!(
            map.classify(api_error("error.service-api.somethingElse")),
            Err(FormError::UnmappedRemote(_))
        ));
        assert!(matches!(
            map.classify(RemoteFailure::Payload(json!({"error": {"messageKey": NOT_FOUND_PARENT_CATEGORY}}))),
            Err(FormError::UnmappedRemote(_))
        ));
        assert!(matches!(
            map.classify(RemoteFailure::Transport(anyhow::anyhow!("timeout"))),
            Err(FormError::UnmappedRemote(_))
        ));
    }

    #[test]
    fn test_classify_ignores_incidental_envelope_fields() {
        let map = RemoteErrorMap::parent_category();
        let failure = RemoteFailure::Payload(json!({
            "apiVersion": "1.0",
            "error": {
                "status": "NOT_FOUND",
                "timestamp": 1709288100000u64,
                "uuid": "req-42",
                "messageKey": NOT_FOUND_PARENT_CATEGORY
            }
        }));
        let errors = map.classify(failure).unwrap();
        assert_eq!(errors.get("parentCategoryInvalid"), Some(&json!(true)));
    }

    #[test]
    fn test_reference_code() {
        assert_eq!(reference_code(&json!({"code": "OIL"})), Some("OIL".to_string()));
        assert_eq!(reference_code(&json!("OIL")), Some("OIL".to_string()));
        assert_eq!(reference_code(&json!({"code": ""})), None);
        assert_eq!(reference_code(&Value::Null), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_called_until_dirty() {
        let lifecycle = Lifecycle::new();
        let facade = MockCategoryFacade::new(None);
        let control = AbstractControl::scalar(json!({"code": "OIL"}), &context(&lifecycle));
        control.add_async_validator(parent_category_validator(facade.clone(), None));

        control.set_value(json!({"code": "TIRES"}), SetValueOptions::default());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(facade.calls(), 0);
        assert!(control.valid());

        control.set_value_from_input(Value::Null);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(facade.calls(), 0);

        control.set_value_from_input(json!({"code": "TIRES"}));
        assert!(control.pending());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(facade.calls(), 1);
        assert!(control.valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_becomes_field_error() {
        let lifecycle = Lifecycle::new();
        let facade = MockCategoryFacade::new(Some(CIRCULAR_CATEGORY_HIERARCHY));
        let control = AbstractControl::scalar(Value::Null, &context(&lifecycle));
        control.add_async_validator(parent_category_validator(facade.clone(), Some("CHILD".into())));

        control.set_value_from_input(json!({"code": "PARENT"}));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(control.has_error("parentCategoryCircularHierarchy"));
        assert!(control.invalid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce() {
        let lifecycle = Lifecycle::new();
        let facade = MockCategoryFacade::new(None);
        let control = AbstractControl::scalar(Value::Null, &context(&lifecycle));
        control.add_async_validator(parent_category_validator(facade.clone(), None));

        for code in ["A", "AB", "ABC"] {
            control.set_value_from_input(json!({ "code": code }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(facade.calls(), 1);
        assert!(!control.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_failure_reaches_error_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let lifecycle = Lifecycle::with_error_sink(tx);
        let facade = MockCategoryFacade::new(Some("transport"));
        let control = AbstractControl::scalar(Value::Null, &context(&lifecycle));
        control.add_async_validator(parent_category_validator(facade.clone(), None));

        control.set_value_from_input(json!("PARENT"));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(matches!(rx.try_recv(), Ok(FormError::UnmappedRemote(_))));
        assert!(!control.pending());
        assert!(control.errors().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_validation_after_dispose() {
        let lifecycle = Lifecycle::new();
        let facade = MockCategoryFacade::new(None);
        let control = AbstractControl::scalar(Value::Null, &context(&lifecycle));
        control.add_async_validator(parent_category_validator(facade.clone(), None));

        control.set_value_from_input(json!("PARENT"));
        lifecycle.dispose();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(facade.calls(), 0);

        control.set_value_from_input(json!("OTHER"));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(facade.calls(), 0);
    }
}
