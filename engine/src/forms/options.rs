//! Options a screen passes when it asks for a form, and the runtime context
//! every node of the resulting tree carries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shared::AccessMode;

use super::clock::{Clock, SystemClock};
use super::lifecycle::Lifecycle;
use crate::config::EngineConfig;
use crate::io::facades::{ServiceCategoryFacade, ServiceFacade};

/// Called after an async validation result lands so the screen can refresh
pub type ChangeDetectionHook = Arc<dyn Fn() + Send + Sync>;

/// Everything a form creator may read.
///
/// The collaborator fields are optional. A creator treats a missing
/// collaborator as "this feature does not apply here", never as an error.
#[derive(Clone)]
pub struct FormOptions {
    pub access_mode: AccessMode,
    pub change_detection: Option<ChangeDetectionHook>,
    pub clock: Arc<dyn Clock>,
    pub async_debounce: Duration,
    /// Fraction digits the decimal quantity validator accepts
    pub decimal_places: u32,
    /// Used by the service category form for parent validation and the
    /// "still assigned" check on deactivation
    pub service_category_facade: Option<Arc<dyn ServiceCategoryFacade>>,
    /// Used by the service form for the "still assigned" check on deactivation
    pub service_facade: Option<Arc<dyn ServiceFacade>>,
}

impl FormOptions {
    pub fn new(access_mode: AccessMode) -> Self {
        Self::from_config(access_mode, &EngineConfig::default())
    }

    pub fn from_config(access_mode: AccessMode, config: &EngineConfig) -> Self {
        Self {
            access_mode,
            change_detection: None,
            clock: Arc::new(SystemClock),
            async_debounce: config.async_debounce(),
            decimal_places: config.decimal_places,
            service_category_facade: None,
            service_facade: None,
        }
    }

    pub fn with_change_detection(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.change_detection = Some(Arc::new(hook));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_async_debounce(mut self, debounce: Duration) -> Self {
        self.async_debounce = debounce;
        self
    }

    pub fn with_service_category_facade(mut self, facade: Arc<dyn ServiceCategoryFacade>) -> Self {
        self.service_category_facade = Some(facade);
        self
    }

    pub fn with_service_facade(mut self, facade: Arc<dyn ServiceFacade>) -> Self {
        self.service_facade = Some(facade);
        self
    }

    pub fn is_view(&self) -> bool {
        self.access_mode == AccessMode::View
    }

    pub fn is_edit(&self) -> bool {
        self.access_mode == AccessMode::Edit
    }

    /// Runtime context for nodes built under `lifecycle` with these options
    pub fn context(&self, lifecycle: &Lifecycle) -> FormContext {
        FormContext {
            lifecycle: lifecycle.clone(),
            async_debounce: self.async_debounce,
            change_detection: self.change_detection.clone(),
        }
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::new(AccessMode::View)
    }
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("access_mode", &self.access_mode)
            .field("change_detection", &self.change_detection.is_some())
            .field("async_debounce", &self.async_debounce)
            .field("decimal_places", &self.decimal_places)
            .field("service_category_facade", &self.service_category_facade.is_some())
            .field("service_facade", &self.service_facade.is_some())
            .finish()
    }
}

/// What a node needs at runtime: the scope it belongs to, how long to
/// debounce async validation and whom to tell when an async result lands.
#[derive(Clone)]
pub struct FormContext {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) async_debounce: Duration,
    pub(crate) change_detection: Option<ChangeDetectionHook>,
}

impl FormContext {
    /// Context with default engine settings
    pub fn new(lifecycle: &Lifecycle) -> Self {
        FormOptions::default().context(lifecycle)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn async_debounce(&self) -> Duration {
        self.async_debounce
    }

    pub(crate) fn notify_change(&self) {
        if let Some(hook) = &self.change_detection {
            hook();
        }
    }
}

impl fmt::Debug for FormContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormContext")
            .field("lifecycle", &self.lifecycle)
            .field("async_debounce", &self.async_debounce)
            .finish()
    }
}
