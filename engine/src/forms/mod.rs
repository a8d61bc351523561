//! # Forms Module
//!
//! The form construction and validation engine every catalog screen builds on.
//!
//! A screen asks the [`FormFactory`] for a form for one of its models. The
//! factory looks up the creator registered for the model's type name, the
//! creator builds a [`FormGroup`] from the model, swaps list fields for
//! managed [`FormArray`]s (recursing back into the factory for the element
//! type) and attaches validators according to the [`FormOptions`] it was
//! given. The screen binds the result and disposes the [`Lifecycle`] it passed
//! in when it goes away.
//!
//! ## Module Organization
//!
//! - **control**: the node tree (scalar, group and array nodes), status,
//!   enablement, sync/async validation and value-change listeners
//! - **group** / **array**: typed accessors over group and array nodes
//! - **validators**: the validator library (required, bounds, unit-driven
//!   quantity rules, mutually exclusive pairs, array length, dates)
//! - **remote**: bridge from remote validation calls to named form errors
//! - **registry**: the type name → form creator registry
//! - **lifecycle**: the disposable scope owning listeners and async tasks
//! - **options**: per-screen options and the runtime context handed to nodes
//! - **clock**: "today" for date validators
//! - **errors**: `FormError` and the `ValidationErrors` map
//!
//! ## Validation model
//!
//! - Sync validators run on construction, on every value write, when
//!   validators are added and when a node is re-enabled
//! - Async validators only run once the sync validators pass; they are
//!   debounced and the newest run wins
//! - Disabled nodes carry no errors and are skipped by their parent's status
//!   and filtered value, but stay in the raw value

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod array;
pub mod clock;
pub mod control;
pub mod errors;
pub mod group;
pub mod lifecycle;
pub mod options;
pub mod registry;
pub mod remote;
pub mod validators;

pub use array::FormArray;
pub use clock::{Clock, FixedClock, SystemClock};
pub use control::{
    AbstractControl, AsyncValidator, ControlStatus, SetValueOptions, Validator,
};
pub use errors::{FormError, RemoteFailure, ValidationErrors};
pub use group::{FormGroup, TypedFormGroup};
pub use lifecycle::Lifecycle;
pub use options::{ChangeDetectionHook, FormContext, FormOptions};
pub use registry::{FormFactory, FormModel};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
