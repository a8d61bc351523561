//! # Form Engine
//!
//! Typed form construction and validation for the catalog maintenance
//! screens: a registry of per-entity form creators, a node tree with
//! sync and debounced async validation, and the creators for offers,
//! inventory transfers, services and service categories.
//!
//! ## Module Organization
//!
//! - **forms**: the engine itself (node tree, validators, registry, lifecycle)
//! - **domain**: form creators for each catalog entity
//! - **io**: backend collaborators the creators call for remote checks
//! - **config**: engine settings loaded from YAML

pub mod config;
pub mod domain;
pub mod forms;
pub mod io;

pub use config::EngineConfig;
pub use domain::register_all_forms;
pub use forms::{
    AbstractControl, ControlStatus, FormArray, FormError, FormFactory, FormGroup, FormModel,
    FormOptions, Lifecycle, TypedFormGroup, ValidationErrors,
};
