//! # Form Registry
//!
//! Maps a model type name to the function that builds its form. Feature
//! modules register their creators once during application assembly (see
//! `domain::register_all_forms`); screens and other creators then ask the
//! factory for groups and arrays by type name.
//!
//! Creators are stored type-erased: the model travels as JSON between the
//! caller and the creator, so a creator can be looked up by name from code
//! that only knows the model's serialized shape.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::array::FormArray;
use super::errors::FormError;
use super::group::{FormGroup, TypedFormGroup};
use super::lifecycle::Lifecycle;
use super::options::FormOptions;

/// A model with a form registered under a fixed type name
pub trait FormModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
}

type ErasedCreator =
    dyn Fn(&FormFactory, Value, &Lifecycle, &FormOptions) -> Result<FormGroup, FormError> + Send + Sync;

static GLOBAL: Lazy<FormFactory> = Lazy::new(FormFactory::new);

#[derive(Default)]
pub struct FormFactory {
    creators: RwLock<HashMap<String, Arc<ErasedCreator>>>,
}

impl FormFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide factory, for applications that want a single registry
    pub fn global() -> &'static FormFactory {
        &GLOBAL
    }

    /// Store `creator` under `type_name`, replacing any earlier one
    pub fn register<T, F>(&self, type_name: &str, creator: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(&FormFactory, &T, &Lifecycle, &FormOptions) -> Result<FormGroup, FormError>
            + Send
            + Sync
            + 'static,
    {
        let erased: Arc<ErasedCreator> = Arc::new(
            move |factory: &FormFactory, value: Value, lifecycle: &Lifecycle, options: &FormOptions| {
                let model: T = serde_json::from_value(value)?;
                creator(factory, &model, lifecycle, options)
            },
        );
        let previous = self
            .creators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.to_string(), erased);
        if previous.is_some() {
            info!("Replaced form creator for '{}'", type_name);
        } else {
            info!("Registered form creator for '{}'", type_name);
        }
    }

    /// Register under the model's own type name
    pub fn register_model<T, F>(&self, creator: F)
    where
        T: FormModel,
        F: Fn(&FormFactory, &T, &Lifecycle, &FormOptions) -> Result<FormGroup, FormError>
            + Send
            + Sync
            + 'static,
    {
        self.register::<T, F>(T::TYPE_NAME, creator);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn creator(&self, type_name: &str) -> Result<Arc<ErasedCreator>, FormError> {
        let creator = self
            .creators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned();
        creator.ok_or_else(|| {
            error!("No form creator registered for '{}'", type_name);
            FormError::UnregisteredType(type_name.to_string())
        })
    }

    /// Build the form for `model` with the creator registered as `type_name`
    pub fn group<T: Serialize>(
        &self,
        type_name: &str,
        model: &T,
        lifecycle: &Lifecycle,
        options: &FormOptions,
    ) -> Result<FormGroup, FormError> {
        self.group_value(type_name, serde_json::to_value(model)?, lifecycle, options)
    }

    pub fn group_value(
        &self,
        type_name: &str,
        model: Value,
        lifecycle: &Lifecycle,
        options: &FormOptions,
    ) -> Result<FormGroup, FormError> {
        let creator = self.creator(type_name)?;
        debug!("Building '{}' form in {} mode", type_name, options.access_mode);
        creator(self, model, lifecycle, options)
    }

    /// One form per model, in order
    pub fn array<T: Serialize>(
        &self,
        type_name: &str,
        models: &[T],
        lifecycle: &Lifecycle,
        options: &FormOptions,
    ) -> Result<FormArray, FormError> {
        self.creator(type_name)?;
        let groups = models
            .iter()
            .map(|model| self.group(type_name, model, lifecycle, options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FormArray::new(groups, &options.context(lifecycle)))
    }

    pub fn build<T: FormModel>(
        &self,
        model: &T,
        lifecycle: &Lifecycle,
        options: &FormOptions,
    ) -> Result<TypedFormGroup<T>, FormError> {
        Ok(self.group(T::TYPE_NAME, model, lifecycle, options)?.typed())
    }

    pub fn build_array<T: FormModel>(
        &self,
        models: &[T],
        lifecycle: &Lifecycle,
        options: &FormOptions,
    ) -> Result<FormArray, FormError> {
        self.array(T::TYPE_NAME, models, lifecycle, options)
    }
}

impl std::fmt::Debug for FormFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFactory")
            .field("types", &self.registered_types())
            .finish()
    }
}
