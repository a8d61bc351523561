//! Group view over the node tree: the accessor API creators and screens use.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::ops::Deref;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::array::FormArray;
use super::control::{AbstractControl, AsyncValidator, ControlStatus, SetValueOptions, Validator};
use super::errors::{FormError, RemoteFailure, ValidationErrors};
use super::options::FormContext;

/// A group of named controls
#[derive(Clone, Debug)]
pub struct FormGroup {
    control: AbstractControl,
}

impl FormGroup {
    /// An empty group
    pub fn new(context: &FormContext) -> Self {
        Self {
            control: AbstractControl::group(Vec::new(), context),
        }
    }

    /// One scalar control per top-level property of the serialized model.
    ///
    /// Nested objects and lists start out as plain scalar values; creators
    /// swap them for groups or arrays where the screen needs that.
    pub fn from_model<T: Serialize>(model: &T, context: &FormContext) -> Result<Self, FormError> {
        let value = serde_json::to_value(model)?;
        Self::from_value(value, context)
    }

    pub fn from_value(value: Value, context: &FormContext) -> Result<Self, FormError> {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return Err(FormError::ModelShape("null")),
            Value::Array(_) => return Err(FormError::ModelShape("an array")),
            _ => return Err(FormError::ModelShape("a scalar")),
        };
        let children = fields
            .into_iter()
            .map(|(name, value)| {
                let control = AbstractControl::scalar(value, context);
                (name, control)
            })
            .collect::<Vec<_>>();
        debug!("Built form group with {} controls", children.len());
        Ok(Self {
            control: AbstractControl::group(children, context),
        })
    }

    /// Wrap a node already known to be a group
    pub(crate) fn from_control(control: AbstractControl) -> Self {
        Self { control }
    }

    /// View `control` as a group, if it is one
    pub fn try_from_control(control: AbstractControl) -> Option<Self> {
        control.is_group().then(|| Self { control })
    }

    pub fn as_control(&self) -> &AbstractControl {
        &self.control
    }

    pub fn into_control(self) -> AbstractControl {
        self.control
    }

    pub fn context(&self) -> &FormContext {
        self.control.context()
    }

    /// Attach the model type, for typed access to the raw value
    pub fn typed<T>(self) -> TypedFormGroup<T> {
        TypedFormGroup {
            group: self,
            _model: PhantomData,
        }
    }

    // ----------------------------------------------------------------------
    // Field access
    // ----------------------------------------------------------------------

    pub fn contains(&self, name: &str) -> bool {
        self.control.child(name).is_some()
    }

    pub fn control_names(&self) -> Vec<String> {
        self.control
            .named_children()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    pub fn get_control(&self, name: &str) -> Result<AbstractControl, FormError> {
        self.control
            .child(name)
            .ok_or_else(|| FormError::NoSuchControl(name.to_string()))
    }

    /// Descendant by dotted path, e.g. `storeDiscounts.0.store.code`
    pub fn get(&self, path: &str) -> Option<AbstractControl> {
        self.control.get(path)
    }

    pub fn get_control_value(&self, name: &str) -> Result<Value, FormError> {
        Ok(self.get_control(name)?.value())
    }

    /// The control's value deserialized into `T`
    pub fn get_control_value_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, FormError> {
        Ok(serde_json::from_value(self.get_control_value(name)?)?)
    }

    pub fn set_control_value(
        &self,
        name: &str,
        value: impl Into<Value>,
        options: SetValueOptions,
    ) -> Result<(), FormError> {
        self.get_control(name)?.set_value(value.into(), options);
        Ok(())
    }

    pub fn get_group(&self, name: &str) -> Result<FormGroup, FormError> {
        FormGroup::try_from_control(self.get_control(name)?).ok_or_else(|| {
            FormError::WrongControlKind {
                name: name.to_string(),
                expected: "group",
            }
        })
    }

    pub fn get_array(&self, name: &str) -> Result<FormArray, FormError> {
        FormArray::try_from_control(self.get_control(name)?).ok_or_else(|| {
            FormError::WrongControlKind {
                name: name.to_string(),
                expected: "array",
            }
        })
    }

    /// Raw values of every element of the named array
    pub fn get_array_value(&self, name: &str) -> Result<Vec<Value>, FormError> {
        Ok(self.get_array(name)?.raw_values())
    }

    // ----------------------------------------------------------------------
    // Structure
    // ----------------------------------------------------------------------

    /// Put `control` under `name`. An existing control is replaced in one
    /// step, so anyone holding the old subtree keeps a consistent copy and
    /// anyone reading through the group sees the new one.
    pub fn set_control(&self, name: &str, control: impl Into<AbstractControl>) {
        self.control.insert_child(name, control.into());
    }

    /// Replace the named field with a freshly built array
    pub fn set_array(&self, name: &str, array: FormArray) {
        debug!("Replacing '{}' with an array of {} forms", name, array.len());
        self.set_control(name, array);
    }

    pub fn remove_control(&self, name: &str) -> Result<AbstractControl, FormError> {
        self.control
            .remove_child(name)
            .ok_or_else(|| FormError::NoSuchControl(name.to_string()))
    }

    // ----------------------------------------------------------------------
    // Validation wiring
    // ----------------------------------------------------------------------

    /// Add validators to a field without dropping the ones it already has
    pub fn add_form_control_validators(
        &self,
        name: &str,
        validators: impl IntoIterator<Item = Validator>,
    ) -> Result<(), FormError> {
        self.get_control(name)?.add_validators(validators);
        Ok(())
    }

    pub fn add_async_validator(&self, name: &str, validator: AsyncValidator) -> Result<(), FormError> {
        self.get_control(name)?.add_async_validator(validator);
        Ok(())
    }

    /// Tie fields together so that a change to any of them re-validates all
    pub fn add_form_validation_group(&self, names: &[&str]) -> Result<(), FormError> {
        if names.len() < 2 {
            return Err(FormError::ValidationGroupTooSmall);
        }
        for name in names {
            self.get_control(name)?;
        }
        self.control
            .add_validation_group(names.iter().map(|name| name.to_string()).collect());
        for name in names {
            self.get_control(name)?
                .update_value_and_validity(SetValueOptions::silent());
        }
        Ok(())
    }

    /// Keep a field disabled until `still_in_use` resolves to `false`.
    ///
    /// Used for fields whose edit is allowed only after the server confirms
    /// it is safe (e.g. deactivating something that may still be assigned).
    /// Once enabled the field stays enabled. A failing check leaves the field
    /// disabled and is escalated through the lifecycle.
    pub fn enable_when_cleared(
        &self,
        name: &str,
        still_in_use: BoxFuture<'static, Result<bool, RemoteFailure>>,
    ) -> Result<(), FormError> {
        let control = self.get_control(name)?;
        control.disable();

        let field = name.to_string();
        let lifecycle = control.lifecycle().clone();
        let target = control.clone();
        let spawned = control.lifecycle().spawn(async move {
            match still_in_use.await {
                Ok(false) => {
                    if !lifecycle.is_disposed() {
                        info!("Server cleared '{}'; enabling it", field);
                        target.enable();
                        target.context().notify_change();
                    }
                }
                Ok(true) => debug!("'{}' is still in use; leaving it disabled", field),
                Err(failure) => lifecycle.report(FormError::UnmappedRemote(failure)),
            }
        });
        if !spawned {
            debug!("Business check for '{}' not scheduled; field stays disabled", name);
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Whole-form state
    // ----------------------------------------------------------------------

    pub fn value(&self) -> Value {
        self.control.value()
    }

    pub fn raw_value(&self) -> Value {
        self.control.raw_value()
    }

    pub fn status(&self) -> ControlStatus {
        self.control.status()
    }

    pub fn valid(&self) -> bool {
        self.control.valid()
    }

    pub fn invalid(&self) -> bool {
        self.control.invalid()
    }

    pub fn pending(&self) -> bool {
        self.control.pending()
    }

    pub fn dirty(&self) -> bool {
        self.control.dirty()
    }

    pub fn disabled(&self) -> bool {
        self.control.disabled()
    }

    pub fn errors(&self) -> Option<ValidationErrors> {
        self.control.errors()
    }

    pub fn disable(&self) {
        self.control.disable();
    }

    pub fn enable(&self) {
        self.control.enable();
    }

    pub fn mark_as_pristine(&self) {
        self.control.mark_as_pristine();
    }

    /// Errors of every enabled control, keyed by dotted path. Errors on the
    /// group itself are keyed by the empty string.
    pub fn collect_errors(&self) -> BTreeMap<String, ValidationErrors> {
        let mut errors = BTreeMap::new();
        self.control.collect_errors_into("", &mut errors);
        errors
    }
}

impl From<FormGroup> for AbstractControl {
    fn from(group: FormGroup) -> Self {
        group.control
    }
}

/// A group that knows which model it was built from
#[derive(Debug)]
pub struct TypedFormGroup<T> {
    group: FormGroup,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedFormGroup<T> {
    fn clone(&self) -> Self {
        Self {
            group: self.group.clone(),
            _model: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> TypedFormGroup<T> {
    /// The model as it would be saved: disabled fields included
    pub fn raw_model(&self) -> Result<T, FormError> {
        Ok(serde_json::from_value(self.group.raw_value())?)
    }

    /// The model built from enabled fields only; disabled fields fall back
    /// to their defaults
    pub fn model(&self) -> Result<T, FormError> {
        Ok(serde_json::from_value(self.group.value())?)
    }
}

impl<T> TypedFormGroup<T> {
    pub fn into_inner(self) -> FormGroup {
        self.group
    }
}

impl<T> Deref for TypedFormGroup<T> {
    type Target = FormGroup;

    fn deref(&self) -> &FormGroup {
        &self.group
    }
}
