//! # Domain Module
//!
//! Form creators for every catalog entity, one module per feature area.
//!
//! Each creator follows the same recipe:
//!
//! 1. Build a base group from the model's own fields
//! 2. Swap every list of sub-entities for a managed array built through the
//!    factory, and nested objects that need their own validation for a group
//! 3. Write `false` into tri-state booleans that came back null
//! 4. Apply enablement: server-managed fields always disabled, creation-only
//!    fields enabled in `add` only, business-gated fields enabled once the
//!    server clears them, and everything disabled in `view`
//! 5. Attach validators and validation groups
//!
//! ## Module Organization
//!
//! - **offer_forms**: Offer, StoreDiscount, Store
//! - **inventory_transfer_forms**: InventoryTransfer, InventoryTransferProduct
//! - **service_forms**: Service, ServiceProduct
//! - **service_category_forms**: ServiceCategory and its motor info,
//!   maintenance qualifier and CarFax mapping rows
//!
//! Call [`register_all_forms`] once while assembling the application, before
//! any screen asks for a form.

use serde_json::Value;
use shared::AccessMode;
use tracing::{debug, info};

use crate::forms::{
    validators, FormArray, FormError, FormFactory, FormGroup, FormModel, FormOptions, Lifecycle,
    SetValueOptions,
};

pub mod inventory_transfer_forms;
pub mod offer_forms;
pub mod service_category_forms;
pub mod service_forms;

/// Audit fields the backend maintains on every entity
pub const AUDIT_FIELDS: [&str; 3] = ["version", "updatedBy", "updatedOn"];

/// Register the creators of every feature module
pub fn register_all_forms(factory: &FormFactory) {
    offer_forms::register_forms(factory);
    inventory_transfer_forms::register_forms(factory);
    service_forms::register_forms(factory);
    service_category_forms::register_forms(factory);
    info!(
        "Registered {} form types",
        factory.registered_types().len()
    );
}

/// Replace the plain list field `name` with a managed array of `T` forms
pub(crate) fn attach_array<T: FormModel>(
    factory: &FormFactory,
    form: &FormGroup,
    name: &str,
    models: &[T],
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormArray, FormError> {
    let array = factory.build_array(models, lifecycle, options)?;
    form.set_array(name, array.clone());
    Ok(array)
}

/// Replace the plain object field `name` with the registered form of `T`
pub(crate) fn attach_group<T: FormModel>(
    factory: &FormFactory,
    form: &FormGroup,
    name: &str,
    model: &T,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let group = factory.build(model, lifecycle, options)?.into_inner();
    form.set_control(name, group.clone());
    Ok(group)
}

pub(crate) fn disable_fields(form: &FormGroup, names: &[&str]) -> Result<(), FormError> {
    for name in names {
        form.get_control(name)?.disable();
    }
    Ok(())
}

/// Tri-state booleans default to `false` when the backend sent nothing
pub(crate) fn default_to_false(form: &FormGroup, names: &[&str]) -> Result<(), FormError> {
    for name in names {
        if form.get_control_value(name)?.is_null() {
            form.set_control_value(name, Value::Bool(false), SetValueOptions::silent())?;
        }
    }
    Ok(())
}

/// Fields that can only be set while the record is being created
pub(crate) fn creation_only(
    form: &FormGroup,
    names: &[&str],
    options: &FormOptions,
) -> Result<(), FormError> {
    if options.access_mode == AccessMode::Add {
        return Ok(());
    }
    debug!("Locking creation-only fields {:?}", names);
    disable_fields(form, names)
}

/// Nothing is editable in view mode
pub(crate) fn lock_for_view(form: &FormGroup, options: &FormOptions) {
    if options.is_view() {
        form.disable();
    }
}

/// Code of the unit of measure on a line, if any
pub(crate) fn unit_code(unit: Option<&shared::Described>) -> Option<&str> {
    unit.and_then(|unit| unit.code.as_deref())
}

/// Quantity validators for a line measured in `unit`
pub(crate) fn quantity_validators(
    unit: Option<&shared::Described>,
    options: &FormOptions,
) -> Vec<crate::forms::Validator> {
    vec![
        validators::required(),
        validators::quantity_for_unit(unit_code(unit), options.decimal_places),
    ]
}
