//! Inventory transfer forms.
//!
//! The stores on either end are fixed once a transfer exists, and a
//! finalized transfer is read-only.

use shared::{InventoryTransfer, InventoryTransferProduct};
use tracing::debug;

use super::{
    attach_array, creation_only, disable_fields, lock_for_view, quantity_validators, AUDIT_FIELDS,
};
use crate::forms::{
    validators, FormError, FormFactory, FormGroup, FormModel, FormOptions, Lifecycle,
};

impl FormModel for InventoryTransfer {
    const TYPE_NAME: &'static str = "InventoryTransfer";
}

impl FormModel for InventoryTransferProduct {
    const TYPE_NAME: &'static str = "InventoryTransferProduct";
}

pub fn register_forms(factory: &FormFactory) {
    factory.register_model(create_inventory_transfer_form);
    factory.register_model(create_inventory_transfer_product_form);
}

pub fn create_inventory_transfer_form(
    factory: &FormFactory,
    transfer: &InventoryTransfer,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(transfer, &options.context(lifecycle))?;

    let products = attach_array(
        factory,
        &form,
        "products",
        &transfer.products,
        lifecycle,
        options,
    )?;
    products.add_validators(vec![validators::min_length_array(1)]);

    form.add_form_control_validators("fromStore", vec![validators::required()])?;
    form.add_form_control_validators("toStore", vec![validators::required()])?;

    disable_fields(&form, &["id", "status"])?;
    disable_fields(&form, &AUDIT_FIELDS)?;
    creation_only(&form, &["fromStore", "toStore"], options)?;

    if transfer.is_finalized() {
        debug!("Transfer {:?} is finalized; locking the form", transfer.id);
        form.disable();
    }
    lock_for_view(&form, options);
    Ok(form)
}

pub fn create_inventory_transfer_product_form(
    _factory: &FormFactory,
    line: &InventoryTransferProduct,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(line, &options.context(lifecycle))?;

    form.add_form_control_validators("product", vec![validators::required()])?;
    form.add_form_control_validators(
        "quantity",
        quantity_validators(line.unit_of_measure.as_ref(), options),
    )?;
    disable_fields(&form, &["id", "unitOfMeasure"])?;

    lock_for_view(&form, options);
    Ok(form)
}
