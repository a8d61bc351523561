//! Service category forms.
//!
//! Categories form a hierarchy. Moving a category under a new parent is
//! checked with the backend while the user edits, so a missing, inactive or
//! circular parent shows up on the field before save.

use shared::{
    AccessMode, PreventativeMaintenanceQualifier, ServiceCategory, ServiceCategoryCarFaxMapping,
    ServiceCategoryMotorInfo,
};
use tracing::debug;

use super::{attach_array, creation_only, default_to_false, disable_fields, lock_for_view, AUDIT_FIELDS};
use crate::forms::remote::parent_category_validator;
use crate::forms::{
    validators, FormError, FormFactory, FormGroup, FormModel, FormOptions, Lifecycle,
};

pub const MAX_MOTOR_ITEM_LENGTH: usize = 100;

impl FormModel for ServiceCategory {
    const TYPE_NAME: &'static str = "ServiceCategory";
}

impl FormModel for ServiceCategoryMotorInfo {
    const TYPE_NAME: &'static str = "ServiceCategoryMotorInfo";
}

impl FormModel for PreventativeMaintenanceQualifier {
    const TYPE_NAME: &'static str = "PreventativeMaintenanceQualifier";
}

impl FormModel for ServiceCategoryCarFaxMapping {
    const TYPE_NAME: &'static str = "ServiceCategoryCarFaxMapping";
}

pub fn register_forms(factory: &FormFactory) {
    factory.register_model(create_service_category_form);
    factory.register_model(create_motor_info_form);
    factory.register_model(create_maintenance_qualifier_form);
    factory.register_model(create_car_fax_mapping_form);
}

pub fn create_service_category_form(
    factory: &FormFactory,
    category: &ServiceCategory,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(category, &options.context(lifecycle))?;

    attach_array(factory, &form, "motorInfo", &category.motor_info, lifecycle, options)?;
    attach_array(
        factory,
        &form,
        "preventativeMaintenanceQualifiers",
        &category.preventative_maintenance_qualifiers,
        lifecycle,
        options,
    )?;
    attach_array(
        factory,
        &form,
        "carFaxMapping",
        &category.car_fax_mapping,
        lifecycle,
        options,
    )?;

    default_to_false(&form, &["active", "supportsECommerce"])?;
    disable_fields(&form, &["id"])?;
    disable_fields(&form, &AUDIT_FIELDS)?;
    creation_only(&form, &["code"], options)?;

    form.add_form_control_validators("code", vec![validators::required()])?;
    form.add_form_control_validators("name", vec![validators::required()])?;

    if options.access_mode == AccessMode::Edit {
        match options.service_category_facade.clone() {
            Some(facade) => {
                form.add_async_validator(
                    "parentCategory",
                    parent_category_validator(facade.clone(), category.code.clone()),
                )?;
                // A category still used by services cannot be deactivated
                if let Some(code) = category.code.clone() {
                    form.enable_when_cleared(
                        "active",
                        Box::pin(async move { facade.is_category_assigned(&code).await }),
                    )?;
                }
            }
            None => debug!("No service category facade; remote checks skipped"),
        }
    }

    lock_for_view(&form, options);
    Ok(form)
}

pub fn create_motor_info_form(
    _factory: &FormFactory,
    motor_info: &ServiceCategoryMotorInfo,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(motor_info, &options.context(lifecycle))?;
    default_to_false(&form, &["primary"])?;
    form.add_form_control_validators(
        "item",
        vec![
            validators::required(),
            validators::max_length(MAX_MOTOR_ITEM_LENGTH),
        ],
    )?;
    lock_for_view(&form, options);
    Ok(form)
}

pub fn create_maintenance_qualifier_form(
    _factory: &FormFactory,
    qualifier: &PreventativeMaintenanceQualifier,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(qualifier, &options.context(lifecycle))?;
    form.add_form_control_validators("qualifierType", vec![validators::required()])?;
    form.add_form_control_validators("qualifierValue", vec![validators::required()])?;
    lock_for_view(&form, options);
    Ok(form)
}

/// CarFax rows are picked from a list, so both fields are read-only
pub fn create_car_fax_mapping_form(
    _factory: &FormFactory,
    mapping: &ServiceCategoryCarFaxMapping,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(mapping, &options.context(lifecycle))?;
    disable_fields(&form, &["id", "name"])?;
    lock_for_view(&form, options);
    Ok(form)
}
