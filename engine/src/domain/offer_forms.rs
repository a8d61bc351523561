//! Offer maintenance forms.
//!
//! An offer expires either a number of days after it is handed out or on a
//! fixed date, never both, and applies at one or more stores.

use shared::{Offer, Store, StoreDiscount};

use super::{
    attach_array, attach_group, default_to_false, disable_fields, lock_for_view, AUDIT_FIELDS,
};
use crate::forms::{
    validators, FormError, FormFactory, FormGroup, FormModel, FormOptions, Lifecycle,
};

pub const MAX_OFFER_NAME_LENGTH: usize = 100;

impl FormModel for Offer {
    const TYPE_NAME: &'static str = "Offer";
}

impl FormModel for StoreDiscount {
    const TYPE_NAME: &'static str = "StoreDiscount";
}

impl FormModel for Store {
    const TYPE_NAME: &'static str = "Store";
}

pub fn register_forms(factory: &FormFactory) {
    factory.register_model(create_offer_form);
    factory.register_model(create_store_discount_form);
    factory.register_model(create_store_form);
}

pub fn create_offer_form(
    factory: &FormFactory,
    offer: &Offer,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(offer, &options.context(lifecycle))?;

    let discounts = attach_array(
        factory,
        &form,
        "storeDiscounts",
        &offer.store_discounts,
        lifecycle,
        options,
    )?;
    discounts.add_validators(vec![validators::min_length_array(1)]);

    default_to_false(&form, &["active"])?;
    disable_fields(&form, &["id"])?;
    disable_fields(&form, &AUDIT_FIELDS)?;

    form.add_form_control_validators(
        "name",
        vec![
            validators::required(),
            validators::max_length(MAX_OFFER_NAME_LENGTH),
        ],
    )?;
    form.add_form_control_validators("daysToExpire", vec![validators::integer(Some(1.0))])?;
    form.add_form_control_validators(
        "expirationDate",
        vec![validators::date_after_today(options.clock.clone())],
    )?;
    validators::mutually_exclusive_required(&form, "daysToExpire", "expirationDate")?;

    lock_for_view(&form, options);
    Ok(form)
}

pub fn create_store_discount_form(
    factory: &FormFactory,
    discount: &StoreDiscount,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(discount, &options.context(lifecycle))?;

    let store = discount.store.clone().unwrap_or_default();
    attach_group(factory, &form, "store", &store, lifecycle, options)?;
    form.add_form_control_validators("discount", vec![validators::required()])?;

    lock_for_view(&form, options);
    Ok(form)
}

/// A store picked from the store list. The code identifies it; the
/// description is display text the backend fills in.
pub fn create_store_form(
    _factory: &FormFactory,
    store: &Store,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(store, &options.context(lifecycle))?;
    form.add_form_control_validators("code", vec![validators::required()])?;
    lock_for_view(&form, options);
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FixedClock, SetValueOptions};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use shared::{AccessMode, Described};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn options(mode: AccessMode) -> FormOptions {
        FormOptions::new(mode).with_clock(FixedClock(today()))
    }

    fn factory() -> FormFactory {
        let factory = FormFactory::new();
        register_forms(&factory);
        factory
    }

    fn offer() -> Offer {
        Offer {
            id: Some(42),
            name: Some("Spring oil change".to_string()),
            days_to_expire: Some(30),
            store_discounts: vec![StoreDiscount {
                store: Some(Store::new("S001", "Main St")),
                discount: Some(Described::new("TEN", "10% off")),
            }],
            version: Some(3),
            updated_by: Some("jdoe".to_string()),
            ..Offer::default()
        }
    }

    #[test]
    fn test_valid_offer_in_edit_mode() {
        let form = factory()
            .build(&offer(), &Lifecycle::new(), &options(AccessMode::Edit))
            .unwrap();

        assert!(form.valid(), "{:?}", form.collect_errors());
        assert!(form.get_control("id").unwrap().disabled());
        assert!(form.get_control("updatedBy").unwrap().disabled());
        assert_eq!(form.get_control_value("active").unwrap(), json!(false));
        assert!(form.get_array("storeDiscounts").is_ok());
        assert!(form.get("storeDiscounts.0.store.code").is_some());
    }

    #[test]
    fn test_raw_model_keeps_server_fields() {
        let form = factory()
            .build(&offer(), &Lifecycle::new(), &options(AccessMode::Edit))
            .unwrap();

        let saved = form.raw_model().unwrap();
        assert_eq!(saved.id, Some(42));
        assert_eq!(saved.version, Some(3));
        assert_eq!(saved.store_discounts.len(), 1);
        assert_eq!(form.model().unwrap().id, None);
    }

    #[test]
    fn test_expiry_pair() {
        let form = factory()
            .build(&offer(), &Lifecycle::new(), &options(AccessMode::Edit))
            .unwrap();
        let days = form.get_control("daysToExpire").unwrap();
        let date = form.get_control("expirationDate").unwrap();

        date.set_value(json!("2024-06-01"), SetValueOptions::default());
        assert!(days.has_error("onlyOneRequired"));
        assert!(date.has_error("onlyOneRequired"));

        days.set_value(Value::Null, SetValueOptions::default());
        assert!(days.valid());
        assert!(date.valid());

        date.set_value(Value::Null, SetValueOptions::default());
        assert!(days.has_error("oneOfRequired"));
        assert!(date.has_error("oneOfRequired"));
    }

    #[test]
    fn test_expiration_date_must_be_in_the_future() {
        let mut model = offer();
        model.days_to_expire = None;
        model.expiration_date = Some(today());
        let form = factory()
            .build(&model, &Lifecycle::new(), &options(AccessMode::Edit))
            .unwrap();
        assert!(form.get_control("expirationDate").unwrap().has_error("dateAfter"));

        form.set_control_value("expirationDate", "2024-05-11", SetValueOptions::default())
            .unwrap();
        assert!(form.valid());
    }

    #[test]
    fn test_days_to_expire_is_a_positive_integer() {
        let form = factory()
            .build(&offer(), &Lifecycle::new(), &options(AccessMode::Edit))
            .unwrap();
        let days = form.get_control("daysToExpire").unwrap();

        days.set_value(json!(0), SetValueOptions::default());
        assert!(days.has_error("min"));
        days.set_value(json!(2.5), SetValueOptions::default());
        assert!(days.has_error("invalidInteger"));
    }

    #[test]
    fn test_offer_needs_a_store_discount() {
        let mut model = offer();
        model.store_discounts.clear();
        let form = factory()
            .build(&model, &Lifecycle::new(), &options(AccessMode::Add))
            .unwrap();

        let discounts = form.get_array("storeDiscounts").unwrap();
        assert!(discounts.has_error("minLengthArray"));
        assert!(form.invalid());
    }

    #[test]
    fn test_store_discount_requires_store_and_discount() {
        let form = factory()
            .group(
                StoreDiscount::TYPE_NAME,
                &StoreDiscount::default(),
                &Lifecycle::new(),
                &options(AccessMode::Add),
            )
            .unwrap();
        let errors = form.collect_errors();
        assert!(errors["store.code"].contains("required"));
        assert!(errors["discount"].contains("required"));
    }

    #[test]
    fn test_view_mode_locks_everything() {
        let form = factory()
            .build(&offer(), &Lifecycle::new(), &options(AccessMode::View))
            .unwrap();
        assert!(form.disabled());
        assert!(form.collect_errors().is_empty());
        assert_eq!(form.raw_model().unwrap().name, offer().name);
    }
}
