//! Service catalog forms.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::{AccessMode, Service, ServiceProduct};
use tracing::debug;

use super::{
    attach_array, creation_only, default_to_false, disable_fields, lock_for_view,
    quantity_validators, AUDIT_FIELDS,
};
use crate::forms::{
    validators, FormError, FormFactory, FormGroup, FormModel, FormOptions, Lifecycle,
};

pub const MAX_SERVICE_CODE_LENGTH: usize = 10;

static SERVICE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("service code pattern is valid"));

impl FormModel for Service {
    const TYPE_NAME: &'static str = "Service";
}

impl FormModel for ServiceProduct {
    const TYPE_NAME: &'static str = "ServiceProduct";
}

pub fn register_forms(factory: &FormFactory) {
    factory.register_model(create_service_form);
    factory.register_model(create_service_product_form);
}

pub fn create_service_form(
    factory: &FormFactory,
    service: &Service,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(service, &options.context(lifecycle))?;

    attach_array(
        factory,
        &form,
        "serviceProducts",
        &service.service_products,
        lifecycle,
        options,
    )?;

    default_to_false(&form, &["active", "supportsECommerce"])?;
    disable_fields(&form, &["id"])?;
    disable_fields(&form, &AUDIT_FIELDS)?;
    creation_only(&form, &["code"], options)?;

    form.add_form_control_validators(
        "code",
        vec![
            validators::required(),
            validators::max_length(MAX_SERVICE_CODE_LENGTH),
            validators::pattern(SERVICE_CODE.clone()),
        ],
    )?;
    form.add_form_control_validators("name", vec![validators::required()])?;
    form.add_form_control_validators("serviceCategory", vec![validators::required()])?;

    // A service still assigned somewhere cannot be deactivated
    if options.access_mode == AccessMode::Edit {
        if let (Some(facade), Some(code)) = (options.service_facade.clone(), service.code.clone()) {
            form.enable_when_cleared(
                "active",
                Box::pin(async move { facade.is_service_assigned(&code).await }),
            )?;
        } else {
            debug!("No service facade or code; 'active' left editable");
        }
    }

    lock_for_view(&form, options);
    Ok(form)
}

pub fn create_service_product_form(
    _factory: &FormFactory,
    product: &ServiceProduct,
    lifecycle: &Lifecycle,
    options: &FormOptions,
) -> Result<FormGroup, FormError> {
    let form = FormGroup::from_model(product, &options.context(lifecycle))?;

    form.add_form_control_validators("productCategory", vec![validators::required()])?;
    form.add_form_control_validators(
        "quantity",
        quantity_validators(product.unit_of_measure.as_ref(), options),
    )?;

    lock_for_view(&form, options);
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{RemoteFailure, SetValueOptions};
    use crate::io::facades::ServiceFacade;
    use async_trait::async_trait;
    use serde_json::json;
    use shared::Described;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockServiceFacade {
        assigned: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ServiceFacade for MockServiceFacade {
        async fn is_service_assigned(&self, _code: &str) -> Result<bool, RemoteFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.assigned)
        }
    }

    fn facade(assigned: bool) -> Arc<MockServiceFacade> {
        Arc::new(MockServiceFacade {
            assigned,
            calls: AtomicUsize::new(0),
        })
    }

    fn factory() -> FormFactory {
        let factory = FormFactory::new();
        register_forms(&factory);
        factory
    }

    fn service() -> Service {
        Service {
            id: Some(5),
            code: Some("OIL-01".to_string()),
            name: Some("Oil change".to_string()),
            service_category: Some(Described::new("MAINT", "Maintenance")),
            active: Some(true),
            service_products: vec![ServiceProduct {
                product_category: Some(Described::new("OIL", "Oil")),
                quantity: Some(5.0),
                unit_of_measure: Some(Described::new("QUART", "Quart")),
            }],
            ..Service::default()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_code_rules() {
        let form = factory()
            .build(&service(), &Lifecycle::new(), &FormOptions::new(AccessMode::Add))
            .unwrap();
        let code = form.get_control("code").unwrap();
        assert!(code.valid());
        assert_eq!(form.get_control_value("supportsECommerce").unwrap(), json!(false));

        code.set_value(json!("OIL 01"), SetValueOptions::default());
        assert!(code.has_error("pattern"));
        code.set_value(json!("OIL-CHANGE-01"), SetValueOptions::default());
        assert!(code.has_error("maxlength"));
        code.set_value(json!(""), SetValueOptions::default());
        assert!(code.has_error("required"));
    }

    #[test]
    fn test_code_is_creation_only() {
        let lifecycle = Lifecycle::new();
        for mode in [AccessMode::Edit, AccessMode::AddLike] {
            let form = factory()
                .build(&service(), &lifecycle, &FormOptions::new(mode))
                .unwrap();
            assert!(form.get_control("code").unwrap().disabled(), "{}", mode);
        }
    }

    #[tokio::test]
    async fn test_active_enabled_once_service_is_unassigned() {
        let facade = facade(false);
        let options = FormOptions::new(AccessMode::Edit).with_service_facade(facade.clone());
        let form = factory()
            .build(&service(), &Lifecycle::new(), &options)
            .unwrap();
        assert!(form.get_control("active").unwrap().disabled());

        settle().await;
        assert_eq!(facade.calls.load(Ordering::SeqCst), 1);
        assert!(form.get_control("active").unwrap().enabled());
    }

    #[tokio::test]
    async fn test_active_stays_locked_while_assigned() {
        let facade = facade(true);
        let options = FormOptions::new(AccessMode::Edit).with_service_facade(facade.clone());
        let form = factory()
            .build(&service(), &Lifecycle::new(), &options)
            .unwrap();

        settle().await;
        assert!(form.get_control("active").unwrap().disabled());
        assert!(form.valid());
    }

    #[tokio::test]
    async fn test_active_not_gated_outside_edit() {
        let facade = facade(true);
        let options = FormOptions::new(AccessMode::Add).with_service_facade(facade.clone());
        let form = factory()
            .build(&service(), &Lifecycle::new(), &options)
            .unwrap();

        settle().await;
        assert_eq!(facade.calls.load(Ordering::SeqCst), 0);
        assert!(form.get_control("active").unwrap().enabled());
    }

    #[test]
    fn test_service_product_quantity() {
        let form = factory()
            .build(&service(), &Lifecycle::new(), &FormOptions::new(AccessMode::Edit))
            .unwrap();
        let quantity = form.get("serviceProducts.0.quantity").unwrap();
        quantity.set_value(json!(0.005), SetValueOptions::default());
        assert!(quantity.has_error("invalidDecimal"));
        quantity.set_value(json!(0.25), SetValueOptions::default());
        assert!(quantity.valid());
    }
}
