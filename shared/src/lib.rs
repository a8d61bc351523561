//! Data shapes shared between the catalog screens and the backend API.
//!
//! Everything in here is plain serde data. Field names serialize in camelCase
//! because that is what the backend speaks, and the form engine uses the same
//! names for its controls.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a screen was opened. Drives default field enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    #[default]
    View,
    Edit,
    Add,
    /// Add a new record pre-filled from an existing one (clone)
    AddLike,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::View => "view",
            AccessMode::Edit => "edit",
            AccessMode::Add => "add",
            AccessMode::AddLike => "add-like",
        }
    }

    /// True for both flavours of creating a new record
    pub fn is_creating(&self) -> bool {
        matches!(self, AccessMode::Add | AccessMode::AddLike)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(AccessMode::View),
            "edit" => Ok(AccessMode::Edit),
            "add" => Ok(AccessMode::Add),
            "add-like" => Ok(AccessMode::AddLike),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}

/// A code/description pair, the shape every lookup value comes back in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Described {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl Described {
    pub fn new(code: &str, description: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            description: Some(description.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// A discount offer handed out to customers for a limited time.
///
/// Exactly one of `days_to_expire` and `expiration_date` should be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Offer {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub days_to_expire: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub store_discounts: Vec<StoreDiscount>,
    pub version: Option<i64>,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

/// Which discount an offer applies at which store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreDiscount {
    pub store: Option<Store>,
    pub discount: Option<Described>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Store {
    pub code: Option<String>,
    pub description: Option<String>,
}

impl Store {
    pub fn new(code: &str, description: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            description: Some(description.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory transfers
// ---------------------------------------------------------------------------

/// Status code of a transfer that can no longer be edited
pub const TRANSFER_STATUS_FINALIZED: &str = "FINALIZED";

/// Movement of products from one store to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryTransfer {
    pub id: Option<i64>,
    pub from_store: Option<Store>,
    pub to_store: Option<Store>,
    pub status: Option<Described>,
    pub carrier: Option<String>,
    pub products: Vec<InventoryTransferProduct>,
    pub version: Option<i64>,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl InventoryTransfer {
    pub fn is_finalized(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.code.as_deref())
            .map_or(false, |code| code == TRANSFER_STATUS_FINALIZED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryTransferProduct {
    pub id: Option<i64>,
    pub product: Option<Described>,
    pub quantity: Option<f64>,
    pub unit_of_measure: Option<Described>,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// A sellable service from the service catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_category: Option<Described>,
    pub active: Option<bool>,
    #[serde(rename = "supportsECommerce")]
    pub supports_e_commerce: Option<bool>,
    pub service_products: Vec<ServiceProduct>,
    pub version: Option<i64>,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

/// Product consumed when a service is performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceProduct {
    pub product_category: Option<Described>,
    pub quantity: Option<f64>,
    pub unit_of_measure: Option<Described>,
}

// ---------------------------------------------------------------------------
// Service categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceCategory {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_category: Option<Described>,
    pub active: Option<bool>,
    #[serde(rename = "supportsECommerce")]
    pub supports_e_commerce: Option<bool>,
    pub motor_info: Vec<ServiceCategoryMotorInfo>,
    pub preventative_maintenance_qualifiers: Vec<PreventativeMaintenanceQualifier>,
    pub car_fax_mapping: Vec<ServiceCategoryCarFaxMapping>,
    pub version: Option<i64>,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

/// Motor (vehicle data provider) item a category maps to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceCategoryMotorInfo {
    pub primary: Option<bool>,
    pub item: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PreventativeMaintenanceQualifier {
    pub qualifier_type: Option<Described>,
    pub qualifier_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceCategoryCarFaxMapping {
    pub id: Option<String>,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Remote error wire shape
// ---------------------------------------------------------------------------

/// Error envelope returned by the backend APIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub api_version: String,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiError {
    pub status: u16,
    pub timestamp: Option<DateTime<Utc>>,
    pub uuid: Option<Uuid>,
    pub path: Option<String>,
    pub message_key: String,
    pub developer_message: Option<String>,
    pub errors: Option<Vec<ApiDetailedError>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiDetailedError {
    pub message_key: String,
    pub developer_message: Option<String>,
    pub message_params: Vec<Value>,
}

/// Whether a failure payload is a structured API error.
///
/// Both `apiVersion` and `error` have to be present (and non-null). Only then
/// is it safe to look at `error.messageKey`.
pub fn is_api_error_response(payload: &Value) -> bool {
    let present = |key: &str| payload.get(key).map_or(false, |v| !v.is_null());
    present("apiVersion") && present("error")
}

/// `error.messageKey` of a structured API error.
///
/// Only the envelope check gates this; the incidental fields (`timestamp`,
/// `uuid`, `status`) are not read, so servers that format them differently
/// still classify.
pub fn api_message_key(payload: &Value) -> Option<&str> {
    if !is_api_error_response(payload) {
        return None;
    }
    payload["error"]["messageKey"].as_str()
}

impl ApiErrorResponse {
    /// Parse a failure payload, gated on [`is_api_error_response`]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !is_api_error_response(payload) {
            return None;
        }
        serde_json::from_value(payload.clone()).ok()
    }

    pub fn message_key(&self) -> &str {
        &self.error.message_key
    }
}

impl fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error.message_key, self.error.status)?;
        if let Some(message) = &self.error.developer_message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_predicate_requires_both_keys() {
        assert!(is_api_error_response(&json!({
            "apiVersion": "1.0",
            "error": { "messageKey": "error.x" }
        })));
        assert!(!is_api_error_response(&json!({ "apiVersion": "1.0" })));
        assert!(!is_api_error_response(&json!({ "error": { "messageKey": "error.x" } })));
        assert!(!is_api_error_response(&json!({ "apiVersion": null, "error": {} })));
        assert!(!is_api_error_response(&json!("boom")));
    }

    #[test]
    fn test_api_error_response_parses_full_payload() {
        let payload = json!({
            "apiVersion": "2.1",
            "error": {
                "status": 400,
                "timestamp": "2024-03-01T10:15:00Z",
                "uuid": "6f1c2a8e-0b5e-4a54-9a38-3f0a2b1d9c11",
                "path": "/service-categories/validate",
                "messageKey": "error.service-api.inactiveParentCategory",
                "developerMessage": "Parent category is inactive",
                "errors": [
                    { "messageKey": "error.detail", "developerMessage": "x", "messageParams": ["OIL"] }
                ]
            }
        });

        let parsed = ApiErrorResponse::from_payload(&payload).expect("structured error");
        assert_eq!(parsed.api_version, "2.1");
        assert_eq!(parsed.message_key(), "error.service-api.inactiveParentCategory");
        assert_eq!(parsed.error.status, 400);
        assert_eq!(parsed.error.errors.as_ref().map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_message_key_read_without_full_parse() {
        let payload = json!({
            "apiVersion": "1.0",
            "error": {
                "status": 404,
                "timestamp": 1709288100000u64,
                "uuid": "req-42",
                "messageKey": "error.service-api.notFoundParentCategory"
            }
        });
        assert!(ApiErrorResponse::from_payload(&payload).is_none());
        assert_eq!(
            api_message_key(&payload),
            Some("error.service-api.notFoundParentCategory")
        );
        assert_eq!(api_message_key(&json!({ "error": { "messageKey": "error.x" } })), None);
    }

    #[test]
    fn test_access_mode_wire_names() {
        assert_eq!(serde_json::to_value(AccessMode::AddLike).unwrap(), json!("add-like"));
        assert_eq!("edit".parse::<AccessMode>().unwrap(), AccessMode::Edit);
        assert!("delete".parse::<AccessMode>().is_err());
        assert!(AccessMode::AddLike.is_creating());
        assert!(!AccessMode::Edit.is_creating());
    }

    #[test]
    fn test_models_serialize_camel_case_with_all_fields() {
        let value = serde_json::to_value(Offer::default()).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("daysToExpire"));
        assert!(object.contains_key("expirationDate"));
        assert!(object.contains_key("storeDiscounts"));

        let service = serde_json::to_value(Service::default()).unwrap();
        assert!(service.get("supportsECommerce").is_some());
    }

    #[test]
    fn test_transfer_finalized() {
        let mut transfer = InventoryTransfer::default();
        assert!(!transfer.is_finalized());
        transfer.status = Some(Described::new(TRANSFER_STATUS_FINALIZED, "Finalized"));
        assert!(transfer.is_finalized());
    }
}
