//! Validator library.
//!
//! Every validator is a pure function of the control it is attached to and
//! returns `None` when the value passes. Empty values (null, empty string,
//! empty list) pass everything except [`required`], so optional fields only
//! get checked once the user types something.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::{json, Value};

use super::clock::Clock;
use super::control::{AbstractControl, Validator};
use super::errors::{FormError, ValidationErrors};
use super::group::FormGroup;

/// Unit of measure code counted in whole units
pub const UNIT_EACH: &str = "EACH";

/// Smallest quantity accepted for fractional units
pub const MIN_DECIMAL_QUANTITY: f64 = 0.01;

fn validator<F>(check: F) -> Validator
where
    F: Fn(&AbstractControl) -> Option<ValidationErrors> + Send + Sync + 'static,
{
    Arc::new(check)
}

pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Numeric reading of a value; numeric strings count
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Numeric reading of a non-empty value, or the `error_name` error when it
/// is not a number
fn numeric_or(value: &Value, error_name: &str) -> Result<Option<f64>, ValidationErrors> {
    if is_empty(value) {
        return Ok(None);
    }
    as_number(value)
        .map(Some)
        .ok_or_else(|| ValidationErrors::single(error_name, json!({ "actual": value })))
}

/// Number of digits after the decimal point in the shortest representation
fn fraction_digits(number: f64) -> usize {
    let text = number.to_string();
    match text.find('.') {
        Some(pos) => text[pos + 1..].trim_end_matches('0').len(),
        None => 0,
    }
}

fn below_min(actual: f64, min: f64) -> Option<ValidationErrors> {
    (actual < min).then(|| ValidationErrors::single("min", json!({ "min": min, "actual": actual })))
}

// --------------------------------------------------------------------------
// Standard validators
// --------------------------------------------------------------------------

pub fn required() -> Validator {
    validator(|control| is_empty(&control.value()).then(|| ValidationErrors::flag("required")))
}

pub fn min(min: f64) -> Validator {
    validator(move |control| as_number(&control.value()).and_then(|actual| below_min(actual, min)))
}

pub fn max(max: f64) -> Validator {
    validator(move |control| {
        let actual = as_number(&control.value())?;
        (actual > max).then(|| ValidationErrors::single("max", json!({ "max": max, "actual": actual })))
    })
}

pub fn max_length(max: usize) -> Validator {
    validator(move |control| {
        let length = match control.value() {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            _ => return None,
        };
        (length > max).then(|| {
            ValidationErrors::single(
                "maxlength",
                json!({ "requiredLength": max, "actualLength": length }),
            )
        })
    })
}

/// The whole string must match `pattern`
pub fn pattern(pattern: Regex) -> Validator {
    validator(move |control| {
        let value = control.value();
        let text = value.as_str().filter(|s| !s.is_empty())?;
        let full_match = pattern
            .find(text)
            .map_or(false, |m| m.start() == 0 && m.end() == text.len());
        (!full_match).then(|| {
            ValidationErrors::single(
                "pattern",
                json!({ "requiredPattern": pattern.as_str(), "actualValue": text }),
            )
        })
    })
}

/// All of `validators` as one
pub fn compose(validators: Vec<Validator>) -> Validator {
    validator(move |control| {
        validators
            .iter()
            .fold(None, |acc, v| ValidationErrors::combine(acc, v(control)))
    })
}

// --------------------------------------------------------------------------
// Numeric quantity validators
// --------------------------------------------------------------------------

/// Whole numbers only, optionally bounded below
pub fn integer(min: Option<f64>) -> Validator {
    validator(move |control| {
        let actual = match numeric_or(&control.value(), "invalidInteger") {
            Ok(actual) => actual?,
            Err(errors) => return Some(errors),
        };
        if actual.fract() != 0.0 {
            return Some(ValidationErrors::single(
                "invalidInteger",
                json!({ "actual": actual }),
            ));
        }
        min.and_then(|min| below_min(actual, min))
    })
}

/// Fractions allowed up to `decimal_places` digits, bounded below by `min`
pub fn decimal(min: f64, decimal_places: u32) -> Validator {
    validator(move |control| {
        let actual = match numeric_or(&control.value(), "invalidDecimal") {
            Ok(actual) => actual?,
            Err(errors) => return Some(errors),
        };
        if fraction_digits(actual) > decimal_places as usize {
            return Some(ValidationErrors::single(
                "invalidDecimal",
                json!({ "decimalPlaces": decimal_places, "actual": actual }),
            ));
        }
        below_min(actual, min)
    })
}

/// Quantity rule picked by the unit of measure: whole units of at least 1
/// for `EACH`, otherwise decimals of at least 0.01
pub fn quantity_for_unit(unit_code: Option<&str>, decimal_places: u32) -> Validator {
    match unit_code {
        Some(code) if code.eq_ignore_ascii_case(UNIT_EACH) => integer(Some(1.0)),
        _ => decimal(MIN_DECIMAL_QUANTITY, decimal_places),
    }
}

// --------------------------------------------------------------------------
// Paired fields
// --------------------------------------------------------------------------

fn sibling_value(control: &AbstractControl, name: &str) -> Value {
    control
        .sibling(name)
        .filter(AbstractControl::enabled)
        .map(|sibling| sibling.value())
        .unwrap_or(Value::Null)
}

/// Required when the sibling `other` is empty
pub fn required_if_other_absent(other: &str) -> Validator {
    let other = other.to_string();
    validator(move |control| {
        (is_empty(&control.value()) && is_empty(&sibling_value(control, &other)))
            .then(|| ValidationErrors::flag("oneOfRequired"))
    })
}

/// Must stay empty when the sibling `other` has a value
pub fn only_one_of(other: &str) -> Validator {
    let other = other.to_string();
    validator(move |control| {
        (!is_empty(&control.value()) && !is_empty(&sibling_value(control, &other)))
            .then(|| ValidationErrors::flag("onlyOneRequired"))
    })
}

/// Exactly one of `first` and `second` must be filled in. Both fields get
/// both checks and are tied into a validation group.
pub fn mutually_exclusive_required(
    form: &FormGroup,
    first: &str,
    second: &str,
) -> Result<(), FormError> {
    form.add_form_control_validators(
        first,
        vec![required_if_other_absent(second), only_one_of(second)],
    )?;
    form.add_form_control_validators(
        second,
        vec![required_if_other_absent(first), only_one_of(first)],
    )?;
    form.add_form_validation_group(&[first, second])
}

// --------------------------------------------------------------------------
// Collections and dates
// --------------------------------------------------------------------------

/// The list needs at least `min` elements
pub fn min_length_array(min: usize) -> Validator {
    validator(move |control| {
        let length = match control.value() {
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => return None,
        };
        (length < min).then(|| {
            ValidationErrors::single(
                "minLengthArray",
                json!({ "requiredLength": min, "actualLength": length }),
            )
        })
    })
}

/// `YYYY-MM-DD`, RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS`
fn parse_moment(text: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.naive_local());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok()
}

/// The date must fall strictly after the start of today
pub fn date_after_today(clock: Arc<dyn Clock>) -> Validator {
    validator(move |control| {
        let value = control.value();
        let text = value.as_str().filter(|s| !s.is_empty())?;
        let today = clock.today();
        match parse_moment(text) {
            None => Some(ValidationErrors::single("invalidDate", json!({ "actual": text }))),
            Some(moment) if moment <= today.and_time(NaiveTime::MIN) => {
                Some(ValidationErrors::single(
                    "dateAfter",
                    json!({ "after": today.to_string(), "actual": text }),
                ))
            }
            Some(_) => None,
        }
    })
}
