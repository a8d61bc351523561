//! Ordered list of form groups, one per element of a model collection.
//!
//! Element `i` always corresponds to model element `i`. When the upstream
//! collection changes identity (a save returned a new list), build a new
//! array and swap it in with [`FormGroup::set_array`] instead of editing
//! elements one by one.

use serde_json::Value;

use super::control::{AbstractControl, ControlStatus, Validator};
use super::errors::ValidationErrors;
use super::group::FormGroup;
use super::options::FormContext;

#[derive(Clone, Debug)]
pub struct FormArray {
    control: AbstractControl,
}

impl FormArray {
    pub fn new(groups: Vec<FormGroup>, context: &FormContext) -> Self {
        let children = groups.into_iter().map(FormGroup::into_control).collect();
        Self {
            control: AbstractControl::array(children, context),
        }
    }

    pub fn try_from_control(control: AbstractControl) -> Option<Self> {
        control.is_array().then(|| Self { control })
    }

    pub fn as_control(&self) -> &AbstractControl {
        &self.control
    }

    pub fn len(&self) -> usize {
        self.control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn at(&self, index: usize) -> Option<FormGroup> {
        self.control
            .child(&index.to_string())
            .map(FormGroup::from_control)
    }

    pub fn groups(&self) -> Vec<FormGroup> {
        self.control
            .children()
            .into_iter()
            .map(FormGroup::from_control)
            .collect()
    }

    pub fn push(&self, group: FormGroup) {
        self.control.array_insert(usize::MAX, group.into_control());
    }

    /// Insert at `index`; past the end appends
    pub fn insert(&self, index: usize, group: FormGroup) {
        self.control.array_insert(index, group.into_control());
    }

    pub fn remove_at(&self, index: usize) -> Option<FormGroup> {
        self.control.array_remove(index).map(FormGroup::from_control)
    }

    pub fn clear(&self) {
        self.control.array_clear();
    }

    pub fn add_validators(&self, validators: impl IntoIterator<Item = Validator>) {
        self.control.add_validators(validators);
    }

    pub fn value(&self) -> Value {
        self.control.value()
    }

    pub fn raw_value(&self) -> Value {
        self.control.raw_value()
    }

    /// Raw value of each element
    pub fn raw_values(&self) -> Vec<Value> {
        self.groups().iter().map(FormGroup::raw_value).collect()
    }

    pub fn status(&self) -> ControlStatus {
        self.control.status()
    }

    pub fn valid(&self) -> bool {
        self.control.valid()
    }

    pub fn dirty(&self) -> bool {
        self.control.dirty()
    }

    pub fn errors(&self) -> Option<ValidationErrors> {
        self.control.errors()
    }

    pub fn has_error(&self, name: &str) -> bool {
        self.control.has_error(name)
    }
}

impl From<FormArray> for AbstractControl {
    fn from(array: FormArray) -> Self {
        array.control
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::lifecycle::Lifecycle;
    use crate::forms::validators;
    use serde_json::json;

    fn row(ctx: &FormContext, code: &str) -> FormGroup {
        FormGroup::from_value(json!({ "code": code }), ctx).unwrap()
    }

    #[test]
    fn test_order_and_index_access() {
        let ctx = FormContext::new(&Lifecycle::new());
        let array = FormArray::new(vec![row(&ctx, "a"), row(&ctx, "b")], &ctx);

        array.push(row(&ctx, "d"));
        array.insert(2, row(&ctx, "c"));
        assert_eq!(
            array.raw_value(),
            json!([{"code": "a"}, {"code": "b"}, {"code": "c"}, {"code": "d"}])
        );

        let removed = array.remove_at(0).unwrap();
        assert_eq!(removed.raw_value(), json!({"code": "a"}));
        assert_eq!(array.at(0).unwrap().raw_value(), json!({"code": "b"}));
        assert!(array.at(3).is_none());
        assert!(array.remove_at(10).is_none());
    }

    #[test]
    fn test_min_length_revalidates_on_structural_change() {
        let ctx = FormContext::new(&Lifecycle::new());
        let array = FormArray::new(Vec::new(), &ctx);
        array.add_validators(vec![validators::min_length_array(1)]);
        assert!(array.has_error("minLengthArray"));

        array.push(row(&ctx, "a"));
        assert!(array.valid());

        array.clear();
        assert!(array.is_empty());
        assert!(array.has_error("minLengthArray"));
    }

    #[test]
    fn test_disabled_elements_are_filtered_from_value() {
        let ctx = FormContext::new(&Lifecycle::new());
        let array = FormArray::new(vec![row(&ctx, "a"), row(&ctx, "b")], &ctx);
        array.at(0).unwrap().disable();

        assert_eq!(array.value(), json!([{"code": "b"}]));
        assert_eq!(array.raw_values().len(), 2);
    }
}
