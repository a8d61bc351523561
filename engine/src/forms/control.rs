//! The form node tree.
//!
//! Every node is an [`AbstractControl`]: a cheap, cloneable handle to shared
//! state. A node is one of
//!
//! - a scalar control holding a JSON value,
//! - a group of named child nodes,
//! - an array of child nodes (in practice always groups, one per model element).
//!
//! Each node owns its validators, its last validation result, its enabled and
//! dirty flags and its value-change listeners. Parents are held weakly so a
//! replaced subtree is dropped as soon as nobody references it.
//!
//! Locks are never held while calling out to validators, listeners or other
//! nodes; validators routinely read sibling values through the parent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::errors::{FormError, ValidationErrors};
use super::lifecycle::Lifecycle;
use super::lock;
use super::options::FormContext;

/// Synchronous validator: inspects a control, returns its errors if any
pub type Validator = Arc<dyn Fn(&AbstractControl) -> Option<ValidationErrors> + Send + Sync>;

pub type AsyncValidationResult = Result<Option<ValidationErrors>, FormError>;

/// Asynchronous validator. An `Err` means the failure could not be turned
/// into field errors and has to be escalated.
pub type AsyncValidator =
    Arc<dyn Fn(AbstractControl) -> BoxFuture<'static, AsyncValidationResult> + Send + Sync>;

type ValueListener = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlStatus {
    Valid,
    Invalid,
    /// An async validator is still running
    Pending,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetValueOptions {
    /// Notify value-change listeners and re-validate validation-group peers.
    /// The control's own validators run either way.
    pub emit_event: bool,
}

impl SetValueOptions {
    /// Write without notifying anyone; used when seeding values
    /// programmatically
    pub fn silent() -> Self {
        Self { emit_event: false }
    }
}

impl Default for SetValueOptions {
    fn default() -> Self {
        Self { emit_event: true }
    }
}

#[derive(Clone)]
enum ControlKind {
    Scalar(Value),
    Group(Vec<(String, AbstractControl)>),
    Array(Vec<AbstractControl>),
}

struct ControlState {
    kind: ControlKind,
    validators: Vec<Validator>,
    async_validators: Vec<AsyncValidator>,
    listeners: Vec<ValueListener>,
    /// Sets of child names validated together (groups only)
    validation_groups: Vec<Vec<String>>,
    errors: Option<ValidationErrors>,
    disabled: bool,
    dirty: bool,
    pending: bool,
    /// Bumped on every validation run; async results from older runs are dropped
    async_generation: u64,
}

impl ControlState {
    fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            validators: Vec::new(),
            async_validators: Vec::new(),
            listeners: Vec::new(),
            validation_groups: Vec::new(),
            errors: None,
            disabled: false,
            dirty: false,
            pending: false,
            async_generation: 0,
        }
    }
}

struct ControlInner {
    state: Mutex<ControlState>,
    parent: Mutex<Weak<ControlInner>>,
    context: FormContext,
}

#[derive(Clone)]
pub struct AbstractControl {
    inner: Arc<ControlInner>,
}

impl AbstractControl {
    /// A scalar control holding `value`
    pub fn scalar(value: Value, context: &FormContext) -> Self {
        Self::with_kind(ControlKind::Scalar(value), context)
    }

    pub(crate) fn group(children: Vec<(String, AbstractControl)>, context: &FormContext) -> Self {
        Self::with_kind(ControlKind::Group(children), context)
    }

    pub(crate) fn array(children: Vec<AbstractControl>, context: &FormContext) -> Self {
        Self::with_kind(ControlKind::Array(children), context)
    }

    fn with_kind(kind: ControlKind, context: &FormContext) -> Self {
        let control = Self {
            inner: Arc::new(ControlInner {
                state: Mutex::new(ControlState::new(kind)),
                parent: Mutex::new(Weak::new()),
                context: context.clone(),
            }),
        };
        for child in control.children() {
            child.set_parent(Some(&control));
        }
        control.run_validation();
        control
    }

    fn state(&self) -> MutexGuard<'_, ControlState> {
        lock(&self.inner.state)
    }

    fn kind(&self) -> ControlKind {
        self.state().kind.clone()
    }

    pub fn kind_name(&self) -> &'static str {
        match self.state().kind {
            ControlKind::Scalar(_) => "control",
            ControlKind::Group(_) => "group",
            ControlKind::Array(_) => "array",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.state().kind, ControlKind::Scalar(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.state().kind, ControlKind::Group(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.state().kind, ControlKind::Array(_))
    }

    pub fn context(&self) -> &FormContext {
        &self.inner.context
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.inner.context.lifecycle
    }

    /// Same node, not just an equal one
    pub fn ptr_eq(&self, other: &AbstractControl) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ----------------------------------------------------------------------
    // Tree navigation
    // ----------------------------------------------------------------------

    pub fn parent(&self) -> Option<AbstractControl> {
        lock(&self.inner.parent)
            .upgrade()
            .map(|inner| AbstractControl { inner })
    }

    fn set_parent(&self, parent: Option<&AbstractControl>) {
        *lock(&self.inner.parent) = parent.map_or_else(Weak::new, |p| Arc::downgrade(&p.inner));
    }

    pub fn root(&self) -> AbstractControl {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub(crate) fn children(&self) -> Vec<AbstractControl> {
        match &self.state().kind {
            ControlKind::Scalar(_) => Vec::new(),
            ControlKind::Group(children) => children.iter().map(|(_, c)| c.clone()).collect(),
            ControlKind::Array(children) => children.clone(),
        }
    }

    /// Children with their names; array elements are named by index
    pub(crate) fn named_children(&self) -> Vec<(String, AbstractControl)> {
        match &self.state().kind {
            ControlKind::Scalar(_) => Vec::new(),
            ControlKind::Group(children) => children.clone(),
            ControlKind::Array(children) => children
                .iter()
                .enumerate()
                .map(|(index, c)| (index.to_string(), c.clone()))
                .collect(),
        }
    }

    /// Direct child by name (groups) or index (arrays)
    pub fn child(&self, name: &str) -> Option<AbstractControl> {
        match &self.state().kind {
            ControlKind::Scalar(_) => None,
            ControlKind::Group(children) => children
                .iter()
                .find(|(child_name, _)| child_name == name)
                .map(|(_, c)| c.clone()),
            ControlKind::Array(children) => name
                .parse::<usize>()
                .ok()
                .and_then(|index| children.get(index).cloned()),
        }
    }

    /// Descendant by dotted path, e.g. `storeDiscounts.0.store.code`
    pub fn get(&self, path: &str) -> Option<AbstractControl> {
        path.split('.')
            .try_fold(self.clone(), |control, segment| control.child(segment))
    }

    /// Another child of this control's parent
    pub fn sibling(&self, name: &str) -> Option<AbstractControl> {
        self.parent()?.child(name)
    }

    fn name_in(&self, parent: &AbstractControl) -> Option<String> {
        parent
            .named_children()
            .into_iter()
            .find(|(_, child)| child.ptr_eq(self))
            .map(|(name, _)| name)
    }

    // ----------------------------------------------------------------------
    // Values
    // ----------------------------------------------------------------------

    /// Value of the enabled part of the tree
    pub fn value(&self) -> Value {
        match self.kind() {
            ControlKind::Scalar(value) => value,
            ControlKind::Group(children) => Value::Object(
                children
                    .into_iter()
                    .filter(|(_, child)| child.enabled())
                    .map(|(name, child)| (name, child.value()))
                    .collect::<Map<String, Value>>(),
            ),
            ControlKind::Array(children) => Value::Array(
                children
                    .iter()
                    .filter(|child| child.enabled())
                    .map(AbstractControl::value)
                    .collect(),
            ),
        }
    }

    /// Value of the whole tree, disabled nodes included
    pub fn raw_value(&self) -> Value {
        match self.kind() {
            ControlKind::Scalar(value) => value,
            ControlKind::Group(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(name, child)| (name, child.raw_value()))
                    .collect::<Map<String, Value>>(),
            ),
            ControlKind::Array(children) => {
                Value::Array(children.iter().map(AbstractControl::raw_value).collect())
            }
        }
    }

    /// Write a value and re-validate.
    ///
    /// Groups take an object and update the children it names; arrays take a
    /// list and update elements by position. Neither adds nor removes children.
    pub fn set_value(&self, value: Value, options: SetValueOptions) {
        self.write(value);
        self.validate_descendants(options.emit_event);
        self.update_value_and_validity(options);
    }

    /// A user edit: marks the control dirty, then writes and notifies
    pub fn set_value_from_input(&self, value: Value) {
        self.mark_as_dirty();
        self.set_value(value, SetValueOptions::default());
    }

    fn write(&self, value: Value) {
        match self.kind() {
            ControlKind::Scalar(_) => {
                if let ControlKind::Scalar(current) = &mut self.state().kind {
                    *current = value;
                }
            }
            ControlKind::Group(children) => {
                if let Value::Object(mut values) = value {
                    for (name, child) in children {
                        if let Some(child_value) = values.remove(&name) {
                            child.write(child_value);
                        }
                    }
                }
            }
            ControlKind::Array(children) => {
                if let Value::Array(values) = value {
                    for (child, child_value) in children.iter().zip(values) {
                        child.write(child_value);
                    }
                }
            }
        }
    }

    // ----------------------------------------------------------------------
    // Status
    // ----------------------------------------------------------------------

    pub fn errors(&self) -> Option<ValidationErrors> {
        self.state().errors.clone()
    }

    pub fn has_error(&self, name: &str) -> bool {
        self.state()
            .errors
            .as_ref()
            .map_or(false, |errors| errors.contains(name))
    }

    pub fn status(&self) -> ControlStatus {
        let (disabled, has_errors, mut pending) = {
            let state = self.state();
            (state.disabled, state.errors.is_some(), state.pending)
        };
        if disabled {
            return ControlStatus::Disabled;
        }
        if has_errors {
            return ControlStatus::Invalid;
        }
        for child in self.children() {
            match child.status() {
                ControlStatus::Invalid => return ControlStatus::Invalid,
                ControlStatus::Pending => pending = true,
                ControlStatus::Valid | ControlStatus::Disabled => {}
            }
        }
        if pending {
            ControlStatus::Pending
        } else {
            ControlStatus::Valid
        }
    }

    pub fn valid(&self) -> bool {
        self.status() == ControlStatus::Valid
    }

    pub fn invalid(&self) -> bool {
        self.status() == ControlStatus::Invalid
    }

    pub fn pending(&self) -> bool {
        self.status() == ControlStatus::Pending
    }

    pub fn disabled(&self) -> bool {
        self.state().disabled
    }

    pub fn enabled(&self) -> bool {
        !self.disabled()
    }

    /// Dirty if this node or any descendant was edited by the user
    pub fn dirty(&self) -> bool {
        if self.state().dirty {
            return true;
        }
        self.children().iter().any(AbstractControl::dirty)
    }

    pub fn pristine(&self) -> bool {
        !self.dirty()
    }

    pub fn mark_as_dirty(&self) {
        self.state().dirty = true;
    }

    pub fn mark_as_pristine(&self) {
        self.state().dirty = false;
        for child in self.children() {
            child.mark_as_pristine();
        }
    }

    // ----------------------------------------------------------------------
    // Enablement
    // ----------------------------------------------------------------------

    /// Disable this node and everything below it. Values are kept.
    pub fn disable(&self) {
        self.set_disabled(true);
        self.revalidate_group_peers();
        if let Some(parent) = self.parent() {
            parent.update_value_and_validity(SetValueOptions::default());
        }
    }

    /// Enable this node and everything below it, re-validating the subtree
    pub fn enable(&self) {
        self.set_disabled(false);
        self.validate_descendants(false);
        self.revalidate_group_peers();
        self.update_value_and_validity(SetValueOptions::silent());
    }

    fn set_disabled(&self, disabled: bool) {
        {
            let mut state = self.state();
            state.disabled = disabled;
            if disabled {
                state.errors = None;
                state.pending = false;
                state.async_generation += 1;
            }
        }
        for child in self.children() {
            child.set_disabled(disabled);
        }
    }

    // ----------------------------------------------------------------------
    // Validators and listeners
    // ----------------------------------------------------------------------

    /// Append validators, keeping the ones already attached, and re-validate
    pub fn add_validators(&self, validators: impl IntoIterator<Item = Validator>) {
        self.state().validators.extend(validators);
        self.update_value_and_validity(SetValueOptions::silent());
    }

    /// Replace all validators and re-validate
    pub fn set_validators(&self, validators: impl IntoIterator<Item = Validator>) {
        self.state().validators = validators.into_iter().collect();
        self.update_value_and_validity(SetValueOptions::silent());
    }

    pub fn clear_validators(&self) {
        self.set_validators(Vec::new());
    }

    pub fn has_validators(&self) -> bool {
        !self.state().validators.is_empty()
    }

    /// Attach an async validator. It first runs on the next value change.
    pub fn add_async_validator(&self, validator: AsyncValidator) {
        self.state().async_validators.push(validator);
    }

    /// Call `listener` with the control's value after every emitting change.
    /// Released with the lifecycle.
    pub fn on_value_change(&self, listener: impl Fn(&Value) + Send + Sync + 'static) {
        if self.lifecycle().is_disposed() {
            debug!("Ignoring value-change listener on a disposed form");
            return;
        }
        self.state().listeners.push(Arc::new(listener));
    }

    pub(crate) fn add_validation_group(&self, names: Vec<String>) {
        self.state().validation_groups.push(names);
    }

    // ----------------------------------------------------------------------
    // Validation
    // ----------------------------------------------------------------------

    /// Re-run this node's validators, then notify and walk up to the root
    pub fn update_value_and_validity(&self, options: SetValueOptions) {
        if self.lifecycle().is_disposed() {
            return;
        }
        self.run_validation();
        if options.emit_event {
            self.notify_listeners();
            self.revalidate_group_peers();
        }
        if let Some(parent) = self.parent() {
            parent.update_value_and_validity(options);
        }
    }

    fn validate_descendants(&self, emit_event: bool) {
        for child in self.children() {
            child.validate_descendants(emit_event);
            child.run_validation();
            if emit_event {
                child.notify_listeners();
            }
        }
    }

    /// Run this node's own validators only
    fn run_validation(&self) {
        if self.lifecycle().is_disposed() {
            return;
        }
        let (disabled, validators, async_validators) = {
            let state = self.state();
            (
                state.disabled,
                state.validators.clone(),
                state.async_validators.clone(),
            )
        };
        if disabled {
            let mut state = self.state();
            state.errors = None;
            state.pending = false;
            state.async_generation += 1;
            return;
        }

        let errors = validators
            .iter()
            .fold(None, |acc, validator| ValidationErrors::combine(acc, validator(self)));
        let run_async = errors.is_none() && !async_validators.is_empty();

        let generation = {
            let mut state = self.state();
            state.errors = errors;
            state.async_generation += 1;
            state.pending = run_async;
            state.async_generation
        };

        if run_async {
            self.schedule_async(generation, async_validators);
        }
    }

    fn schedule_async(&self, generation: u64, validators: Vec<AsyncValidator>) {
        let weak = Arc::downgrade(&self.inner);
        let debounce = self.context().async_debounce;

        let spawned = self.lifecycle().spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            let control = match weak.upgrade() {
                Some(inner) => AbstractControl { inner },
                None => return,
            };
            if !control.is_current(generation) {
                return;
            }

            let mut errors = None;
            for validator in validators {
                match validator(control.clone()).await {
                    Ok(result) => errors = ValidationErrors::combine(errors, result),
                    Err(err) => {
                        if control.settle_async(generation, None) {
                            control.lifecycle().report(err);
                        }
                        return;
                    }
                }
            }
            control.settle_async(generation, errors);
        });

        if !spawned {
            let mut state = self.state();
            if state.async_generation == generation {
                state.pending = false;
            }
            warn!("Async validation could not be scheduled; control left without async result");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.lifecycle().is_disposed() && self.state().async_generation == generation
    }

    /// Apply an async result if it is still the newest one. Returns whether
    /// it was applied.
    fn settle_async(&self, generation: u64, errors: Option<ValidationErrors>) -> bool {
        if self.lifecycle().is_disposed() {
            return false;
        }
        {
            let mut state = self.state();
            if state.async_generation != generation || state.disabled {
                return false;
            }
            state.pending = false;
            state.errors = errors;
        }
        self.context().notify_change();
        true
    }

    fn notify_listeners(&self) {
        if self.lifecycle().is_disposed() {
            self.state().listeners.clear();
            return;
        }
        let listeners = self.state().listeners.clone();
        if listeners.is_empty() {
            return;
        }
        let value = self.value();
        for listener in listeners {
            listener(&value);
        }
    }

    fn revalidate_group_peers(&self) {
        let parent = match self.parent() {
            Some(parent) => parent,
            None => return,
        };
        let name = match self.name_in(&parent) {
            Some(name) => name,
            None => return,
        };
        let groups = parent.state().validation_groups.clone();
        for group in groups.iter().filter(|group| group.contains(&name)) {
            for peer in group.iter().filter(|peer| **peer != name) {
                if let Some(peer) = parent.child(peer) {
                    peer.run_validation();
                }
            }
        }
    }

    // ----------------------------------------------------------------------
    // Structure (used by the group and array views)
    // ----------------------------------------------------------------------

    /// Put `control` under `name`, replacing any existing child in place
    pub(crate) fn insert_child(&self, name: &str, control: AbstractControl) {
        control.set_parent(Some(self));
        let replaced = {
            let mut state = self.state();
            match &mut state.kind {
                ControlKind::Group(children) => {
                    match children.iter_mut().find(|(child_name, _)| child_name == name) {
                        Some(slot) => Some(std::mem::replace(&mut slot.1, control)),
                        None => {
                            children.push((name.to_string(), control));
                            None
                        }
                    }
                }
                _ => None,
            }
        };
        if let Some(old) = replaced {
            old.set_parent(None);
        }
        self.update_value_and_validity(SetValueOptions::silent());
    }

    pub(crate) fn remove_child(&self, name: &str) -> Option<AbstractControl> {
        let removed = {
            let mut state = self.state();
            match &mut state.kind {
                ControlKind::Group(children) => children
                    .iter()
                    .position(|(child_name, _)| child_name == name)
                    .map(|index| children.remove(index).1),
                _ => None,
            }
        };
        if let Some(removed) = &removed {
            removed.set_parent(None);
            self.update_value_and_validity(SetValueOptions::silent());
        }
        removed
    }

    pub(crate) fn array_insert(&self, index: usize, control: AbstractControl) {
        control.set_parent(Some(self));
        if let ControlKind::Array(children) = &mut self.state().kind {
            let index = index.min(children.len());
            children.insert(index, control);
        }
        self.update_value_and_validity(SetValueOptions::default());
    }

    pub(crate) fn array_remove(&self, index: usize) -> Option<AbstractControl> {
        let removed = match &mut self.state().kind {
            ControlKind::Array(children) if index < children.len() => Some(children.remove(index)),
            _ => None,
        };
        if let Some(removed) = &removed {
            removed.set_parent(None);
            self.update_value_and_validity(SetValueOptions::default());
        }
        removed
    }

    pub(crate) fn array_clear(&self) {
        let removed = match &mut self.state().kind {
            ControlKind::Array(children) => std::mem::take(children),
            _ => Vec::new(),
        };
        for child in &removed {
            child.set_parent(None);
        }
        self.update_value_and_validity(SetValueOptions::default());
    }

    pub(crate) fn len(&self) -> usize {
        match &self.state().kind {
            ControlKind::Scalar(_) => 0,
            ControlKind::Group(children) => children.len(),
            ControlKind::Array(children) => children.len(),
        }
    }

    /// Errors of every enabled node in the subtree, keyed by dotted path.
    /// The node itself is keyed by `path`.
    pub(crate) fn collect_errors_into(
        &self,
        path: &str,
        out: &mut BTreeMap<String, ValidationErrors>,
    ) {
        if self.disabled() {
            return;
        }
        if let Some(errors) = self.errors() {
            out.insert(path.to_string(), errors);
        }
        for (name, child) in self.named_children() {
            let child_path = if path.is_empty() {
                name
            } else {
                format!("{}.{}", path, name)
            };
            child.collect_errors_into(&child_path, out);
        }
    }
}

impl fmt::Debug for AbstractControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractControl")
            .field("kind", &self.kind_name())
            .field("status", &self.status())
            .field("value", &self.raw_value())
            .finish()
    }
}
