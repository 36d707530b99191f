//! # Resource Collections
//!
//! An ordered sequence of resources of one declared type, carrying the same
//! state flags as a single resource plus the `meta` of its last load.
//!
//! Collections come in two flavours:
//!
//! - **standalone**, as returned by [`ResourceClass::find_all`](crate::class::ResourceClass::find_all)
//!   or [`ResourceClass::collection`](crate::class::ResourceClass::collection):
//!   changes mark the collection itself dirty;
//! - **owned**, as the value of a `hasMany` attribute: the collection keeps a
//!   weak back-reference to its owning resource and changes mark the *owner*
//!   dirty instead. The back-reference is never traversed for serialization or
//!   lifecycle purposes.
//!
//! A collection observes each of its elements, so an attribute change on an
//! element is reported as an [`ELEMENT_CHANGED`] change of the collection.
//! Structural changes (push, insert, remove, clear) are reported as
//! [`CONTENT_CHANGED`]. Bulk loading via [`deserialize_many`](ResourceCollection::deserialize_many)
//! is not a change.

use crate::class::ResourceClass;
use crate::error::ResourceError;
use crate::events::{EventEmitter, ResourceEvent};
use crate::request::{Outcome, Payload, RequestHandle};
use crate::resource::{Resource, ResourceInner};
use crate::state::ResourceState;
use crate::tracker::{
    observer_key, ChangeObserver, ChangeTracker, NotifyGuard, ObserverId, CONTENT_CHANGED,
    ELEMENT_CHANGED,
};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;
use tracing::{trace, warn};

struct ParentLink {
    owner: Weak<ResourceInner>,
    attribute: String,
}

struct CollectionData {
    elements: Vec<Resource>,
    state: ResourceState,
    meta: Option<Payload>,
    current_request: Option<RequestHandle>,
    tracker: ChangeTracker,
}

pub(crate) struct CollectionInner {
    class: ResourceClass,
    parent: Option<ParentLink>,
    observable: bool,
    this: Weak<CollectionInner>,
    data: Mutex<CollectionData>,
    events: EventEmitter,
}

impl CollectionInner {
    fn lock(&self) -> MutexGuard<'_, CollectionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn as_observer(&self) -> Weak<dyn ChangeObserver> {
        self.this.clone()
    }

    fn changed(&self, property: &str) {
        if !self.observable {
            return;
        }

        let owner = self
            .parent
            .as_ref()
            .and_then(|link| link.owner.upgrade().map(|owner| (owner, &link.attribute)));
        match owner {
            Some((owner, attribute)) => owner.changed(attribute),
            None => {
                let mut data = self.lock();
                let is_new = data.state.is_new;
                if data.state.absorb_change(is_new) {
                    trace!(
                        resource = self.class.resource_name_plural(),
                        property,
                        "Marked collection dirty"
                    );
                }
            }
        }

        let Some(_guard) = NotifyGuard::enter(self as *const Self as usize) else {
            return;
        };
        let observers = self.lock().tracker.live_observers();
        for observer in observers {
            observer.on_change(property);
        }
    }
}

impl ChangeObserver for CollectionInner {
    fn on_change(&self, _property: &str) {
        self.changed(ELEMENT_CHANGED);
    }
}

/// Handle to one collection. Clones share the collection.
#[derive(Clone)]
pub struct ResourceCollection {
    inner: Arc<CollectionInner>,
}

impl ResourceCollection {
    pub(crate) fn new(
        class: ResourceClass,
        parent: Option<(Weak<ResourceInner>, String)>,
        observable: bool,
    ) -> Self {
        let inner = Arc::new_cyclic(|this| CollectionInner {
            class,
            parent: parent.map(|(owner, attribute)| ParentLink { owner, attribute }),
            observable,
            this: this.clone(),
            data: Mutex::new(CollectionData {
                elements: Vec::new(),
                state: ResourceState::default(),
                meta: None,
                current_request: None,
                tracker: ChangeTracker::new(observable),
            }),
            events: EventEmitter::new(),
        });
        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, CollectionData> {
        self.inner.lock()
    }

    pub fn class(&self) -> &ResourceClass {
        &self.inner.class
    }

    pub fn ptr_eq(&self, other: &ResourceCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The owning resource of a `hasMany` collection, while it is alive.
    pub fn parent(&self) -> Option<Resource> {
        let link = self.inner.parent.as_ref()?;
        link.owner.upgrade().map(Resource::from_inner)
    }

    fn check_type(&self, resource: &Resource) -> Result<(), ResourceError> {
        if resource.class().is(&self.inner.class) {
            return Ok(());
        }
        Err(ResourceError::WrongType {
            expected: self.inner.class.name().to_string(),
            actual: resource.class().name().to_string(),
        })
    }

    fn watch(&self, element: &Resource) {
        if self.inner.observable {
            element.observe(self.inner.as_observer());
        }
    }

    fn unwatch(&self, element: &Resource) {
        element.unobserve_key(observer_key(&self.inner.as_observer()));
    }

    // ---------------------------------------------------------------------
    // Elements
    // ---------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.lock().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Resource> {
        self.lock().elements.get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Resource> {
        self.lock().elements.clone()
    }

    pub fn contains(&self, resource: &Resource) -> bool {
        self.lock().elements.iter().any(|e| e.ptr_eq(resource))
    }

    pub fn position(&self, resource: &Resource) -> Option<usize> {
        self.lock().elements.iter().position(|e| e.ptr_eq(resource))
    }

    pub fn push(&self, resource: Resource) -> Result<(), ResourceError> {
        let end = self.len();
        self.insert(end, resource)
    }

    /// Inserts at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, resource: Resource) -> Result<(), ResourceError> {
        self.check_type(&resource)?;
        {
            let mut data = self.lock();
            let index = index.min(data.elements.len());
            data.elements.insert(index, resource.clone());
        }
        self.watch(&resource);
        self.inner.changed(CONTENT_CHANGED);
        Ok(())
    }

    pub fn remove(&self, index: usize) -> Option<Resource> {
        let removed = {
            let mut data = self.lock();
            (index < data.elements.len()).then(|| data.elements.remove(index))
        }?;
        if !self.contains(&removed) {
            self.unwatch(&removed);
        }
        self.inner.changed(CONTENT_CHANGED);
        Some(removed)
    }

    /// Removes the first occurrence of `resource`.
    pub fn remove_resource(&self, resource: &Resource) -> bool {
        match self.position(resource) {
            Some(index) => self.remove(index).is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.lock().elements);
        if removed.is_empty() {
            return;
        }
        for element in &removed {
            self.unwatch(element);
        }
        self.inner.changed(CONTENT_CHANGED);
    }

    /// Replaces the elements without recording a change.
    pub(crate) fn reset(&self, elements: Vec<Resource>) {
        let previous = std::mem::replace(&mut self.lock().elements, elements.clone());
        for element in &previous {
            self.unwatch(element);
        }
        for element in &elements {
            self.watch(element);
        }
    }

    /// Loads elements from an array payload.
    ///
    /// Object items are decoded into elements; scalar items are taken as
    /// element primary keys. An item whose key matches a current element is
    /// decoded into that element, preserving its identity. Loaded elements
    /// are clean; the collection is no longer new.
    pub fn deserialize_many(&self, payload: &Payload) -> Result<(), ResourceError> {
        let items = payload
            .as_array()
            .ok_or_else(|| ResourceError::MalformedPayload {
                resource: self.inner.class.resource_name_plural().to_string(),
                reason: format!("expected an array, got {payload}"),
            })?;

        let class = &self.inner.class;
        let primary_key = class.primary_key();
        let current = self.to_vec();
        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            let key = match item {
                Value::Object(object) => object.get(primary_key).cloned().unwrap_or(Value::Null),
                scalar => scalar.clone(),
            };
            let existing = (!key.is_null())
                .then(|| current.iter().find(|e| e.primary_key() == key).cloned())
                .flatten();
            let element = existing.unwrap_or_else(|| {
                if self.inner.observable {
                    class.create()
                } else {
                    class.create_unobserved()
                }
            });
            match item {
                Value::Object(_) => {
                    element.deserialize(item)?;
                    element.mark_loaded();
                }
                Value::Null => {}
                scalar => element.assign_primary_key(scalar.clone()),
            }
            elements.push(element);
        }

        self.reset(elements);
        self.lock().state.is_new = false;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    pub fn state(&self) -> ResourceState {
        self.lock().state.clone()
    }

    pub fn is_new(&self) -> bool {
        self.lock().state.is_new
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().state.is_dirty
    }

    pub fn is_saving(&self) -> bool {
        self.lock().state.is_saving
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().state.is_loaded
    }

    pub fn is_error(&self) -> bool {
        self.lock().state.is_error
    }

    pub fn errors(&self) -> Option<Payload> {
        self.lock().state.errors.clone()
    }

    pub fn meta(&self) -> Option<Payload> {
        self.lock().meta.clone()
    }

    pub(crate) fn set_meta(&self, meta: Option<Payload>) {
        self.lock().meta = meta;
    }

    pub fn clear_errors(&self) {
        self.lock().state.clear_errors();
    }

    pub(crate) fn record_error(&self, payload: Payload) {
        warn!(
            resource = self.inner.class.resource_name_plural(),
            errors = %payload,
            "Recorded collection error"
        );
        self.lock().state.record_error(payload);
    }

    pub(crate) fn finish_load(&self) {
        {
            let mut data = self.lock();
            data.state.finish_round_trip();
            data.state.is_dirty = false;
        }
        self.inner.events.emit(ResourceEvent::DidLoad);
    }

    pub fn current_request(&self) -> Option<RequestHandle> {
        self.lock().current_request.clone()
    }

    pub async fn wait_for_request(&self) -> Option<Outcome> {
        let handle = self.current_request()?;
        Some(handle.wait().await)
    }

    /// Tracks `handle` as the current request until it settles.
    pub(crate) fn track_request(&self, handle: &RequestHandle) {
        self.lock().current_request = Some(handle.clone());
        let this = self.inner.this.clone();
        let issued = handle.clone();
        handle.always(move |_| {
            let Some(inner) = this.upgrade() else {
                return;
            };
            let mut data = inner.lock();
            if data
                .current_request
                .as_ref()
                .is_some_and(|current| current.ptr_eq(&issued))
            {
                data.current_request = None;
            }
        });
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.inner.events.subscribe()
    }

    pub fn observe(&self, observer: Weak<dyn ChangeObserver>) -> Option<ObserverId> {
        self.lock().tracker.register(observer)
    }

    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.lock().tracker.unregister(id)
    }
}

impl fmt::Debug for ResourceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.lock();
        f.debug_struct("ResourceCollection")
            .field("type", &self.inner.class.name())
            .field("len", &data.elements.len())
            .field("owned", &self.inner.parent.is_some())
            .field("dirty", &data.state.is_dirty)
            .field("loaded", &data.state.is_loaded)
            .finish()
    }
}
