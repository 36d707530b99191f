//! # Resources
//!
//! A [`Resource`] is the local stand-in for one remote entity. It owns one
//! slot per declared attribute, its [`ResourceState`], the request currently
//! in flight for it, its change observers and its event channel.
//!
//! ## State transitions
//!
//! ```text
//!            set / push                save / find / delete
//!   clean ─────────────────▶ dirty ───────────────────────────▶ in flight
//!     ▲                                                             │
//!     │            done: deserialize, clear errors, clean           │
//!     └─────────────────────────────────────────────────────────────┤
//!                  fail: record errors, stay dirty                  │
//!                  always: loaded, not saving, didLoad  ◀───────────┘
//! ```
//!
//! `is_new` is not stored: it is read from the primary-key slot every time.
//!
//! ## Change propagation
//!
//! Every setter funnels into one notification path. The resource marks itself
//! dirty when it is loaded or new, then notifies its observers, which include
//! every collection it is an element of. A collection owned by a resource
//! forwards the change to that owner through a weak back-reference. Nested
//! notifications on an entity that is already notifying on the same thread
//! are absorbed, so cyclic graphs terminate. Concurrent changes from other
//! threads are still delivered.
//!
//! ## Locking
//!
//! Each resource guards its data with its own mutex. No code path holds two
//! entity locks at once, and observers and request continuations always run
//! after the lock is released.

use crate::attribute::{AttributeDescriptor, AttributeKind};
use crate::class::ResourceClass;
use crate::collection::ResourceCollection;
use crate::error::ResourceError;
use crate::events::{EventEmitter, ResourceEvent};
use crate::request::{Method, Outcome, Payload, RequestHandle, RequestParams};
use crate::state::ResourceState;
use crate::tracker::{ChangeObserver, ChangeTracker, NotifyGuard, ObserverId, ALL_PROPERTIES};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

#[derive(Clone)]
pub(crate) enum Slot {
    Scalar(Value),
    /// `None` until first read; then a placeholder or an assigned resource.
    BelongsTo(Option<Resource>),
    HasMany(ResourceCollection),
}

pub(crate) struct ResourceData {
    slots: Vec<Slot>,
    state: ResourceState,
    current_request: Option<RequestHandle>,
    /// The save on the wire, and the save waiting for it to settle.
    save_in_flight: Option<RequestHandle>,
    save_queued: Option<RequestHandle>,
    tracker: ChangeTracker,
    destroyed: bool,
}

pub(crate) struct ResourceInner {
    class: ResourceClass,
    primary_key_index: usize,
    data: Mutex<ResourceData>,
    events: EventEmitter,
}

impl ResourceInner {
    fn lock(&self) -> MutexGuard<'_, ResourceData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_is_null(&self, data: &ResourceData) -> bool {
        matches!(
            data.slots.get(self.primary_key_index),
            None | Some(Slot::Scalar(Value::Null))
        )
    }

    /// Records a change of `property`: marks the resource dirty when it is
    /// loaded or new, then notifies observers.
    pub(crate) fn changed(&self, property: &str) {
        let observers = {
            let mut data = self.lock();
            if data.destroyed || !data.tracker.is_observable() {
                return;
            }
            let is_new = self.key_is_null(&data);
            if data.state.absorb_change(is_new) {
                trace!(
                    resource = self.class.resource_name(),
                    property,
                    "Marked dirty"
                );
            }
            data.tracker.live_observers()
        };
        let Some(_guard) = NotifyGuard::enter(self as *const Self as usize) else {
            return;
        };
        for observer in observers {
            observer.on_change(property);
        }
    }
}

/// Handle to one resource instance. Clones share the instance.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    /// `eager` instantiates one level of `belongsTo` placeholders; deeper
    /// levels are created on first read.
    pub(crate) fn new(class: ResourceClass, observable: bool, eager: bool) -> Self {
        let primary_key_index = class
            .attribute_map()
            .index_of(class.primary_key())
            .unwrap_or_default();

        let inner = Arc::new_cyclic(|owner: &Weak<ResourceInner>| {
            let slots = class
                .attribute_map()
                .iter()
                .map(|descriptor| new_slot(&class, descriptor, owner, observable, eager))
                .collect();
            ResourceInner {
                class: class.clone(),
                primary_key_index,
                data: Mutex::new(ResourceData {
                    slots,
                    state: ResourceState::default(),
                    current_request: None,
                    save_in_flight: None,
                    save_queued: None,
                    tracker: ChangeTracker::new(observable),
                    destroyed: false,
                }),
                events: EventEmitter::new(),
            }
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ResourceInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ResourceInner> {
        Arc::downgrade(&self.inner)
    }

    /// Identity of the instance, shared by all clones.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn lock(&self) -> MutexGuard<'_, ResourceData> {
        self.inner.lock()
    }

    pub fn class(&self) -> &ResourceClass {
        &self.inner.class
    }

    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn descriptor(&self, name: &str) -> Result<(usize, &AttributeDescriptor), ResourceError> {
        let map = self.inner.class.attribute_map();
        map.index_of(name)
            .and_then(|index| map.get(name).map(|descriptor| (index, descriptor)))
            .ok_or_else(|| ResourceError::UnknownAttribute {
                resource: self.inner.class.name().to_string(),
                attribute: name.to_string(),
            })
    }

    fn expect_kind(
        &self,
        descriptor: &AttributeDescriptor,
        expected: AttributeKind,
    ) -> Result<(), ResourceError> {
        if descriptor.kind == expected {
            return Ok(());
        }
        Err(ResourceError::KindMismatch {
            resource: self.inner.class.name().to_string(),
            attribute: descriptor.name.clone(),
            expected,
            actual: descriptor.kind,
        })
    }

    fn ensure_alive(&self, data: &ResourceData) -> Result<(), ResourceError> {
        if data.destroyed {
            return Err(ResourceError::Destroyed(self.inner.class.name().to_string()));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    /// Reads a scalar attribute. Unset attributes read as `null`.
    pub fn get(&self, name: &str) -> Result<Value, ResourceError> {
        let (index, descriptor) = self.descriptor(name)?;
        self.expect_kind(descriptor, AttributeKind::Scalar)?;
        match &self.lock().slots[index] {
            Slot::Scalar(value) => Ok(value.clone()),
            _ => Ok(Value::Null),
        }
    }

    /// Writes a scalar attribute. Writing the current value is not a change.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), ResourceError> {
        let value = value.into();
        let (index, descriptor) = self.descriptor(name)?;
        self.expect_kind(descriptor, AttributeKind::Scalar)?;
        if let Some(expected) = descriptor.scalar_type() {
            if !expected.accepts(&value) {
                return Err(ResourceError::InvalidValue {
                    resource: self.inner.class.name().to_string(),
                    attribute: name.to_string(),
                    expected,
                    value,
                });
            }
        }

        {
            let mut data = self.lock();
            self.ensure_alive(&data)?;
            match &mut data.slots[index] {
                Slot::Scalar(current) if *current == value => return Ok(()),
                slot => *slot = Slot::Scalar(value),
            }
        }
        self.inner.changed(name);
        Ok(())
    }

    /// The related resource, creating an empty placeholder on first read.
    pub fn belongs_to(&self, name: &str) -> Result<Resource, ResourceError> {
        if let Some(related) = self.peek_belongs_to(name)? {
            return Ok(related);
        }
        let (index, descriptor) = self.descriptor(name)?;
        let class = self.inner.class.related_class(descriptor)?;
        let placeholder = class.create();

        let mut data = self.lock();
        match &mut data.slots[index] {
            Slot::BelongsTo(Some(existing)) => Ok(existing.clone()),
            slot => {
                *slot = Slot::BelongsTo(Some(placeholder.clone()));
                Ok(placeholder)
            }
        }
    }

    /// The related resource if one was instantiated, without creating one.
    pub fn peek_belongs_to(&self, name: &str) -> Result<Option<Resource>, ResourceError> {
        let (index, descriptor) = self.descriptor(name)?;
        self.expect_kind(descriptor, AttributeKind::BelongsTo)?;
        match &self.lock().slots[index] {
            Slot::BelongsTo(related) => Ok(related.clone()),
            _ => Ok(None),
        }
    }

    /// Replaces the related resource. `None` resets the relation to an empty
    /// placeholder on next read.
    pub fn set_belongs_to(&self, name: &str, related: Option<Resource>) -> Result<(), ResourceError> {
        let (index, descriptor) = self.descriptor(name)?;
        self.expect_kind(descriptor, AttributeKind::BelongsTo)?;
        if let Some(related) = &related {
            let expected = descriptor.target_type().unwrap_or_default();
            if related.class().name() != expected {
                return Err(ResourceError::WrongType {
                    expected: expected.to_string(),
                    actual: related.class().name().to_string(),
                });
            }
        }

        {
            let mut data = self.lock();
            self.ensure_alive(&data)?;
            let unchanged = match (&data.slots[index], &related) {
                (Slot::BelongsTo(Some(current)), Some(next)) => current.ptr_eq(next),
                (Slot::BelongsTo(None), None) => true,
                _ => false,
            };
            if unchanged {
                return Ok(());
            }
            data.slots[index] = Slot::BelongsTo(related);
        }
        self.inner.changed(name);
        Ok(())
    }

    pub fn has_many(&self, name: &str) -> Result<ResourceCollection, ResourceError> {
        let (index, descriptor) = self.descriptor(name)?;
        self.expect_kind(descriptor, AttributeKind::HasMany)?;
        match &self.lock().slots[index] {
            Slot::HasMany(collection) => Ok(collection.clone()),
            _ => Err(ResourceError::UnknownAttribute {
                resource: self.inner.class.name().to_string(),
                attribute: name.to_string(),
            }),
        }
    }

    /// Current primary-key value, `null` when absent.
    pub fn primary_key(&self) -> Value {
        match self.lock().slots.get(self.inner.primary_key_index) {
            Some(Slot::Scalar(value)) => value.clone(),
            _ => Value::Null,
        }
    }

    /// Sets the primary key without recording a change.
    pub fn assign_primary_key(&self, key: Value) {
        let index = self.inner.primary_key_index;
        let mut data = self.lock();
        if let Some(slot) = data.slots.get_mut(index) {
            *slot = Slot::Scalar(key);
        }
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// True iff the primary key is absent.
    pub fn is_new(&self) -> bool {
        let data = self.lock();
        self.inner.key_is_null(&data)
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

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn is_observable(&self) -> bool {
        self.lock().tracker.is_observable()
    }

    /// Snapshot of the state flags, with `is_new` derived from the key.
    pub fn state(&self) -> ResourceState {
        let data = self.lock();
        ResourceState {
            is_new: self.inner.key_is_null(&data),
            ..data.state.clone()
        }
    }

    pub fn current_request(&self) -> Option<RequestHandle> {
        self.lock().current_request.clone()
    }

    /// Waits for the request in flight. `None` when there is none, including
    /// when it already settled.
    pub async fn wait_for_request(&self) -> Option<Outcome> {
        let handle = self.current_request()?;
        Some(handle.wait().await)
    }

    pub fn clear_errors(&self) {
        self.lock().state.clear_errors();
    }

    pub(crate) fn record_error(&self, payload: Payload) {
        warn!(
            resource = self.inner.class.resource_name(),
            id = %self.primary_key(),
            errors = %payload,
            "Recorded resource error"
        );
        self.lock().state.record_error(payload);
    }

    /// Loaded and clean, as after a successful fetch.
    pub(crate) fn mark_loaded(&self) {
        let mut data = self.lock();
        data.state.is_loaded = true;
        data.state.is_dirty = false;
    }

    pub(crate) fn finish_round_trip(&self) {
        self.lock().state.finish_round_trip();
        self.inner.events.emit(ResourceEvent::DidLoad);
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.inner.events.subscribe()
    }

    /// Registers a change observer. Returns `None` for unobservable or
    /// destroyed resources.
    pub fn observe(&self, observer: Weak<dyn ChangeObserver>) -> Option<ObserverId> {
        let mut data = self.lock();
        if data.destroyed {
            return None;
        }
        data.tracker.register(observer)
    }

    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.lock().tracker.unregister(id)
    }

    pub(crate) fn unobserve_key(&self, key: usize) {
        self.lock().tracker.unregister_key(key);
    }

    // ---------------------------------------------------------------------
    // Wire format
    // ---------------------------------------------------------------------

    /// The adapter's encoding wrapped in the singular envelope.
    pub fn serialize(&self) -> Payload {
        let body = self.inner.class.adapter().serialize(self);
        let mut envelope = Map::new();
        envelope.insert(self.inner.class.resource_name().to_string(), body);
        Value::Object(envelope)
    }

    /// Applies a bare (unwrapped) payload through the adapter.
    pub fn deserialize(&self, payload: &Payload) -> Result<(), ResourceError> {
        self.inner.class.adapter().deserialize(self, payload)
    }

    // ---------------------------------------------------------------------
    // Requests
    // ---------------------------------------------------------------------

    /// Issues a request for this resource and tracks it as the current request.
    ///
    /// When the resource has no primary key yet and `params.data` carries one,
    /// the key is adopted and removed from the data.
    pub fn request(&self, params: RequestParams) -> RequestHandle {
        self.dispatch(params, true)
    }

    pub(crate) fn dispatch(&self, mut params: RequestParams, adopt_key: bool) -> RequestHandle {
        let class = self.inner.class.clone();
        let mut id = self.primary_key();
        if adopt_key && id.is_null() && params.data_field(class.primary_key()).is_some() {
            if let Some(adopted) = params.take_data_field(class.primary_key()) {
                if !adopted.is_null() {
                    self.assign_primary_key(adopted.clone());
                    id = adopted;
                }
            }
        }
        let id = (!id.is_null()).then_some(id);

        let handle = class
            .adapter()
            .request(params, class.resource_name_plural(), id.as_ref());
        debug!(
            resource = class.resource_name(),
            request_id = handle.id(),
            "Request issued"
        );

        self.lock().current_request = Some(handle.clone());
        let owner = self.downgrade();
        let issued = handle.clone();
        handle.always(move |_| {
            let Some(owner) = owner.upgrade() else {
                return;
            };
            let mut data = owner.lock();
            if data
                .current_request
                .as_ref()
                .is_some_and(|current| current.ptr_eq(&issued))
            {
                data.current_request = None;
            }
        });
        handle
    }

    /// Persists the resource: `POST` when new, `PUT` otherwise.
    ///
    /// A resource that is neither new nor dirty is not sent; the returned
    /// handle is already resolved.
    ///
    /// While a save is in flight, a save with no changes since it was issued
    /// returns the in-flight handle. A save after further changes is queued:
    /// it is issued once the in-flight save settles, and every save requested
    /// in the meantime shares its handle.
    #[tracing::instrument(skip(self), fields(resource = %self.inner.class.resource_name()))]
    pub fn save_record(&self) -> RequestHandle {
        let (is_new, was_dirty) = {
            let mut data = self.lock();
            if data.destroyed {
                warn!("Save rejected: resource destroyed");
                return RequestHandle::rejected(json!({ "error": "resource destroyed" }));
            }
            if let Some(in_flight) = data.save_in_flight.clone() {
                if !data.state.is_dirty {
                    debug!(request_id = in_flight.id(), "Save coalesced with in-flight request");
                    return in_flight;
                }
                if let Some(queued) = data.save_queued.clone() {
                    debug!(request_id = queued.id(), "Save joined the queued save");
                    return queued;
                }
                let queued = RequestHandle::pending();
                data.save_queued = Some(queued.clone());
                drop(data);
                debug!(
                    request_id = in_flight.id(),
                    "Save queued behind in-flight request"
                );
                self.follow_up(&in_flight, queued.clone());
                return queued;
            }
            let is_new = self.inner.key_is_null(&data);
            if !is_new && !data.state.is_dirty {
                debug!("Save skipped: resource is clean");
                return RequestHandle::resolved(Value::Null);
            }
            let was_dirty = data.state.is_dirty;
            data.state.is_saving = true;
            data.state.is_dirty = false;
            (is_new, was_dirty)
        };

        let method = if is_new { Method::Post } else { Method::Put };
        let body = self.serialize();
        let handle = self.request(RequestParams::new(method).with_data(body));
        self.lock().save_in_flight = Some(handle.clone());

        let (on_done, on_fail, on_always) = (self.clone(), self.clone(), self.clone());
        handle
            .done(move |payload| on_done.complete_save(payload, is_new))
            .fail(move |payload| {
                if was_dirty {
                    on_fail.lock().state.is_dirty = true;
                }
                on_fail.record_error(payload.clone());
            })
            .always(move |_| {
                on_always.lock().save_in_flight = None;
                on_always.finish_round_trip();
            });
        handle
    }

    /// Issues the queued save once `in_flight` settles and forwards its
    /// outcome to `queued`.
    fn follow_up(&self, in_flight: &RequestHandle, queued: RequestHandle) {
        let owner = self.clone();
        in_flight.always(move |_| {
            owner.lock().save_queued = None;
            let next = owner.save_record();
            next.always(move |outcome| {
                queued.settle(outcome.clone());
            });
        });
    }

    fn complete_save(&self, payload: &Payload, was_new: bool) {
        let resource_name = self.inner.class.resource_name();
        let body = payload.get(resource_name).unwrap_or(payload);

        // Changes made while the save was in flight win over the response;
        // only the key is taken so the queued save goes to the right place.
        let edited = self.lock().state.is_dirty;
        if edited {
            let key = body
                .get(self.inner.class.primary_key())
                .filter(|key| !key.is_null());
            if let (true, Some(key)) = (self.is_new(), key) {
                self.assign_primary_key(key.clone());
            }
            debug!(resource = resource_name, "Kept changes made during the save");
            self.lock().state.clear_errors();
        } else {
            if let Err(error) = self.deserialize(body) {
                warn!(resource = resource_name, %error, "Failed to apply save response");
                self.record_error(json!({ "error": error.to_string() }));
                self.lock().state.is_dirty = true;
                return;
            }
            let mut data = self.lock();
            data.state.clear_errors();
            data.state.is_dirty = false;
        }
        let event = if was_new {
            ResourceEvent::DidCreate
        } else {
            ResourceEvent::DidUpdate
        };
        info!(resource = resource_name, id = %self.primary_key(), %event, "Saved resource");
        self.inner.events.emit(event);
    }

    /// Deletes the resource remotely. On success the instance is disposed.
    #[tracing::instrument(skip(self), fields(resource = %self.inner.class.resource_name()))]
    pub fn delete_record(&self) -> RequestHandle {
        if self.is_destroyed() {
            warn!("Delete rejected: resource destroyed");
            return RequestHandle::rejected(json!({ "error": "resource destroyed" }));
        }

        let body = self.serialize();
        let handle = self.request(RequestParams::new(Method::Delete).with_data(body));

        let (on_done, on_fail) = (self.clone(), self.clone());
        handle
            .done(move |_| {
                info!(
                    resource = on_done.inner.class.resource_name(),
                    id = %on_done.primary_key(),
                    "Deleted resource"
                );
                on_done.inner.events.emit(ResourceEvent::DidDelete);
                on_done.dispose();
            })
            .fail(move |payload| on_fail.record_error(payload.clone()));
        handle
    }

    fn dispose(&self) {
        {
            let mut data = self.lock();
            data.destroyed = true;
            data.tracker.clear();
            data.current_request = None;
            data.save_queued = None;
        }
        self.inner.events.close();
    }

    // ---------------------------------------------------------------------
    // Copying
    // ---------------------------------------------------------------------

    /// A new observable instance of the same type holding this resource's
    /// non-null attribute values.
    ///
    /// A shallow copy shares `belongsTo` targets and `hasMany` elements with
    /// the source; a deep copy copies them as well, preserving shared and
    /// cyclic references within the copied graph. In both cases the copy owns
    /// fresh collections, so structural changes on one side never reach the
    /// other. The copy emits a single change notification.
    pub fn copy(&self, deep: bool) -> Resource {
        self.copy_into(deep, &mut HashMap::new(), None)
    }

    /// Like [`copy`](Self::copy), with `observer` registered on the copy
    /// before its change notification goes out.
    pub fn copy_observed(&self, deep: bool, observer: Weak<dyn ChangeObserver>) -> Resource {
        self.copy_into(deep, &mut HashMap::new(), Some(observer))
    }

    /// Like [`copy`](Self::copy), and also carries over the state flags.
    pub fn copy_with_state(&self, deep: bool) -> Resource {
        let clone = self.copy(deep);
        let state = self.lock().state.clone();
        clone.lock().state.adopt(&state);
        clone
    }

    fn copy_into(
        &self,
        deep: bool,
        memo: &mut HashMap<usize, Resource>,
        observer: Option<Weak<dyn ChangeObserver>>,
    ) -> Resource {
        if let Some(copied) = memo.get(&self.key()) {
            return copied.clone();
        }
        let clone = Resource::new(self.inner.class.clone(), true, false);
        memo.insert(self.key(), clone.clone());

        let slots = self.lock().slots.clone();
        let mut collections = Vec::new();
        {
            let mut copied = Vec::with_capacity(slots.len());
            for slot in slots {
                copied.push(match slot {
                    Slot::BelongsTo(Some(related)) if deep => {
                        Some(Slot::BelongsTo(Some(related.copy_into(true, memo, None))))
                    }
                    Slot::BelongsTo(Some(related)) => Some(Slot::BelongsTo(Some(related))),
                    Slot::HasMany(source) => {
                        let elements = source.to_vec();
                        let elements = if deep {
                            elements.iter().map(|e| e.copy_into(true, memo, None)).collect()
                        } else {
                            elements
                        };
                        collections.push(elements);
                        None
                    }
                    Slot::Scalar(value) if !value.is_null() => Some(Slot::Scalar(value)),
                    _ => None,
                });
            }

            let mut data = clone.lock();
            let mut targets = Vec::new();
            for (slot, replacement) in data.slots.iter_mut().zip(copied) {
                match (slot, replacement) {
                    (Slot::HasMany(collection), _) => targets.push(collection.clone()),
                    (slot, Some(replacement)) => *slot = replacement,
                    _ => {}
                }
            }
            drop(data);
            for (target, elements) in targets.into_iter().zip(collections) {
                target.reset(elements);
            }
        }

        if let Some(observer) = observer {
            clone.observe(observer);
        }
        clone.inner.changed(ALL_PROPERTIES);
        clone
    }
}

fn new_slot(
    class: &ResourceClass,
    descriptor: &AttributeDescriptor,
    owner: &Weak<ResourceInner>,
    observable: bool,
    eager: bool,
) -> Slot {
    match descriptor.kind {
        AttributeKind::Scalar => Slot::Scalar(Value::Null),
        AttributeKind::BelongsTo => Slot::BelongsTo(
            eager
                .then(|| class.related(descriptor))
                .flatten()
                .map(|related| Resource::new(related, observable, false)),
        ),
        AttributeKind::HasMany => match class.related(descriptor) {
            Some(related) => Slot::HasMany(ResourceCollection::new(
                related,
                Some((owner.clone(), descriptor.name.clone())),
                observable,
            )),
            // Registry validation guarantees the target exists.
            None => Slot::HasMany(ResourceCollection::new(
                class.clone(),
                Some((owner.clone(), descriptor.name.clone())),
                observable,
            )),
        },
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.lock();
        let mut debug = f.debug_struct("Resource");
        debug.field("type", &self.inner.class.name());
        for (descriptor, slot) in self.inner.class.attribute_map().iter().zip(&data.slots) {
            if let Slot::Scalar(value) = slot {
                debug.field(&descriptor.name, value);
            }
        }
        debug
            .field("dirty", &data.state.is_dirty)
            .field("loaded", &data.state.is_loaded)
            .field("destroyed", &data.destroyed)
            .finish()
    }
}
