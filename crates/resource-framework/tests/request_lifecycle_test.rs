use resource_framework::mock::{create_mock_transport, expect_request, MockTransport, PendingRequest};
use resource_framework::{
    AttributeMapBuilder, Method, Model, Registry, RequestParams, Resource, ResourceClass,
    ResourceEvent, ScalarType, TransportError,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::mpsc;

struct Post;

impl Model for Post {
    const NAME: &'static str = "Post";
    fn declare(attrs: &mut AttributeMapBuilder) {
        attrs
            .attr("title", ScalarType::String)
            .attr("body", ScalarType::String);
    }
}

fn setup() -> (ResourceClass, mpsc::Receiver<PendingRequest>) {
    let (transport, requests) = create_mock_transport(8);
    let registry = Registry::builder(transport.adapter("http://api.test"))
        .register::<Post>()
        .build()
        .unwrap();
    (registry.class::<Post>().unwrap(), requests)
}

async fn next(requests: &mut mpsc::Receiver<PendingRequest>) -> PendingRequest {
    expect_request(requests).await.expect("Expected a request")
}

async fn loaded_post(
    posts: &ResourceClass,
    requests: &mut mpsc::Receiver<PendingRequest>,
    id: u64,
) -> Resource {
    let post = posts.find_by_id(id);
    let handle = post.current_request().unwrap();
    next(requests)
        .await
        .respond_ok(json!({"post": {"id": id, "title": "Loaded"}}));
    handle.wait().await.unwrap();
    post
}

// --- Saving ---

#[tokio::test]
async fn test_save_in_flight_state() {
    let (posts, mut requests) = setup();
    let post = posts.create();
    post.set("title", "Draft").unwrap();

    let save = post.save_record();
    assert!(post.is_saving());
    assert!(!post.is_dirty());
    assert!(!post.is_loaded());
    assert!(post.current_request().unwrap().ptr_eq(&save));

    let pending = next(&mut requests).await;
    assert_eq!(pending.request.method, Method::Post);
    assert_eq!(pending.request.path, "/posts");
    assert_eq!(pending.request.body, Some(json!({"post": {"title": "Draft", "body": null}})));
    assert!(post.is_saving());

    pending.respond_ok(json!({"post": {"id": 1, "title": "Draft", "body": null}}));
    save.wait().await.unwrap();
    assert!(!post.is_saving());
    assert!(post.is_loaded());
    assert!(!post.is_dirty());
    assert!(!post.is_new());
    assert!(post.current_request().is_none());
}

#[tokio::test]
async fn test_overlapping_saves_are_coalesced() {
    let (posts, mut requests) = setup();
    let post = posts.create();
    post.set("title", "Once").unwrap();

    let first = post.save_record();
    let second = post.save_record();
    assert!(first.ptr_eq(&second));

    let pending = next(&mut requests).await;
    assert!(requests.try_recv().is_err());
    pending.respond_ok(json!({"post": {"id": 1, "title": "Once"}}));
    first.wait().await.unwrap();
    assert!(second.is_settled());
}

#[tokio::test]
async fn test_save_after_edit_in_flight_is_queued() {
    let (posts, mut requests) = setup();
    let post = loaded_post(&posts, &mut requests, 3).await;
    post.set("title", "v1").unwrap();

    let first = post.save_record();
    let first_request = next(&mut requests).await;
    assert_eq!(first_request.request.body.as_ref().unwrap()["post"]["title"], json!("v1"));

    // Edited while the first save is on the wire.
    post.set("title", "v2").unwrap();
    assert!(post.is_dirty());
    let second = post.save_record();
    assert!(!second.ptr_eq(&first));
    assert!(post.save_record().ptr_eq(&second));
    assert!(requests.try_recv().is_err());

    first_request.respond_ok(json!({"post": {"id": 3, "title": "v1"}}));
    first.wait().await.unwrap();
    assert_eq!(post.get("title").unwrap(), json!("v2"));
    assert!(!second.is_settled());

    let follow_up = next(&mut requests).await;
    assert_eq!(follow_up.request.method, Method::Put);
    assert_eq!(follow_up.request.path, "/posts/3");
    assert_eq!(follow_up.request.body.as_ref().unwrap()["post"]["title"], json!("v2"));
    assert!(post.is_saving());

    follow_up.respond_ok(json!({"post": {"id": 3, "title": "v2"}}));
    second.wait().await.unwrap();
    assert_eq!(post.get("title").unwrap(), json!("v2"));
    assert!(!post.is_dirty());
    assert!(!post.is_saving());
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn test_create_event_uses_newness_at_issue_time() {
    let (posts, mut requests) = setup();
    let post = posts.create();
    post.set("title", "Fresh").unwrap();
    let mut events = post.subscribe();

    let save = post.save_record();
    next(&mut requests)
        .await
        .respond_ok(json!({"post": {"id": 12, "title": "Fresh"}}));
    save.wait().await.unwrap();

    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidCreate));
    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidLoad));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_update_uses_put_on_the_member_path() {
    let (posts, mut requests) = setup();
    let post = loaded_post(&posts, &mut requests, 3).await;
    let mut events = post.subscribe();
    post.set("body", "More").unwrap();

    let save = post.save_record();
    let pending = next(&mut requests).await;
    assert_eq!(pending.request.method, Method::Put);
    assert_eq!(pending.request.path, "/posts/3");
    pending.respond_ok(json!({"post": {"id": 3, "title": "Loaded", "body": "More"}}));
    save.wait().await.unwrap();

    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidUpdate));
    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidLoad));
}

#[tokio::test]
async fn test_failed_save_records_errors_and_stays_dirty() {
    let (posts, mut requests) = setup();
    let post = loaded_post(&posts, &mut requests, 2).await;
    post.set("title", "").unwrap();

    let save = post.save_record();
    next(&mut requests)
        .await
        .respond_status(422, json!({"title": ["can't be blank"]}));
    let outcome = save.wait().await;
    assert_eq!(
        outcome,
        Err(json!({"status": 422, "body": {"title": ["can't be blank"]}}))
    );
    assert!(post.is_error());
    assert!(post.is_dirty());
    assert!(post.is_loaded());
    assert!(!post.is_saving());
    assert!(post.current_request().is_none());
    assert_eq!(
        post.errors(),
        Some(json!({"status": 422, "body": {"title": ["can't be blank"]}}))
    );

    // Retrying succeeds and clears the error.
    post.set("title", "Fixed").unwrap();
    let retry = post.save_record();
    next(&mut requests)
        .await
        .respond_ok(json!({"post": {"id": 2, "title": "Fixed"}}));
    retry.wait().await.unwrap();
    assert!(!post.is_error());
    assert!(post.errors().is_none());
    assert!(!post.is_dirty());
}

#[tokio::test]
async fn test_clean_save_sends_nothing() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, "/posts/8")
        .return_ok(json!({"post": {"id": 8, "title": "Stable"}}));
    let registry = Registry::builder(mock.adapter("http://api.test"))
        .register::<Post>()
        .build()
        .unwrap();
    let post = registry.class::<Post>().unwrap().find_by_id(8);
    post.wait_for_request().await;

    let save = post.save_record();
    assert!(save.is_settled());
    assert_eq!(save.outcome(), Some(Ok(json!(null))));
    assert!(post.current_request().is_none());
    assert_eq!(mock.requests().len(), 1);
    mock.verify();
}

#[tokio::test]
async fn test_continuations_run_done_then_always() {
    let (posts, mut requests) = setup();
    let post = posts.create();
    post.set("title", "Ordered").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let save = post.save_record();
    let (on_done, on_always) = (log.clone(), log.clone());
    let observed = post.clone();
    save.done(move |_| {
        on_done
            .lock()
            .unwrap()
            .push(format!("done dirty={}", observed.is_dirty()))
    })
    .always(move |_| on_always.lock().unwrap().push("always".to_string()));

    next(&mut requests)
        .await
        .respond_ok(json!({"post": {"id": 1, "title": "Ordered"}}));
    save.wait().await.unwrap();
    assert_eq!(*log.lock().unwrap(), ["done dirty=false", "always"]);

    // Registered after settlement: runs at once.
    let late = log.clone();
    save.always(move |_| late.lock().unwrap().push("late".to_string()));
    assert_eq!(log.lock().unwrap().last().unwrap(), "late");
}

#[tokio::test]
async fn test_current_request_clears_when_handle_is_discarded() {
    let (posts, mut requests) = setup();
    let post = posts.create();
    post.set("title", "Fire and forget").unwrap();

    let _ = post.save_record();
    let tracked = post.current_request().unwrap();
    next(&mut requests)
        .await
        .respond_err(TransportError::Network("connection reset".into()));
    tracked.wait().await.unwrap_err();

    assert!(post.current_request().is_none());
    assert_eq!(
        post.errors(),
        Some(json!({"status": 0, "error": "connection reset"}))
    );
}

// --- Raw requests ---

#[tokio::test]
async fn test_request_adopts_primary_key_from_data() {
    let (posts, mut requests) = setup();
    let post = posts.create();

    let handle = post.request(RequestParams::get().with_data(json!({"id": 7, "expand": true})));
    assert_eq!(post.primary_key(), json!(7));

    let pending = next(&mut requests).await;
    assert_eq!(pending.request.path, "/posts/7");
    assert_eq!(pending.request.query, Some(json!({"expand": true})));
    pending.respond_ok(json!({}));
    handle.wait().await.unwrap();
}

// --- Finding ---

#[tokio::test]
async fn test_find_by_id_failure_is_recorded() {
    let (posts, mut requests) = setup();
    let post = posts.find_by_id(5);
    assert!(!post.is_loaded());
    let mut events = post.subscribe();

    let pending = next(&mut requests).await;
    assert_eq!(pending.request.path, "/posts/5");
    assert!(pending.request.query.is_none());
    pending.respond_err(TransportError::Network("timed out".into()));
    post.wait_for_request().await;

    assert!(post.is_loaded());
    assert!(post.is_error());
    assert_eq!(post.errors(), Some(json!({"status": 0, "error": "timed out"})));
    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidLoad));
}

#[tokio::test]
async fn test_find_all_populates_collection() {
    let (posts, mut requests) = setup();
    let list = posts.find_all(json!({}));
    assert!(list.is_new());
    let mut events = list.subscribe();

    let pending = next(&mut requests).await;
    assert_eq!(pending.request.path, "/posts");
    assert!(pending.request.query.is_none());
    pending.respond_ok(json!({
        "posts": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}],
        "meta": {"page": 1}
    }));
    list.wait_for_request().await;

    assert_eq!(list.len(), 2);
    assert!(list.is_loaded());
    assert!(!list.is_error());
    assert_eq!(list.meta(), Some(json!({"page": 1})));
    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidLoad));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    let first = list.get(0).unwrap();
    assert!(first.is_loaded());
    assert!(!first.is_dirty());
    assert_eq!(first.get("title").unwrap(), json!("a"));
}

#[tokio::test]
async fn test_find_all_failure_is_recorded_on_the_collection() {
    let (posts, mut requests) = setup();
    let list = posts.find_all(json!({"title": "a"}));
    let mut events = list.subscribe();

    let pending = next(&mut requests).await;
    assert_eq!(pending.request.query, Some(json!({"title": "a"})));
    pending.respond_status(500, json!({"error": "boom"}));
    list.wait_for_request().await;

    assert!(list.is_loaded());
    assert!(list.is_error());
    assert!(list.is_empty());
    assert_eq!(
        list.errors(),
        Some(json!({"status": 500, "body": {"error": "boom"}}))
    );
    assert_eq!(events.try_recv(), Ok(ResourceEvent::DidLoad));
}

// --- Deleting ---

#[tokio::test]
async fn test_delete_failure_keeps_resource_usable() {
    let (posts, mut requests) = setup();
    let post = loaded_post(&posts, &mut requests, 4).await;

    let delete = post.delete_record();
    let pending = next(&mut requests).await;
    assert_eq!(pending.request.method, Method::Delete);
    assert_eq!(pending.request.path, "/posts/4");
    pending.respond_status(403, json!({"error": "forbidden"}));
    delete.wait().await.unwrap_err();

    assert!(!post.is_destroyed());
    assert!(post.is_error());
    post.set("title", "Still here").unwrap();
    assert!(post.is_dirty());
}

#[tokio::test]
async fn test_delete_success_disposes_once() {
    let (posts, mut requests) = setup();
    let post = loaded_post(&posts, &mut requests, 6).await;
    let mut events = post.subscribe();

    let delete = post.delete_record();
    next(&mut requests).await.respond_ok(json!({}));
    delete.wait().await.unwrap();

    assert!(post.is_destroyed());
    assert!(post.current_request().is_none());
    assert_eq!(events.recv().await, Ok(ResourceEvent::DidDelete));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Closed)));

    let again = post.delete_record();
    assert!(again.is_settled());
    assert!(again.outcome().unwrap().is_err());
    assert!(requests.try_recv().is_err());
}
