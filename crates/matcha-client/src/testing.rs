//! In-process fakes for the HTTP transport and the socket connector, plus
//! canned backend bodies.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use matcha_net::{ApiError, ApiRequest, ChannelError, Connection, Connector, HttpTransport, Method};
use matcha_shared::notification::{Notification, NotificationKind};
use matcha_shared::profile::ProfileSnapshot;
use matcha_shared::protocol::PushEvent;
use matcha_shared::types::NotificationId;

pub(crate) const COMPLETE: bool = true;
pub(crate) const INCOMPLETE: bool = false;

// ---------------------------------------------------------------------------
// Canned bodies
// ---------------------------------------------------------------------------

/// `profile/me` body. An incomplete profile only lacks images.
pub(crate) fn profile_json(id: i64, complete: bool) -> Value {
    let images = if complete {
        json!([{"id": 10, "file_path": "/uploads/a.jpg", "is_profile_pic": true,
                "created_at": "2024-05-01T10:00:00"}])
    } else {
        json!([])
    };
    json!({
        "id": id,
        "username": format!("user{id}"),
        "email": format!("user{id}@example.com"),
        "first_name": "Ada",
        "last_name": "Lovelace",
        "bio": "Tea and long walks",
        "gender": "Female",
        "sexual_preference": "Bisexual",
        "location": {"latitude": 48.85, "longitude": 2.35},
        "age": 30,
        "fame_rating": 4.5,
        "is_verified": true,
        "images": images,
        "tags": [{"id": 1, "tag_name": "#tea"}],
    })
}

pub(crate) fn complete_profile(id: i64) -> ProfileSnapshot {
    serde_json::from_value(profile_json(id, COMPLETE)).expect("valid profile")
}

pub(crate) fn incomplete_profile(id: i64) -> ProfileSnapshot {
    serde_json::from_value(profile_json(id, INCOMPLETE)).expect("valid profile")
}

/// Profile satisfying exactly the completeness predicates set in `mask`:
/// bit 0 gender, 1 sexual preference, 2 bio, 3 tag, 4 image.
pub(crate) fn profile_with_predicates(mask: u8) -> ProfileSnapshot {
    let pick = |bit: u8, present: Value, absent: Value| {
        if mask & (1 << bit) != 0 {
            present
        } else {
            absent
        }
    };
    serde_json::from_value(json!({
        "id": 1,
        "username": "user1",
        "email": "user1@example.com",
        "gender": pick(0, json!("Female"), Value::Null),
        "sexual_preference": pick(1, json!("Gay"), Value::Null),
        "bio": pick(2, json!("Tea and long walks"), Value::Null),
        "tags": pick(3, json!([{"id": 1, "tag_name": "#tea"}]), json!([])),
        "images": pick(4, json!([{"id": 10, "file_path": "/uploads/a.jpg", "is_profile_pic": true}]), json!([])),
    }))
    .expect("valid profile")
}

pub(crate) fn login_json(id: i64, token: &str) -> Value {
    json!({
        "message": "Login successful",
        "token": token,
        "user": {"id": id, "username": format!("user{id}"), "email": format!("user{id}@example.com")},
    })
}

pub(crate) fn notification(id: i64, is_read: bool) -> Notification {
    Notification {
        id: NotificationId(id),
        kind: NotificationKind::Like,
        from_user: None,
        is_read,
        created_at: chrono::DateTime::from_timestamp(1_700_000_000 + id, 0),
    }
}

pub(crate) fn notification_json(id: i64, is_read: bool) -> Value {
    json!({
        "id": id,
        "type": "like",
        "from_user": {"id": 2, "username": "bob", "first_name": "Bob"},
        "is_read": is_read,
        "created_at": format!("2024-05-01T10:00:{:02}", id % 60),
    })
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

type Key = (Method, String);

/// Scripted backend. Responses are looked up by method and path: one-shot
/// responses first, then the sticky one. Unknown routes answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    sticky: Mutex<HashMap<Key, Result<Value, ApiError>>>,
    once: Mutex<HashMap<Key, VecDeque<Result<Value, ApiError>>>>,
    delays: Mutex<HashMap<Key, Duration>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<ApiRequest>>,
    offline: AtomicBool,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, method: Method, path: &str, result: Result<Value, ApiError>) {
        self.sticky
            .lock()
            .unwrap()
            .insert((method, path.to_string()), result);
    }

    pub(crate) fn ok(&self, method: Method, path: &str, body: Value) {
        self.respond(method, path, Ok(body));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.respond(method, path, Err(error));
    }

    pub(crate) fn respond_once(&self, method: Method, path: &str, result: Result<Value, ApiError>) {
        self.once
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Every request to `path` sleeps this long before answering.
    pub(crate) fn delay(&self, method: Method, path: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert((method, path.to_string()), delay);
    }

    pub(crate) fn clear_delay(&self, method: Method, path: &str) {
        self.delays
            .lock()
            .unwrap()
            .remove(&(method, path.to_string()));
    }

    /// Requests to `path` block until the returned handle is notified,
    /// once per request.
    pub(crate) fn gate(&self, path: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub(crate) fn last(&self, method: Method, path: &str) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let key = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);

        let gate = self.gates.lock().unwrap().get(&key.1).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".into()));
        }
        if let Some(result) = self
            .once
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        self.sticky
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Server {
                    status: 404,
                    message: format!("no route for {} {}", key.0, key.1),
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

type EventSender = mpsc::UnboundedSender<Result<PushEvent, ChannelError>>;

/// Scripted socket. Connects succeed unless told otherwise; the most
/// recent connection can be fed events or dropped.
#[derive(Default)]
pub(crate) struct FakeConnector {
    fail_always: AtomicBool,
    fail_next: AtomicU32,
    hang_up: AtomicBool,
    attempt_times: Mutex<Vec<Instant>>,
    opened: Mutex<Vec<(Uuid, String)>>,
    live: Mutex<Option<EventSender>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Accept connects, then end the stream at once, like a server that
    /// rejects the token after the upgrade.
    pub(crate) fn hang_up(&self, hang_up: bool) {
        self.hang_up.store(hang_up, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempt_times.lock().unwrap().len()
    }

    pub(crate) fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().unwrap().clone()
    }

    /// Connection ids and the token each was opened with.
    pub(crate) fn opened(&self) -> Vec<(Uuid, String)> {
        self.opened.lock().unwrap().clone()
    }

    pub(crate) fn tokens(&self) -> Vec<String> {
        self.opened().into_iter().map(|(_, t)| t).collect()
    }

    /// Deliver an event on the live connection. `false` if there is none
    /// or it was closed.
    pub(crate) fn push(&self, event: PushEvent) -> bool {
        match self.live.lock().unwrap().as_ref() {
            Some(tx) => tx.unbounded_send(Ok(event)).is_ok(),
            None => false,
        }
    }

    /// Simulate the server dropping the live connection.
    pub(crate) fn drop_connection(&self) {
        if let Some(tx) = self.live.lock().unwrap().take() {
            let _ = tx.unbounded_send(Err(ChannelError::Closed("server went away".into())));
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, token: &str) -> Result<Connection, ChannelError> {
        self.attempt_times.lock().unwrap().push(Instant::now());

        let scripted_failure = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if self.fail_always.load(Ordering::SeqCst) || scripted_failure {
            return Err(ChannelError::Connect("connection refused".into()));
        }

        let connection = if self.hang_up.load(Ordering::SeqCst) {
            Connection::new(futures::stream::empty().boxed())
        } else {
            let (tx, rx) = mpsc::unbounded();
            *self.live.lock().unwrap() = Some(tx);
            Connection::new(rx.boxed())
        };
        self.opened
            .lock()
            .unwrap()
            .push((connection.id, token.to_string()));
        Ok(connection)
    }
}
