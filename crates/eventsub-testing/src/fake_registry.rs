//! Stateful in-memory registry.
//!
//! [`FakeHelix`] implements [`HelixTransport`] and keeps conduits, shards
//! and subscriptions in memory, so tests can observe effects that only the
//! remote side produces: shards disabled by a shrinking conduit, per-shard
//! rejections, cursor pagination and the 204/404 delete contract.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    future::Future,
    pin::Pin,
    sync::Arc,
};

use chrono::Utc;
use eventsub_client::{HelixRequest, HelixResponse, HelixTransport, TransportError};
use eventsub_core::{
    Condition, Conduit, Shard, ShardError, ShardStatus, ShardTransport, ShardUpdate, Subscription,
    SubscriptionStatus, Transport, TransportInfo,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct ShardSlot {
    status: ShardStatus,
    transport: Option<TransportInfo>,
}

impl ShardSlot {
    fn unassigned() -> Self {
        Self { status: ShardStatus::Disabled, transport: None }
    }
}

#[derive(Debug, Clone)]
struct ConduitState {
    shard_count: u32,
    slots: Vec<ShardSlot>,
}

impl ConduitState {
    fn new(shard_count: u32) -> Self {
        Self { shard_count, slots: vec![ShardSlot::unassigned(); shard_count as usize] }
    }

    fn to_conduit(&self, id: &str) -> Conduit {
        Conduit { id: id.to_string(), shard_count: self.shard_count }
    }
}

#[derive(Debug, Default)]
struct State {
    conduits: BTreeMap<String, ConduitState>,
    subscriptions: Vec<Subscription>,
    rejected_sessions: HashSet<String>,
    next_id: u64,
    page_size: usize,
    requests: Vec<HelixRequest>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory registry behaving like the Helix EventSub endpoints.
#[derive(Clone)]
pub struct FakeHelix {
    state: Arc<RwLock<State>>,
}

impl Default for FakeHelix {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHelix {
    /// Creates an empty registry with a page size of 100.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates an empty registry returning at most `page_size` items per page.
    pub fn with_page_size(page_size: usize) -> Self {
        let state = State { page_size: page_size.max(1), ..State::default() };
        Self { state: Arc::new(RwLock::new(state)) }
    }

    /// Seeds a conduit whose shards are all disabled and unassigned.
    pub async fn seed_conduit(&self, id: &str, shard_count: u32) {
        self.state.write().await.conduits.insert(id.to_string(), ConduitState::new(shard_count));
    }

    /// Seeds a subscription record.
    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.state.write().await.subscriptions.push(subscription);
    }

    /// Makes shard updates naming this websocket session fail.
    pub async fn reject_session(&self, session_id: &str) {
        self.state.write().await.rejected_sessions.insert(session_id.to_string());
    }

    /// Current shards of a conduit, or `None` if it does not exist.
    pub async fn shards(&self, conduit_id: &str) -> Option<Vec<Shard>> {
        let state = self.state.read().await;
        state.conduits.get(conduit_id).map(|conduit| to_shards(&conduit.slots))
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<HelixRequest> {
        self.state.read().await.requests.clone()
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }

    async fn handle(&self, request: HelixRequest) -> HelixResponse {
        let mut state = self.state.write().await;
        state.requests.push(request.clone());

        tracing::debug!(method = %request.method, path = request.path, "fake registry request");

        if request.credentials.client_id.is_empty() || request.credentials.access_token.is_empty() {
            return error(401, "Unauthorized", "invalid access token");
        }

        let result = match (request.method.as_str(), request.path) {
            ("POST", "/eventsub/conduits") => create_conduit(&mut state, &request),
            ("PATCH", "/eventsub/conduits") => update_conduit(&mut state, &request),
            ("GET", "/eventsub/conduits") => Ok(list_conduits(&state)),
            ("DELETE", "/eventsub/conduits") => delete_conduit(&mut state, &request),
            ("GET", "/eventsub/conduits/shards") => list_shards(&state, &request),
            ("PATCH", "/eventsub/conduits/shards") => update_shards(&mut state, &request),
            ("POST", "/eventsub/subscriptions") => create_subscription(&mut state, &request),
            ("GET", "/eventsub/subscriptions") => list_subscriptions(&state, &request),
            ("DELETE", "/eventsub/subscriptions") => delete_subscription(&mut state, &request),
            _ => Err(error(404, "Not Found", "unknown endpoint")),
        };

        result.unwrap_or_else(|response| response)
    }
}

impl HelixTransport for FakeHelix {
    fn send(
        &self,
        request: HelixRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HelixResponse, TransportError>> + Send + '_>> {
        Box::pin(async move { Ok(self.handle(request).await) })
    }
}

type Handled = Result<HelixResponse, HelixResponse>;

fn error(status: u16, error: &str, message: &str) -> HelixResponse {
    HelixResponse::json(status, &json!({"error": error, "status": status, "message": message}))
}

fn body<T: DeserializeOwned>(request: &HelixRequest) -> Result<T, HelixResponse> {
    let value = request.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| error(400, "Bad Request", &e.to_string()))
}

fn query<'a>(request: &'a HelixRequest, name: &str) -> Result<&'a str, HelixResponse> {
    request
        .query_param(name)
        .ok_or_else(|| error(400, "Bad Request", &format!("missing query parameter {name}")))
}

fn offset(request: &HelixRequest) -> Result<usize, HelixResponse> {
    match request.query_param("after") {
        None => Ok(0),
        Some(after) => after.parse().map_err(|_| error(400, "Bad Request", "invalid cursor")),
    }
}

/// Slices `items` from `offset` and builds the cursor for the next page.
fn page<T: Clone>(items: &[T], offset: usize, page_size: usize) -> (Vec<T>, Value) {
    let end = items.len().min(offset.saturating_add(page_size));
    let data = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
    let pagination = if end < items.len() { json!({"cursor": end.to_string()}) } else { json!({}) };
    (data, pagination)
}

fn to_shards(slots: &[ShardSlot]) -> Vec<Shard> {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| Shard {
            id: index.to_string(),
            status: slot.status,
            transport: slot.transport.clone(),
        })
        .collect()
}

#[derive(Deserialize)]
struct CreateConduitBody {
    shard_count: u32,
}

#[derive(Deserialize)]
struct UpdateConduitBody {
    id: String,
    shard_count: u32,
}

fn create_conduit(state: &mut State, request: &HelixRequest) -> Handled {
    let body: CreateConduitBody = body(request)?;
    let id = state.next_id("conduit");
    let conduit = ConduitState::new(body.shard_count);
    let response = json!({"data": [conduit.to_conduit(&id)]});
    state.conduits.insert(id, conduit);
    Ok(HelixResponse::json(200, &response))
}

fn update_conduit(state: &mut State, request: &HelixRequest) -> Handled {
    let body: UpdateConduitBody = body(request)?;
    let conduit = state
        .conduits
        .get_mut(&body.id)
        .ok_or_else(|| error(404, "Not Found", "conduit not found"))?;

    let shard_count = body.shard_count as usize;
    if shard_count < conduit.slots.len() {
        // Shards past the new count stop receiving events but stay listed
        for slot in &mut conduit.slots[shard_count..] {
            slot.status = ShardStatus::Disabled;
        }
    } else {
        conduit.slots.resize(shard_count, ShardSlot::unassigned());
    }
    conduit.shard_count = body.shard_count;

    let response = json!({"data": [conduit.to_conduit(&body.id)]});
    Ok(HelixResponse::json(200, &response))
}

fn list_conduits(state: &State) -> HelixResponse {
    let data: Vec<Conduit> =
        state.conduits.iter().map(|(id, conduit)| conduit.to_conduit(id)).collect();
    HelixResponse::json(200, &json!({"data": data}))
}

fn delete_conduit(state: &mut State, request: &HelixRequest) -> Handled {
    let id = query(request, "id")?;
    if state.conduits.remove(id).is_none() {
        return Err(error(404, "Not Found", "conduit not found"));
    }
    for subscription in &mut state.subscriptions {
        if matches!(&subscription.transport, TransportInfo::Conduit { conduit_id } if conduit_id == id)
        {
            subscription.status = SubscriptionStatus::ConduitDeleted;
        }
    }
    Ok(HelixResponse::empty(204))
}

fn list_shards(state: &State, request: &HelixRequest) -> Handled {
    let conduit_id = query(request, "conduit_id")?;
    let conduit = state
        .conduits
        .get(conduit_id)
        .ok_or_else(|| error(404, "Not Found", "conduit not found"))?;

    let status = request.query_param("status");
    let shards: Vec<Shard> = to_shards(&conduit.slots)
        .into_iter()
        .filter(|shard| status.map_or(true, |status| shard.status.as_str() == status))
        .collect();

    let (data, pagination) = page(&shards, offset(request)?, state.page_size);
    Ok(HelixResponse::json(200, &json!({"data": data, "pagination": pagination})))
}

#[derive(Deserialize)]
struct UpdateShardsBody {
    conduit_id: String,
    shards: Vec<ShardUpdate>,
}

fn update_shards(state: &mut State, request: &HelixRequest) -> Handled {
    let body: UpdateShardsBody = body(request)?;
    let rejected_sessions = state.rejected_sessions.clone();
    let conduit = state
        .conduits
        .get_mut(&body.conduit_id)
        .ok_or_else(|| error(404, "Not Found", "conduit not found"))?;
    let shard_count = conduit.shard_count as usize;

    let mut accepted = Vec::new();
    let mut errored = Vec::new();

    for update in body.shards {
        let slot = update
            .id
            .parse::<usize>()
            .ok()
            .filter(|index| *index < shard_count)
            .and_then(|index| conduit.slots.get_mut(index));
        let Some(slot) = slot else {
            errored.push(ShardError {
                id: update.id,
                code: "invalid_parameter".to_string(),
                message: "shard id out of range".to_string(),
            });
            continue;
        };

        let status = match &update.transport {
            ShardTransport::Websocket { session_id } if rejected_sessions.contains(session_id) => {
                errored.push(ShardError {
                    id: update.id,
                    code: "websocket_session_not_found".to_string(),
                    message: "session does not exist or has already disconnected".to_string(),
                });
                continue;
            },
            ShardTransport::Websocket { .. } => ShardStatus::Enabled,
            ShardTransport::Webhook { .. } => ShardStatus::WebhookCallbackVerificationPending,
        };

        slot.status = status;
        slot.transport = Some(TransportInfo::from(&update.transport));
        accepted.push(Shard { id: update.id, status, transport: slot.transport.clone() });
    }

    // The registry reports errors and successes in no guaranteed order
    errored.reverse();

    Ok(HelixResponse::json(202, &json!({"data": accepted, "errors": errored})))
}

#[derive(Deserialize)]
struct CreateSubscriptionBody {
    #[serde(rename = "type")]
    subscription_type: String,
    version: String,
    condition: Condition,
    transport: Transport,
}

fn create_subscription(state: &mut State, request: &HelixRequest) -> Handled {
    let body: CreateSubscriptionBody = body(request)?;

    if let Transport::Conduit { conduit_id } = &body.transport {
        if !state.conduits.contains_key(conduit_id) {
            return Err(error(400, "Bad Request", "conduit not found"));
        }
    }

    let duplicate = state.subscriptions.iter().any(|existing| {
        existing.subscription_type == body.subscription_type
            && existing.version == body.version
            && existing.condition == body.condition
            && existing.transport == TransportInfo::from(&body.transport)
    });
    if duplicate {
        return Err(error(409, "Conflict", "subscription already exists"));
    }

    let (status, cost) = match body.transport {
        Transport::Webhook { .. } => (SubscriptionStatus::WebhookCallbackVerificationPending, 1),
        Transport::Websocket { .. } | Transport::Conduit { .. } => {
            (SubscriptionStatus::Enabled, 0)
        },
    };
    let subscription = Subscription {
        id: state.next_id("subscription"),
        status,
        subscription_type: body.subscription_type,
        version: body.version,
        condition: body.condition,
        created_at: Utc::now(),
        transport: TransportInfo::from(&body.transport),
        cost,
    };
    state.subscriptions.push(subscription.clone());

    let total_cost: u32 = state.subscriptions.iter().map(|s| s.cost).sum();
    let response = json!({
        "data": [subscription],
        "total": state.subscriptions.len(),
        "total_cost": total_cost,
        "max_total_cost": 10000,
    });
    Ok(HelixResponse::json(202, &response))
}

fn list_subscriptions(state: &State, request: &HelixRequest) -> Handled {
    let status = request.query_param("status");
    let subscription_type = request.query_param("type");
    let user_id = request.query_param("user_id");

    let matching: Vec<Subscription> = state
        .subscriptions
        .iter()
        .filter(|s| status.map_or(true, |status| s.status.as_str() == status))
        .filter(|s| subscription_type.map_or(true, |t| s.subscription_type == t))
        .filter(|s| user_id.map_or(true, |user| s.condition.values().any(|value| value == user)))
        .cloned()
        .collect();

    let total_cost: u32 = matching.iter().map(|s| s.cost).sum();
    let (data, pagination) = page(&matching, offset(request)?, state.page_size);
    let response = json!({
        "data": data,
        "total": matching.len(),
        "total_cost": total_cost,
        "max_total_cost": 10000,
        "pagination": pagination,
    });
    Ok(HelixResponse::json(200, &response))
}

fn delete_subscription(state: &mut State, request: &HelixRequest) -> Handled {
    let id = query(request, "id")?;
    let before = state.subscriptions.len();
    state.subscriptions.retain(|subscription| subscription.id != id);
    if state.subscriptions.len() == before {
        return Err(error(404, "Not Found", "subscription not found"));
    }
    Ok(HelixResponse::empty(204))
}

/// Shards grouped by status, for assertions.
pub fn by_status(shards: &[Shard]) -> HashMap<ShardStatus, Vec<u32>> {
    let mut grouped: HashMap<ShardStatus, Vec<u32>> = HashMap::new();
    for shard in shards {
        if let Some(index) = shard.index() {
            grouped.entry(shard.status).or_default().push(index);
        }
    }
    grouped
}
