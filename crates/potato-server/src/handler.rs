use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use potato_custody::{
    ActorPotatoes, AuditReport, CustodyError, CustodyResult, OwnershipService, ReceiverResolver,
    Rejection,
};
use potato_store::ChainStore;
use potato_types::{Potato, PotatoId};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServerError, ServerResult};

/// Ownership service with the store and resolver chosen at runtime.
pub type DynOwnershipService = OwnershipService<Box<dyn ChainStore>, Box<dyn ReceiverResolver>>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<DynOwnershipService>,
}

impl AppState {
    pub fn new(service: DynOwnershipService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Run a service call on the blocking pool.
    ///
    /// The spawned task owns its own handle to the service, so dropping the
    /// request future (client gone, upstream timeout) does not interrupt a
    /// critical section that has already started.
    async fn run<T, F>(&self, call: F) -> ServerResult<T>
    where
        F: FnOnce(&DynOwnershipService) -> CustodyResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let outcome = tokio::task::spawn_blocking(move || call(&service))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        Ok(outcome?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePotatoBody {
    pub creator: String,
    #[serde(default)]
    pub score: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub sender: String,
    pub receiver: String,
}

/// A malformed id cannot name a stored potato.
fn parse_potato_id(raw: &str) -> ServerResult<PotatoId> {
    raw.parse().map_err(|_| {
        ServerError::Custody(CustodyError::Rejected(Rejection::NotFound {
            potato_id: raw.to_string(),
        }))
    })
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "potato-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_potato(
    State(state): State<AppState>,
    body: Result<Json<CreatePotatoBody>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Potato>)> {
    let Json(body) = body?;
    let potato = state
        .run(move |svc| svc.create_with_score(&body.creator, body.score))
        .await?;
    Ok((StatusCode::CREATED, Json(potato)))
}

pub async fn list_potatoes(State(state): State<AppState>) -> ServerResult<Json<Vec<Potato>>> {
    let potatoes = state.run(|svc| svc.list()).await?;
    Ok(Json(potatoes))
}

pub async fn get_potato(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<Potato>> {
    let id = parse_potato_id(&raw_id)?;
    let potato = state.run(move |svc| svc.get(&id)).await?;
    potato.map(Json).ok_or_else(|| {
        ServerError::Custody(CustodyError::Rejected(Rejection::NotFound {
            potato_id: raw_id,
        }))
    })
}

pub async fn transfer_potato(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> ServerResult<Json<Potato>> {
    let Json(body) = body?;
    let id = parse_potato_id(&raw_id)?;
    let potato = state
        .run(move |svc| svc.transfer(&id, &body.sender, &body.receiver))
        .await?;
    Ok(Json(potato))
}

pub async fn actor_potatoes(
    State(state): State<AppState>,
    Path(actor): Path<String>,
) -> ServerResult<Json<ActorPotatoes>> {
    let potatoes = state.run(move |svc| svc.query_by_actor(&actor)).await?;
    Ok(Json(potatoes))
}

pub async fn audit_handler(State(state): State<AppState>) -> ServerResult<Json<AuditReport>> {
    let report = state.run(|svc| svc.audit()).await?;
    Ok(Json(report))
}
