use anyhow::{anyhow, Context, Result};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{
    log_requests, session::Session, state::*, validation::is_valid_identifier, ServerConfig,
};
use crate::identity::IdentityResolver;
use crate::lists::{ListError, ListManager, ListName, StoreError};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct AddItemBody {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct WatchersResponse {
    pub item_id: String,
    pub watchers: usize,
}

/// Runs a list operation on the blocking pool.
///
/// The manager enforces the store timeout itself, so the outcome reported here is
/// always the one the store ended up with.
async fn run_list_op<T, F>(list_manager: GuardedListManager, op: F) -> Result<T, ListError>
where
    T: Send + 'static,
    F: FnOnce(&ListManager) -> Result<T, ListError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&list_manager))
        .await
        .map_err(|join_error| {
            ListError::from(StoreError::Other(anyhow!(
                "List operation did not complete: {}",
                join_error
            )))
        })?
}

fn list_error_response(err: ListError) -> Response {
    match err {
        ListError::Contention { .. } => {
            warn!("{}", err);
            StatusCode::CONFLICT.into_response()
        }
        ListError::Store(StoreError::Timeout) => {
            error!("{}", err);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        err => {
            error!("List operation failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn parse_list_name(list: &str) -> Result<ListName, Response> {
    list.parse::<ListName>().map_err(|err| {
        debug!("{}", err);
        StatusCode::NOT_FOUND.into_response()
    })
}

fn require_identifier(item_id: &str) -> Result<(), Response> {
    if is_valid_identifier(item_id) {
        Ok(())
    } else {
        debug!("Rejecting malformed item id {:?}", item_id);
        Err(StatusCode::BAD_REQUEST.into_response())
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn get_all_lists(
    session: Session,
    State(list_manager): State<GuardedListManager>,
) -> Response {
    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.get_lists(&owner)).await {
        Ok(lists) => {
            let lists: BTreeMap<&'static str, Vec<String>> = lists
                .into_iter()
                .map(|(list, document)| (list.as_str(), document.item_ids))
                .collect();
            Json(lists).into_response()
        }
        Err(err) => list_error_response(err),
    }
}

async fn get_list(
    session: Session,
    State(list_manager): State<GuardedListManager>,
    Path(list): Path<String>,
) -> Response {
    let list = match parse_list_name(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };

    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.get_list(&owner, list)).await {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => list_error_response(err),
    }
}

async fn add_item(
    session: Session,
    State(list_manager): State<GuardedListManager>,
    Path(list): Path<String>,
    body: Result<Json<AddItemBody>, JsonRejection>,
) -> Response {
    let list = match parse_list_name(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };
    let item_id = match body {
        Ok(Json(body)) => body.id,
        Err(rejection) => {
            debug!("Rejecting add body: {}", rejection);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if let Err(response) = require_identifier(&item_id) {
        return response;
    }

    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.add_item(&owner, list, &item_id)).await {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(err) => list_error_response(err),
    }
}

async fn get_item(
    session: Session,
    State(list_manager): State<GuardedListManager>,
    Path((list, item_id)): Path<(String, String)>,
) -> Response {
    let list = match parse_list_name(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };
    if let Err(response) = require_identifier(&item_id) {
        return response;
    }

    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.contains_item(&owner, list, &item_id)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => list_error_response(err),
    }
}

async fn remove_item(
    session: Session,
    State(list_manager): State<GuardedListManager>,
    Path((list, item_id)): Path<(String, String)>,
) -> Response {
    let list = match parse_list_name(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };
    if let Err(response) = require_identifier(&item_id) {
        return response;
    }

    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.remove_item(&owner, list, &item_id)).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => list_error_response(err),
    }
}

async fn remove_list(
    session: Session,
    State(list_manager): State<GuardedListManager>,
    Path(list): Path<String>,
) -> Response {
    let list = match parse_list_name(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };

    let owner = session.owner_id;
    match run_list_op(list_manager, move |m| m.remove_all(&owner, list)).await {
        Ok(()) => StatusCode::GONE.into_response(),
        Err(err) => list_error_response(err),
    }
}

async fn get_watchers(
    State(list_manager): State<GuardedListManager>,
    Path(item_id): Path<String>,
) -> Response {
    if let Err(response) = require_identifier(&item_id) {
        return response;
    }

    let counted_id = item_id.clone();
    match run_list_op(list_manager, move |m| m.count_watchers(&counted_id)).await {
        Ok(watchers) => Json(WatchersResponse { item_id, watchers }).into_response(),
        Err(err) => list_error_response(err),
    }
}

pub fn make_app(
    config: ServerConfig,
    list_manager: ListManager,
    identity_resolver: Arc<dyn IdentityResolver>,
) -> Router {
    let state = ServerState::new(config, list_manager, identity_resolver);

    let list_routes: Router = Router::new()
        .route("/v1/lists", get(get_all_lists))
        .route(
            "/v1/lists/{list}",
            get(get_list).post(add_item).delete(remove_list),
        )
        .route(
            "/v1/lists/{list}/{item_id}",
            get(get_item).delete(remove_item),
        )
        .with_state(state.clone());

    let item_routes: Router = Router::new()
        .route("/v1/items/{item_id}/watchers", get(get_watchers))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    home_router
        .merge(list_routes)
        .merge(item_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            log_requests,
        ))
}

pub async fn run_server(
    config: ServerConfig,
    list_manager: ListManager,
    identity_resolver: Arc<dyn IdentityResolver>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, list_manager, identity_resolver);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
