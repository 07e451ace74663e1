use axum::extract::FromRef;

use crate::identity::IdentityResolver;
use crate::lists::ListManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedListManager = Arc<ListManager>;
pub type GuardedIdentityResolver = Arc<dyn IdentityResolver>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub list_manager: GuardedListManager,
    pub identity_resolver: GuardedIdentityResolver,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        list_manager: ListManager,
        identity_resolver: GuardedIdentityResolver,
    ) -> ServerState {
        ServerState {
            list_manager: Arc::new(list_manager.with_op_timeout(config.store_timeout)),
            config,
            start_time: Instant::now(),
            identity_resolver,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedListManager {
    fn from_ref(input: &ServerState) -> Self {
        input.list_manager.clone()
    }
}
