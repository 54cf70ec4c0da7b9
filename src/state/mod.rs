//! Shared application state: the room registry and the repository handle.

pub mod room;
pub mod store;

use std::sync::Arc;

use crate::{config::AppConfig, dao::repository::GameRepository, state::store::RoomStore};

/// Cheaply-cloneable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state shared by every connection and route.
pub struct AppState {
    rooms: RoomStore,
    repository: Arc<dyn GameRepository>,
    config: AppConfig,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(repository: Arc<dyn GameRepository>, config: AppConfig) -> SharedState {
        Arc::new(Self {
            rooms: RoomStore::new(),
            repository,
            config,
        })
    }

    /// Registry of live rooms.
    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    /// Repository backing game metadata, the question bank, and history.
    pub fn repository(&self) -> &Arc<dyn GameRepository> {
        &self.repository
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
