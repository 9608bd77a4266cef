use gmv_core::{AppConfig, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: SessionRegistry,
}
