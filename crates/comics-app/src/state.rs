use std::{sync::Arc, time::Duration};

use comics_dal::Pool;

use crate::auth::Authorizer;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, authorizer: Arc<dyn Authorizer>) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                authorizer,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        self.state.authorizer.clone()
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    authorizer: Arc<dyn Authorizer>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_page_size: u32,
    /// Deadline for a single repository call
    pub store_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_page_size: DEFAULT_PAGE_SIZE,
            store_timeout: comics_dal::DEFAULT_TIMEOUT,
        }
    }
}
