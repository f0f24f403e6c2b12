use std::sync::Arc;

use sqlx::PgPool;

use super::{
    config::Config,
    database::{init_db, init_pool},
};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let pool = init_pool(&config.database_url).await;
        init_db(&pool).await.expect("Schema initialization failed");

        Arc::new(Self { config, pool })
    }
}
