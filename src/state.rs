use crate::config::{AppConfig, StorageBackend};
use crate::db;
use crate::users::{
    memory::InMemoryUserRepository,
    repo::{PgUserRepository, UserRepository},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let users = match config.storage {
            StorageBackend::Postgres => {
                let pool = db::connect(&config).await?;
                db::migrate(&pool).await;
                Arc::new(PgUserRepository::new(pool)) as Arc<dyn UserRepository>
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory user storage; data is lost on restart");
                Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>
            }
        };

        Ok(Self { users, config })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            storage: StorageBackend::Memory,
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            log: crate::config::LogConfig {
                filter: "users_api=debug".into(),
                json: false,
            },
        });
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            config,
        }
    }
}
