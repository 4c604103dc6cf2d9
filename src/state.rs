use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::{AuthConfig, Config};
use crate::entities::{connect, setup_schema, user::Role};
use crate::error::StartupError;
use crate::middleware::auth::AuthState;
use crate::seed::seed_database;
use crate::sentiment::SentimentClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub sentiment: Arc<SentimentClient>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, StartupError> {
        let db = connect(&config.database_url, config.db_max_connections).await?;
        setup_schema(&db).await?;

        if config.seed_database {
            seed_database(&db).await?;
        }

        let sentiment = SentimentClient::new(&config.sentiment)?;
        info!(
            require_auth = config.auth.require_auth,
            sentiment_url = %config.sentiment.api_url,
            "Application state ready"
        );

        Ok(Self {
            db: Arc::new(db),
            sentiment: Arc::new(sentiment),
            auth: Arc::new(config.auth.clone()),
        })
    }

    /// Gate that always applies.
    pub fn auth_gate(&self, role: Option<Role>) -> AuthState {
        AuthState {
            db: self.db.clone(),
            secret: Arc::from(self.auth.jwt_secret.as_str()),
            role,
        }
    }

    /// Gate for product and review mutations; absent unless `REQUIRE_AUTH`
    /// is switched on.
    pub fn write_gate(&self, role: Option<Role>) -> Option<AuthState> {
        self.auth
            .require_auth
            .then(|| self.auth_gate(role))
    }
}
