//! Shared application state.

use std::sync::Arc;

use storefront_db::Database;

use crate::auth::JwtValidator;
use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::pdf::InvoiceRenderer;

/// Everything a handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtValidator,
    pub mailer: Arc<dyn Mailer>,
    pub renderer: InvoiceRenderer,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the state from configuration, a database handle and a mailer.
    pub fn new(config: AppConfig, db: Database, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = JwtValidator::new(&config.jwt_secret);
        let renderer = InvoiceRenderer::new(config.company.clone(), config.currency_prefix.clone());
        AppState {
            db,
            jwt,
            mailer,
            renderer,
            config: Arc::new(config),
        }
    }

    pub fn currency_prefix(&self) -> &str {
        &self.config.currency_prefix
    }
}
