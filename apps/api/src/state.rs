use std::sync::Arc;

use crate::config::Config;
use crate::sms::gateway::SmsGateway;
use crate::sms::shortener::UrlShortener;
use crate::store::ReviewStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Cities, technicians, templates and SMS records. `PgStore` in production.
    pub store: Arc<dyn ReviewStore>,
    pub shortener: Arc<dyn UrlShortener>,
    /// Mock or SimpleTexting, fixed at startup from `Config::sms_mock_mode`.
    pub sms: Arc<dyn SmsGateway>,
    pub config: Config,
}
