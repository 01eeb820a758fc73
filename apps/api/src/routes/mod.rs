pub mod health;
pub mod reference;
pub mod url;

use axum::{
    routing::{get, post},
    Router,
};

use crate::sms::handlers as sms;
use crate::state::AppState;
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // SMS review requests
        .route("/api/sms/send", post(sms::handle_send_sms))
        .route(
            "/api/sms/status/:message_id",
            get(sms::handle_message_status),
        )
        .route("/api/sms/history", get(sms::handle_history))
        .route("/api/sms/reconcile", post(sms::handle_reconcile))
        // Reference data
        .route("/api/cities", get(reference::handle_list_cities))
        .route("/api/technicians", get(reference::handle_list_technicians))
        // Message templates
        .route(
            "/api/sms-templates",
            get(templates::handle_list_templates).post(templates::handle_create_template),
        )
        .route(
            "/api/sms-templates/:id",
            get(templates::handle_get_template)
                .put(templates::handle_update_template)
                .delete(templates::handle_delete_template),
        )
        .route(
            "/api/sms-templates/:id/default",
            post(templates::handle_set_default_template),
        )
        .route(
            "/api/admin/message-template",
            get(templates::handle_get_admin_template).put(templates::handle_update_admin_template),
        )
        // URL shortener
        .route("/api/url/shorten", post(url::handle_shorten))
        .route("/api/url/expand", post(url::handle_expand))
        .with_state(state)
}
