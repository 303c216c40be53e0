use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::middleware::require_admin;
use crate::{AppState, offers, recharges, sellers, users};

/// Every panel route. Everything under `/admin` sits behind the admin gate.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/stats", get(users::stats))
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::get_user).delete(users::delete_user))
        .route("/users/{user_id}/credit", post(users::credit_user))
        .route("/seller-numbers", get(sellers::list))
        .route("/seller-numbers/{id}", delete(sellers::delete))
        .route("/seller-numbers/{id}/approve", post(sellers::approve))
        .route("/seller-numbers/{id}/reject", post(sellers::reject))
        .route("/seller-numbers/{id}/grant-code-entry", post(sellers::grant_code_entry))
        .route("/seller-numbers/{id}/approve-code", post(sellers::approve_code))
        .route("/seller-numbers/{id}/phone", put(sellers::edit_phone))
        .route("/recharge-requests", get(recharges::list))
        .route("/recharge-requests/{id}/complete", post(recharges::complete))
        .route("/recharge-requests/{id}/reject", post(recharges::reject))
        .route("/offers", get(offers::list).post(offers::create))
        .route("/offers/{id}", delete(offers::delete))
        .route("/offers/{id}/active", put(offers::set_active))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state);

    Router::new()
        .nest("/admin", admin)
        .route("/health", get(|| async { "OK" }))
}
