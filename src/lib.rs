pub mod api;
pub mod auth;
pub mod codec;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{api_key_auth_middleware, require_roles};
use crate::state::AppState;
use crate::types::Operation;

/// Builds the full router: public routes, then API-key protected routes each
/// carrying the role requirement of its operation.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .merge(action_routes())
        .merge(user_routes())
        // Authentication runs before every per-route role check
        .route_layer(from_fn_with_state(state.clone(), api_key_auth_middleware))
        .merge(public_routes())
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    let router = if config.security.enable_cors {
        router.layer(cors_layer(&config.security))
    } else {
        router
    };

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
}

fn action_routes() -> Router<AppState> {
    use protected::action;

    Router::new()
        .route("/action/insertOne", guarded(Operation::InsertOne, post(action::insert_one)))
        .route("/action/insertMany", guarded(Operation::InsertMany, post(action::insert_many)))
        .route("/action/findOne", guarded(Operation::FindOne, post(action::find_one)))
        .route("/action/find", guarded(Operation::Find, post(action::find)))
        .route("/action/updateOne", guarded(Operation::UpdateOne, post(action::update_one)))
        .route("/action/update", guarded(Operation::Update, post(action::update)))
        .route("/action/deleteOne", guarded(Operation::DeleteOne, post(action::delete_one)))
        .route("/action/delete", guarded(Operation::Delete, post(action::delete)))
        .route("/action/aggregate", guarded(Operation::Aggregate, post(action::aggregate)))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new().route(
        "/users",
        guarded(Operation::CreatePrincipal, post(users::create_user))
            .merge(guarded(Operation::ListPrincipals, get(users::list_users))),
    )
}

/// Attaches the operation's required-role check to a route.
fn guarded(operation: Operation, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(operation, require_roles))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
