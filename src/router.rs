use crate::db::DbPool;
use crate::handlers::{self, messages, people};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub const PEOPLE_PATH: &str = "/api/people";
pub const MESSAGES_PATH: &str = "/api/messages";

pub fn app(pool: DbPool) -> Router {
    // Preflight OPTIONS requests are answered here without reaching a handler.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let people_routes = Router::new()
        .route(
            PEOPLE_PATH,
            get(people::get_people)
                .post(people::create_person)
                .put(people::update_person)
                .delete(people::delete_person)
                .fallback(handlers::method_not_allowed),
        )
        .layer(cors);

    let message_routes = Router::new().route(
        MESSAGES_PATH,
        get(messages::get_messages)
            .post(messages::create_message)
            .fallback(handlers::method_not_allowed),
    );

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(people_routes)
        .merge(message_routes)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}
