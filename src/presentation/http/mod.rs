use std::sync::Arc;

use poem::{Route, get};
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    health::healthz, messages::MessagesEndpoints, root::ApiState, scheduler::SchedulerEndpoints,
};

pub mod endpoints;
pub mod mappers;
pub mod requests;
pub mod responses;

/// `/healthz`, the API under `/api/v1` and, with `with_docs`, Swagger UI at `/`.
pub fn build_app(state: Arc<ApiState>, server_url: &str, with_docs: bool) -> Route {
    let api_service = OpenApiService::new(
        (
            MessagesEndpoints::new(state.clone()),
            SchedulerEndpoints::new(state),
        ),
        "Message Dispatch API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{server_url}/api/v1"));
    let ui = api_service.swagger_ui();

    let app = Route::new()
        .at("/healthz", get(healthz))
        .nest("/api/v1", api_service);
    if with_docs { app.nest("/", ui) } else { app }
}
