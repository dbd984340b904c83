use std::io::Error;

use message_dispatch::{presentation::webhook::webhook_app, telemetry::init_tracing};
use poem::{Server, listener::TcpListener};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    init_tracing(false);

    let port: u16 = match std::env::var("WEBHOOK_PORT") {
        Ok(raw) => raw.parse().map_err(Error::other)?,
        Err(_) => 8090,
    };

    info!(port, "webhook server listening");
    Server::new(TcpListener::bind(format!("0.0.0.0:{port}")))
        .run(webhook_app())
        .await
}
