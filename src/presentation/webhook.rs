//! Stand-in provider that accepts every request and hands back a fresh id.

use std::collections::BTreeMap;

use poem::{Body, Endpoint, Request, handler, http::StatusCode, web::Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

const MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Inbound {
    to: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct Accepted {
    message: &'static str,
    #[serde(rename = "messageId")]
    message_id: String,
}

#[handler]
async fn receive(req: &Request, body: Body) -> (StatusCode, Json<Accepted>) {
    let message_id = Uuid::new_v4().to_string();
    let headers: BTreeMap<&str, &str> = req
        .headers()
        .iter()
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("<binary>")))
        .collect();

    // Over-limit bodies are logged like any other undecodable body.
    let decoded = match body.into_bytes_limit(MAX_BODY_BYTES).await {
        Ok(bytes) => serde_json::from_slice::<Inbound>(&bytes).map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };

    match decoded {
        Ok(inbound) => info!(
            method = %req.method(),
            url = %req.uri(),
            ?headers,
            to = inbound.to.trim(),
            content = inbound.content.trim(),
            %message_id,
            "webhook received"
        ),
        Err(err) => warn!(
            method = %req.method(),
            url = %req.uri(),
            ?headers,
            decode_error = %err,
            %message_id,
            "webhook received undecodable body"
        ),
    }

    (
        StatusCode::ACCEPTED,
        Json(Accepted {
            message: "Accepted",
            message_id,
        }),
    )
}

/// Any method, any path. Bodies are capped at 1 MiB while reading.
pub fn webhook_app() -> impl Endpoint {
    receive
}
