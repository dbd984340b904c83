use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{
    ApiResponse, OpenApi,
    param::Query,
    payload::{Json, PlainText},
};
use tracing::error;

use crate::{
    application::usecases::create_message::CreateMessageRequest,
    domain::errors::DomainError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::map_message,
        requests::CreateMessageRequestDto,
        responses::MessageDto,
    },
};

#[derive(ApiResponse)]
pub enum CreateMessageResponse {
    /// Stored as pending; a later tick delivers it.
    #[oai(status = 201)]
    Created(Json<MessageDto>),
    #[oai(status = 400)]
    BadRequest(PlainText<String>),
}

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(path = "/messages", method = "post", tag = EndpointsTags::Messages)]
    pub async fn create_message(
        &self,
        request: Json<CreateMessageRequestDto>,
    ) -> PoemResult<CreateMessageResponse> {
        let Json(request) = request;
        let result = self
            .state
            .create_message_usecase
            .execute(CreateMessageRequest {
                to: request.to,
                content: request.content,
            })
            .await;

        match result {
            Ok(message) => Ok(CreateMessageResponse::Created(Json(map_message(&message)))),
            Err(err @ DomainError::Validation(_)) => {
                Ok(CreateMessageResponse::BadRequest(PlainText(err.to_string())))
            }
            Err(err) => Err(internal_error(err)),
        }
    }

    /// Sent messages, newest first.
    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_messages(
        &self,
        limit: Query<Option<i64>>,
        offset: Query<Option<i64>>,
    ) -> PoemResult<Json<Vec<MessageDto>>> {
        let messages = self
            .state
            .list_sent_usecase
            .execute(limit.0, offset.0)
            .await
            .map_err(internal_error)?;

        Ok(Json(messages.iter().map(map_message).collect()))
    }
}

fn internal_error(err: DomainError) -> poem::Error {
    error!(error = %err, "messages endpoint failed");
    poem::Error::from_string(
        err.to_string(),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}

#[cfg(test)]
mod tests {
    use poem::{http::StatusCode, test::TestClient};
    use serde_json::json;

    use crate::{
        domain::{models::MAX_CONTENT_LENGTH, repositories::MessageStore},
        test_support::{FakeStore, test_app},
    };

    #[tokio::test]
    async fn creates_a_pending_message() {
        let (app, store, _) = test_app(FakeStore::default());
        let client = TestClient::new(app);

        let resp = client
            .post("/api/v1/messages")
            .body_json(&json!({ "to": "+905551111111", "content": "Insider - Project" }))
            .send()
            .await;

        resp.assert_status(StatusCode::CREATED);
        let body = resp.json().await;
        let body = body.value().object();
        body.get("to").assert_string("+905551111111");
        body.get("status").assert_string("pending");
        body.get("attempt_count").assert_i64(0);
        assert_eq!(store.claim_batch(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_content_over_the_limit() {
        let (app, store, _) = test_app(FakeStore::default());
        let client = TestClient::new(app);

        let resp = client
            .post("/api/v1/messages")
            .body_json(&json!({ "to": "+905551111111", "content": "x".repeat(MAX_CONTENT_LENGTH + 1) }))
            .send()
            .await;

        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(store.claim_batch(10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn lists_sent_messages_only() {
        let (store, ids) = FakeStore::seeded(3).await;
        store
            .inner
            .mark_sent(ids[1], "mid-1", chrono::Utc::now())
            .await
            .unwrap();
        let (app, _, _) = test_app(store);
        let client = TestClient::new(app);

        let resp = client
            .get("/api/v1/messages")
            .query("limit", &-1)
            .query("offset", &-5)
            .send()
            .await;

        resp.assert_status_is_ok();
        let body = resp.json().await;
        let items = body.value().array();
        items.assert_len(1);
        let first = items.get(0).object();
        first.get("id").assert_string(&ids[1].to_string());
        first.get("status").assert_string("sent");
        first.get("provider_message_id").assert_string("mid-1");
    }
}
