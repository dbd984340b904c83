use std::sync::Arc;

use poem_openapi::{OpenApi, payload::PlainText};

use crate::presentation::http::endpoints::root::{ApiState, EndpointsTags};

#[derive(Clone)]
pub struct SchedulerEndpoints {
    state: Arc<ApiState>,
}

impl SchedulerEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl SchedulerEndpoints {
    #[oai(path = "/scheduler/start", method = "post", tag = EndpointsTags::Scheduler)]
    pub async fn start(&self) -> PlainText<&'static str> {
        self.state.scheduler.start(&self.state.root);
        PlainText("scheduler started")
    }

    #[oai(path = "/scheduler/stop", method = "post", tag = EndpointsTags::Scheduler)]
    pub async fn stop(&self) -> PlainText<&'static str> {
        self.state.scheduler.stop("scheduler stopped by API");
        PlainText("scheduler stopped")
    }
}
