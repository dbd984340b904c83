use std::sync::Arc;

use poem_openapi::Tags;
use tokio_util::sync::CancellationToken;

use crate::application::{
    services::dispatch_scheduler::DispatchScheduler,
    usecases::{
        create_message::CreateMessageUseCase, list_sent_messages::ListSentMessagesUseCase,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub create_message_usecase: Arc<CreateMessageUseCase>,
    pub list_sent_usecase: Arc<ListSentMessagesUseCase>,
    pub scheduler: Arc<DispatchScheduler>,
    /// Process-wide token; scheduler runs started over HTTP hang off it, not
    /// off the request.
    pub root: CancellationToken,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Messages,
    Scheduler,
}
