use crate::{domain::models::Message, presentation::http::responses::MessageDto};

pub fn map_message(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id,
        to: message.recipient.clone(),
        content: message.content.clone(),
        status: message.status.into(),
        provider_message_id: message.provider_reference.clone(),
        attempt_count: message.attempt_count,
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
        sent_at: message.sent_at.map(|at| at.to_rfc3339()),
        last_error: message.last_error.clone(),
    }
}
