use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::MessageStatusDto;

#[derive(Object, Debug)]
#[oai(rename_all = "snake_case")]
pub struct MessageDto {
    pub id: Uuid,
    pub to: String,
    pub content: String,
    pub status: MessageStatusDto,
    pub provider_message_id: Option<String>,
    pub attempt_count: u32,
    pub created_at: String,
    pub updated_at: String,
    pub sent_at: Option<String>,
    pub last_error: Option<String>,
}
