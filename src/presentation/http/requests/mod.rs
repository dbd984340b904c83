use poem_openapi::Object;

#[derive(Object, Debug)]
pub struct CreateMessageRequestDto {
    pub to: String,
    pub content: String,
}
