use poem::handler;

#[handler]
pub async fn healthz() -> &'static str {
    "ok"
}
