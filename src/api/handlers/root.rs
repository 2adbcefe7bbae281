use axum::response::IntoResponse;

/// Undocumented landing route; points callers at the API.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
