use super::handlers::{auth, health, me};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// The documented API surface. New endpoints go through `.routes(routes!(...))`
/// so they are both served and described; undocumented extras (`/` and
/// `OPTIONS /health`) are added in `api::app` instead.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(base_document())
        .routes(routes!(health::health))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::reset::request_reset))
        .routes(routes!(auth::reset::consume_reset))
        .routes(routes!(auth::external::status))
        .routes(routes!(auth::external::callback))
        .routes(routes!(auth::admin::toggle_external))
        .routes(routes!(me::get_me))
        .routes(routes!(me::update_me))
        .routes(routes!(me::change_password));

    router.get_openapi_mut().tags = Some(vec![
        tag(
            "auth",
            "Registration, login, password reset and external identities",
        ),
        tag("me", "Authenticated self-service"),
        tag("admin", "Admin-only runtime toggles"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

// Seed the document with Cargo.toml metadata rather than the utoipa defaults.
fn base_document() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = contact_from_authors(env!("CARGO_PKG_AUTHORS"));
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });
    OpenApiBuilder::new().info(info).build()
}

// `CARGO_PKG_AUTHORS` joins "Name <email>" entries with `:`; take the first.
fn contact_from_authors(authors: &'static str) -> Option<Contact> {
    let primary = authors
        .split(':')
        .next()
        .map(str::trim)
        .filter(|author| !author.is_empty())?;
    let mut contact = Contact::new();
    match primary.split_once('<') {
        Some((name, rest)) => {
            contact.name = non_empty(name).map(str::to_string);
            contact.email = non_empty(rest.trim_end_matches('>')).map(str::to_string);
        }
        None => contact.name = Some(primary.to_string()),
    }
    if contact.name.is_none() && contact.email.is_none() {
        return None;
    }
    Some(contact)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
