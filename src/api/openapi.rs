use super::handlers::{auth, health, me};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::{Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut pordisto_tag = Tag::new("pordisto");
    pordisto_tag.description = Some("Opaque session token API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, session introspection and logout".to_string());

    let mut me_tag = Tag::new("me");
    me_tag.description = Some("Authenticated self-service".to_string());

    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![pordisto_tag, auth_tag, me_tag]);

    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(me::get_me, me::delete_me))
        .routes(routes!(me::change_password))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let mut components = Components::new();
    components.add_security_scheme(
        "basic_auth",
        SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
    );
    components.add_security_scheme(
        "bearer_auth",
        SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
    );

    OpenApiBuilder::new()
        .info(info)
        .components(Some(components))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may carry "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next()?.trim();
    if primary.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    if let Some((name, email)) = primary.split_once('<') {
        let name = name.trim();
        let email = email.trim_end_matches('>').trim();
        contact.name = (!name.is_empty()).then(|| name.to_string());
        contact.email = (!email.is_empty()).then(|| email.to_string());
    } else {
        contact.name = Some(primary.to_string());
    }
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
