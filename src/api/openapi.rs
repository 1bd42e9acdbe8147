use super::handlers::{admin, auth, health};
use utoipa::openapi::{Contact, InfoBuilder, License};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::login,
        auth::session::logout,
        auth::session::session,
        admin::dashboard,
    ),
    components(schemas(
        health::Health,
        auth::types::AuthAdmin,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::MessageResponse,
        auth::types::ErrorResponse,
    )),
    tags(
        (name = "auth", description = "Admin login, logout and session lookup"),
        (name = "admin", description = "Session-gated admin area"),
        (name = "health", description = "Liveness and database status"),
    )
)]
struct ApiDoc;

/// Generated `OpenAPI` document, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    non_empty(value)
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Shopkeeper"));
        assert_eq!(contact.email.as_deref(), Some("team@shopkeeper.dev"));

        let license = doc.info.license.map(|license| license.name);
        assert_eq!(license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn openapi_documents_auth_routes() {
        let doc = openapi();
        for path in [
            "/health",
            "/api/auth/admin/login",
            "/api/auth/admin/logout",
            "/api/auth/admin/session",
            "/admin/dashboard",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author("<jane@example.com>"), (None, Some("jane@example.com")));
    }
}
