use crate::api::attendance::{AttendanceFilter, AttendanceListResponse, ScanRequest};
use crate::api::users::{CreateUser, UpdateUser, UserListResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceType};
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterReqDto, TokenPair};
use crate::service::users::IdCard;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Attendance API",
        version = "1.0.0",
        description = r#"
## QR Attendance

Teachers register their attendance by scanning the QR code printed on their ID card.

### 🔹 Key Features
- **Attendance**
  - Scan a QR code; ENTRY or EXIT is inferred from the day's records
  - Own history, today's records, admin reports by date range
- **Users**
  - Add, edit and deactivate teacher accounts
  - ID card data with the QR payload

### 🔐 Security
Endpoints under the API prefix require a **JWT Bearer** access token.
User management and reports are restricted to **Admin**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::scan,
        crate::api::attendance::my_attendance,
        crate::api::attendance::today,
        crate::api::attendance::list_attendance,
        crate::api::attendance::user_attendance,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::id_card
    ),
    components(
        schemas(
            RegisterReqDto,
            LoginReqDto,
            TokenPair,
            AttendanceType,
            AttendanceRecord,
            ScanRequest,
            AttendanceFilter,
            AttendanceListResponse,
            User,
            CreateUser,
            UpdateUser,
            UserListResponse,
            IdCard
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and tokens"),
        (name = "Attendance", description = "QR scans and attendance reports"),
        (name = "Users", description = "Teacher account management"),
    )
)]
pub struct ApiDoc;

/// Prefix the handler annotations are written against.
const DOCUMENTED_PREFIX: &str = "/api";

/// The document with protected paths moved under the configured prefix.
pub fn openapi_for(api_prefix: &str) -> openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if api_prefix == DOCUMENTED_PREFIX {
        return doc;
    }

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| match path.strip_prefix(DOCUMENTED_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                (format!("{api_prefix}{rest}"), item)
            }
            _ => (path, item),
        })
        .collect();
    doc
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/auth/login",
            "/api/attendance/scan",
            "/api/attendance",
            "/api/users/{uid}/card",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("AttendanceRecord"));
    }

    #[test]
    fn custom_prefix_moves_protected_paths_only() {
        let doc = openapi_for("/v2");
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/v2/attendance/scan"));
        assert!(paths.contains_key("/v2/me"));
        assert!(paths.contains_key("/auth/login"));
        assert!(!paths.keys().any(|p| p.starts_with("/api")));
    }
}
