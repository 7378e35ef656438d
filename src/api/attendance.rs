use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::repository::Repositories;
use crate::service::attendance::{self as attendance_service, ScanInput};
use crate::service::users;

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Raw text read from the QR code
    #[schema(example = "TEACHER:5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33:ana@school.edu")]
    pub qr_data: String,
    #[schema(example = json!(-12.046374))]
    pub latitude: f64,
    #[schema(example = json!(-77.042793))]
    pub longitude: f64,
    /// Address resolved on the device, if any
    #[schema(example = "Av. Abancay 210, Lima", nullable = true)]
    pub location_address: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub total: usize,
}

impl From<Vec<AttendanceRecord>> for AttendanceListResponse {
    fn from(data: Vec<AttendanceRecord>) -> Self {
        Self {
            total: data.len(),
            data,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    /// First day, inclusive (YYYY-MM-DD)
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

/// Register a scan; the type (ENTRY/EXIT) is inferred from today's records
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Attendance registered", body = AttendanceRecord),
        (status = 400, description = "QR code does not belong to the user", body = Object, example = json!({
            "error": "This QR code does not belong to you"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account is disabled")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn scan(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    body: web::Json<ScanRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users::get_user(repos.get_ref(), &auth.user_id).await?;

    let body = body.into_inner();
    let record = attendance_service::register_scan(
        repos.get_ref(),
        &user,
        ScanInput {
            qr_data: body.qr_data,
            latitude: body.latitude,
            longitude: body.longitude,
            location_address: body.location_address,
        },
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(record))
}

/// Attendance history of the logged-in user, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Own records", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    repos: web::Data<Repositories>,
) -> Result<HttpResponse, AppError> {
    let records = repos.attendance.by_user(&auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(records)))
}

/// Today's records of the logged-in user, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's records", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    repos: web::Data<Repositories>,
) -> Result<HttpResponse, AppError> {
    let records =
        attendance_service::today_for_user(repos.get_ref(), &auth.user_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(records)))
}

/// All records, optionally limited to a date range (admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Records, newest first", body = AttendanceListResponse),
        (status = 400, description = "Incomplete or inverted date range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let records = match (query.from, query.to) {
        (None, None) => repos.attendance.all().await?,
        (Some(from), Some(to)) => {
            let (start, end) = attendance_service::date_range_bounds(from, to)?;
            debug!(%start, %end, "Fetching attendance by date range");
            repos.attendance.between(start, end).await?
        }
        _ => return Err(AppError::validation("Select both dates to filter")),
    };

    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(records)))
}

/// Attendance history of one user (admin, or the user themselves)
#[utoipa::path(
    get,
    path = "/api/attendance/user/{uid}",
    params(("uid", Path, description = "User id")),
    responses(
        (status = 200, description = "User's records, newest first", body = AttendanceListResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn user_attendance(
    auth: AuthUser,
    repos: web::Data<Repositories>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();
    auth.require_self_or_admin(&uid)?;

    let records = repos.attendance.by_user(&uid).await?;
    Ok(HttpResponse::Ok().json(AttendanceListResponse::from(records)))
}
