use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, AttendanceType};
use crate::model::user::User;
use crate::repository::Repositories;
use crate::utils::validation::{MAX_TEXT_LEN, require_max_len};

/// Decide whether the next scan of the day is an ENTRY or an EXIT.
///
/// The first scan of a day is always an ENTRY; afterwards each scan toggles
/// the type of the latest record. Records sharing the latest timestamp are
/// ordered by id so the answer does not depend on the order of `today`.
pub fn next_attendance_type(today: &[AttendanceRecord]) -> AttendanceType {
    today
        .iter()
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
        .map(|last| last.attendance_type.toggled())
        .unwrap_or(AttendanceType::Entry)
}

/// A scanned payload belongs to `user` when it mentions their id or email.
pub fn is_valid_user_qr(qr_data: &str, user: &User) -> bool {
    (!user.uid.is_empty() && qr_data.contains(&user.uid))
        || (!user.email.is_empty() && qr_data.contains(&user.email))
}

/// Payload printed on a teacher's ID card.
pub fn qr_payload(user: &User) -> String {
    format!("TEACHER:{}:{}", user.uid, user.email)
}

/// Address shown when the client could not resolve one.
pub fn fallback_address(latitude: f64, longitude: f64) -> String {
    format!("Location: {latitude:.6}, {longitude:.6}")
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::default());
    // A DST gap at midnight has no local 00:00; fall back to reading it as UTC.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// `[start, end)` of the local calendar day containing `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&Local).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    (local_midnight(today), local_midnight(tomorrow))
}

/// `[from 00:00:00, to 23:59:59.999]` in local time.
pub fn date_range_bounds(
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    if from > to {
        return Err(AppError::validation(
            "Start date cannot be later than end date",
        ));
    }
    let end = to
        .succ_opt()
        .map(local_midnight)
        .map(|next| next - Duration::milliseconds(1))
        .ok_or_else(|| AppError::validation("End date out of range"))?;

    Ok((local_midnight(from), end))
}

/// What the client sends after reading a QR code.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub qr_data: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_address: Option<String>,
}

fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::validation("Location coordinates are out of range"));
    }
    Ok(())
}

pub async fn today_for_user(
    repos: &Repositories,
    user_id: &str,
    now: DateTime<Utc>,
) -> AppResult<Vec<AttendanceRecord>> {
    let (start, end) = day_bounds(now);
    repos.attendance.by_user_between(user_id, start, end).await
}

/// Validate a scan, infer its type and store it.
#[instrument(name = "register_scan", skip(repos, user, input), fields(user_id = %user.uid))]
pub async fn register_scan(
    repos: &Repositories,
    user: &User,
    input: ScanInput,
    now: DateTime<Utc>,
) -> AppResult<AttendanceRecord> {
    if !is_valid_user_qr(&input.qr_data, user) {
        info!("Rejected QR code that does not belong to the user");
        return Err(AppError::validation("This QR code does not belong to you"));
    }
    require_max_len(&input.qr_data, MAX_TEXT_LEN, "QR data")?;
    validate_coordinates(input.latitude, input.longitude)?;

    let location_address = input
        .location_address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| fallback_address(input.latitude, input.longitude));
    require_max_len(&location_address, MAX_TEXT_LEN, "Location address")?;

    let today = today_for_user(repos, &user.uid, now).await?;
    let attendance_type = next_attendance_type(&today);
    debug!(records_today = today.len(), %attendance_type, "Inferred attendance type");

    let record = AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.uid.clone(),
        user_names: user.names.clone(),
        user_lastnames: user.lastnames.clone(),
        attendance_type,
        timestamp: now,
        latitude: input.latitude,
        longitude: input.longitude,
        location_address,
        qr_data: input.qr_data,
    };

    repos.attendance.insert(&record).await?;
    info!(record_id = %record.id, %attendance_type, "Attendance registered");

    Ok(record)
}
