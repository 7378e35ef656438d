use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AttendanceType {
    Entry,
    Exit,
}

impl AttendanceType {
    /// The type that follows this one within a day.
    pub fn toggled(self) -> Self {
        match self {
            AttendanceType::Entry => AttendanceType::Exit,
            AttendanceType::Exit => AttendanceType::Entry,
        }
    }
}

/// A single scan event. Append-only once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "0b6f3c1e-55a2-4f5e-9a57-0d1d2a9b7c11",
        "user_id": "5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33",
        "user_names": "Ana",
        "user_lastnames": "Quispe",
        "attendance_type": "ENTRY",
        "timestamp": "2026-03-02T12:58:03Z",
        "latitude": -12.046374,
        "longitude": -77.042793,
        "location_address": "Av. Abancay 210, Lima",
        "qr_data": "TEACHER:5f0c6a52-3b7e-4d8e-8f0e-8f4a2b1c9d33:ana@school.edu"
    })
)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,

    /// Copied from the user profile at scan time
    pub user_names: String,
    pub user_lastnames: String,

    pub attendance_type: AttendanceType,

    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,

    pub latitude: f64,
    pub longitude: f64,
    pub location_address: String,

    /// Raw payload read from the QR code
    pub qr_data: String,
}
