//! Column-level conversions shared by the per-kind models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use moneta_core::errors::Result;
use moneta_core::ids::RecordId;
use moneta_core::records::{OwnerId, SyncEnvelope, SyncStatus};

use crate::errors::StorageError;

pub(crate) fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub(crate) fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

pub(crate) fn decimal_to_db(value: &Decimal) -> String {
    value.to_string()
}

pub(crate) fn decimal_from_db(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| StorageError::CorruptRow(format!("bad decimal '{}': {}", value, e)).into())
}

pub(crate) fn date_to_db(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn date_from_db(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StorageError::CorruptRow(format!("bad date '{}': {}", value, e)).into())
}

pub(crate) fn timestamp_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow(format!("bad timestamp '{}': {}", value, e)).into())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn envelope_from_db(
    id: String,
    owner_id: String,
    sync_status: &str,
    local_updated_at: &str,
    server_updated_at: Option<&str>,
    is_deleted: bool,
    version: i64,
) -> Result<SyncEnvelope> {
    let status: SyncStatus = enum_from_db(sync_status)?;
    Ok(SyncEnvelope {
        id: RecordId::from(id),
        owner_id: OwnerId::from(owner_id),
        sync_status: status,
        local_updated_at: timestamp_from_db(local_updated_at)?,
        server_updated_at: server_updated_at.map(timestamp_from_db).transpose()?,
        is_deleted,
        version,
    })
}
