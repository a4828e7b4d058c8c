use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Raw epoch values above this are interpreted as milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Storage quota for a single account.
///
/// Only constructed when the server reports all four fields; partial quota
/// data yields no record at all. A negative `total` is the server's
/// "unlimited" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub total: i64,
    pub used: i64,
    pub free: i64,
    /// Used fraction as a percentage, 0–100.
    pub relative: f64,
}

impl QuotaRecord {
    pub fn is_unlimited(&self) -> bool {
        self.total < 0
    }
}

/// One user record as held by the orchestrator.
///
/// Fully replaced on every refresh or post-mutation re-fetch, never patched
/// field by field. The identifier is the immutable identity key and is
/// never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub enabled: bool,
    pub groups: BTreeSet<String>,
    pub quota: Option<QuotaRecord>,
    #[serde(default, with = "time::serde::timestamp::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::timestamp::option")]
    pub created: Option<OffsetDateTime>,
    pub backend: Option<String>,
}

/// A group, identified (and displayed) by name alone. Membership is derived
/// by scanning [`DirectoryUser::groups`], not stored per group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub name: String,
}

/// Server status record from the unauthenticated `status.php` probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub maintenance: bool,
    #[serde(default, rename = "needsDbUpgrade")]
    pub needs_db_upgrade: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "versionstring")]
    pub version_string: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// The two-level response envelope: an outer status/metadata block wrapping
/// the payload.
#[derive(Debug, Deserialize)]
pub(crate) struct OcsResponse<T> {
    pub ocs: OcsEnvelope<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcsEnvelope<T> {
    #[allow(dead_code)]
    pub meta: OcsMeta,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcsMeta {
    #[allow(dead_code)]
    pub status: String,
    #[allow(dead_code)]
    pub statuscode: i64,
    #[serde(default)]
    #[allow(dead_code)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserListData {
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupListData {
    pub groups: Vec<String>,
}

/// One user's detail payload. Every field except the identifier may be
/// absent independently.
#[derive(Debug, Deserialize)]
pub(crate) struct UserDetail {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub quota: Option<QuotaData>,
    #[serde(default, rename = "lastLogin")]
    pub last_login: Option<i64>,
    #[serde(default, rename = "creationTime")]
    pub creation_time: Option<i64>,
    #[serde(default)]
    pub backend: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaData {
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub used: Option<i64>,
    #[serde(default)]
    pub free: Option<i64>,
    #[serde(default)]
    pub relative: Option<f64>,
}

impl QuotaData {
    /// All four fields or nothing.
    pub(crate) fn into_record(self) -> Option<QuotaRecord> {
        match (self.total, self.used, self.free, self.relative) {
            (Some(total), Some(used), Some(free), Some(relative)) => Some(QuotaRecord {
                total,
                used,
                free,
                relative,
            }),
            _ => None,
        }
    }
}

impl From<UserDetail> for DirectoryUser {
    fn from(detail: UserDetail) -> Self {
        DirectoryUser {
            user_id: detail.id,
            display_name: detail.displayname,
            email: detail.email,
            enabled: detail.enabled.unwrap_or(false),
            groups: detail.groups.unwrap_or_default().into_iter().collect(),
            quota: detail.quota.and_then(QuotaData::into_record),
            last_login: detail.last_login.and_then(instant_from_epoch),
            created: detail.creation_time.and_then(instant_from_epoch),
            backend: detail.backend,
        }
    }
}

/// Converts a raw epoch integer into an absolute instant.
///
/// Values may arrive in whole seconds or milliseconds; magnitude
/// disambiguates. Zero or negative means "no such event", not epoch zero.
pub(crate) fn instant_from_epoch(raw: i64) -> Option<OffsetDateTime> {
    if raw <= 0 {
        return None;
    }
    let secs = if raw > MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    };
    OffsetDateTime::from_unix_timestamp(secs).ok()
}
