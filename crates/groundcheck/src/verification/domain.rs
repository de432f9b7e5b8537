use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::OfficerIdentity;
use crate::regions::RegionCode;

/// Business identifier: a registry id or a synthesized `NEW-…` id for
/// businesses discovered in the field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Idsbr(pub String);

impl Idsbr {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Idsbr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(ValidationError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Domain status code recorded for a business (e.g. `active`, `closed`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatingStatus(String);

const MAX_STATUS_LEN: usize = 64;

impl OperatingStatus {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("status"));
        }
        if trimmed.chars().count() > MAX_STATUS_LEN {
            return Err(ValidationError::StatusTooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value read back from storage, trusted as written.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }
}

/// One business location and its verification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub idsbr: Idsbr,
    pub name: String,
    pub address: String,
    pub region_code: RegionCode,
    pub coordinate: Option<Coordinate>,
    pub status: Option<OperatingStatus>,
    pub is_verified: bool,
    pub owner: Option<OfficerIdentity>,
    /// Civil time in UTC+7.
    pub verified_at: Option<NaiveDateTime>,
}

impl VerificationRecord {
    /// Record as delivered by the registry load, before anyone visits it.
    pub fn unverified(
        idsbr: impl AsRef<str>,
        name: impl Into<String>,
        address: impl Into<String>,
        region_code: impl AsRef<str>,
    ) -> Self {
        Self {
            idsbr: Idsbr::new(idsbr),
            name: name.into(),
            address: address.into(),
            region_code: RegionCode::new(region_code),
            coordinate: None,
            status: None,
            is_verified: false,
            owner: None,
            verified_at: None,
        }
    }

    pub fn ownership(&self) -> Ownership {
        Ownership {
            is_verified: self.is_verified,
            owner: self.owner.clone(),
        }
    }

    /// Stamp a write onto the record. Callers must have cleared the gate.
    pub(crate) fn apply(&mut self, update: &VerificationUpdate) {
        if let Some(coordinate) = update.coordinate {
            self.coordinate = Some(coordinate);
        }
        self.status = Some(update.status.clone());
        self.is_verified = true;
        self.owner = Some(update.owner.clone());
        self.verified_at = Some(update.verified_at);
    }
}

/// The fields the write path looks at before letting a write through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub is_verified: bool,
    pub owner: Option<OfficerIdentity>,
}

/// Mutation applied by both the interactive and the bulk write paths.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationUpdate {
    pub idsbr: Idsbr,
    /// `None` keeps the stored coordinate (bulk status-only rows).
    pub coordinate: Option<Coordinate>,
    pub status: OperatingStatus,
    pub owner: OfficerIdentity,
    pub verified_at: NaiveDateTime,
}

/// Officer-submitted verification payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSubmission {
    #[serde(default)]
    pub idsbr: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
}

/// Rejected input, reported back to the caller as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("coordinate ({latitude}, {longitude}) is out of range")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("status must be at most 64 characters")]
    StatusTooLong,
    #[error("unknown region `{0}`")]
    UnknownRegion(String),
}

pub(crate) fn required_text(
    value: Option<&str>,
    field: &'static str,
) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}
