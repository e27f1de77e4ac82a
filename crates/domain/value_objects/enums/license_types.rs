use std::fmt::Display;

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const SHORT_LICENSE_DAYS: i64 = 30;
pub const LONG_LICENSE_DAYS: i64 = 365;

/// Duration class shared by tenant entitlement extensions and per-device licenses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LicenseType {
    #[serde(rename = "LICENSE_SHORT")]
    Short,
    #[serde(rename = "LICENSE_LONG")]
    Long,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Short => "LICENSE_SHORT",
            LicenseType::Long => "LICENSE_LONG",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LICENSE_SHORT" | "SHORT" => Some(LicenseType::Short),
            "LICENSE_LONG" | "LONG" => Some(LicenseType::Long),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            LicenseType::Short => Duration::days(SHORT_LICENSE_DAYS),
            LicenseType::Long => Duration::days(LONG_LICENSE_DAYS),
        }
    }
}

impl Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
