use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceLicenseStatus {
    #[default]
    Active,
    Revoked,
}

impl Display for DeviceLicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            DeviceLicenseStatus::Active => "ACTIVE",
            DeviceLicenseStatus::Revoked => "REVOKED",
        };
        write!(f, "{}", status)
    }
}
