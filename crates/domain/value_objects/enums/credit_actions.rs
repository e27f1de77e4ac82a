use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{credit_types::CreditType, license_types::LicenseType};

/// What a tenant asks for when spending one credit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditAction {
    ExtendShort,
    ExtendLong,
    AddDeviceSlot,
}

impl CreditAction {
    pub fn credit_type(&self) -> CreditType {
        match self {
            CreditAction::ExtendShort => CreditType::LicenseShort,
            CreditAction::ExtendLong => CreditType::LicenseLong,
            CreditAction::AddDeviceSlot => CreditType::DeviceSlot,
        }
    }

    pub fn for_license(license_type: LicenseType) -> Self {
        match license_type {
            LicenseType::Short => CreditAction::ExtendShort,
            LicenseType::Long => CreditAction::ExtendLong,
        }
    }
}

impl Display for CreditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            CreditAction::ExtendShort => "EXTEND_SHORT",
            CreditAction::ExtendLong => "EXTEND_LONG",
            CreditAction::AddDeviceSlot => "ADD_DEVICE_SLOT",
        };
        write!(f, "{}", action)
    }
}
