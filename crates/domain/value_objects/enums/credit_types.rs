use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::license_types::LicenseType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditType {
    LicenseShort,
    LicenseLong,
    DeviceSlot,
}

impl CreditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditType::LicenseShort => "LICENSE_SHORT",
            CreditType::LicenseLong => "LICENSE_LONG",
            CreditType::DeviceSlot => "DEVICE_SLOT",
        }
    }

    /// License term unlocked by spending one unit of this credit, if any.
    pub fn license_type(&self) -> Option<LicenseType> {
        match self {
            CreditType::LicenseShort => Some(LicenseType::Short),
            CreditType::LicenseLong => Some(LicenseType::Long),
            CreditType::DeviceSlot => None,
        }
    }
}

impl Display for CreditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
