use crate::invoice::Currency;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: Currency = Currency::Bitcoin;

/// Seconds an invoice stays payable when it carries no `x` field.
pub const DEFAULT_EXPIRY_TIME: u64 = 3600;

/// Blocks required for the final hop when an invoice carries no `c` field.
pub const DEFAULT_MIN_FINAL_CLTV_EXPIRY: u64 = 9;

/// Defaults applied by [`crate::invoice::InvoiceBuilder::from_config`].
///
/// Every field is optional so a partial document deserializes, missing values fall
/// back to the `DEFAULT_*` constants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceConfig {
    /// Network new invoices are issued for.
    pub currency: Option<Currency>,

    /// Expiry in seconds stamped on new invoices.
    pub expiry_time: Option<u64>,

    /// Minimum final CLTV expiry in blocks stamped on new invoices.
    pub min_final_cltv_expiry: Option<u64>,

    /// Write the `x` field even when it equals the default.
    pub explicit_expiry_time: Option<bool>,

    /// Write the `c` field even when it equals the default.
    pub explicit_min_final_cltv_expiry: Option<bool>,
}

impl InvoiceConfig {
    pub fn currency(&self) -> Currency {
        self.currency.unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn expiry_time(&self) -> u64 {
        self.expiry_time.unwrap_or(DEFAULT_EXPIRY_TIME)
    }

    pub fn min_final_cltv_expiry(&self) -> u64 {
        self.min_final_cltv_expiry
            .unwrap_or(DEFAULT_MIN_FINAL_CLTV_EXPIRY)
    }

    pub fn explicit_expiry_time(&self) -> bool {
        self.explicit_expiry_time.unwrap_or(false)
    }

    pub fn explicit_min_final_cltv_expiry(&self) -> bool {
        self.explicit_min_final_cltv_expiry.unwrap_or(false)
    }
}
