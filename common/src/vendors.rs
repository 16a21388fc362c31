use pnet::util::MacAddr;

use crate::error::LookupError;

/// Resolves device manufacturers from MAC addresses.
pub trait VendorRepository: Send + Sync {
    /// Returns the registered vendor name for `mac_addr`.
    ///
    /// Callers decide what to show when this fails; the scan substitutes
    /// [`crate::UNKNOWN_VENDOR`].
    fn get_vendor(&self, mac_addr: MacAddr) -> Result<String, LookupError>;
}
