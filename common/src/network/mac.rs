use pnet::util::MacAddr;

/// Upper-case, colon separated form used in reports (`AA:BB:CC:DD:EE:FF`).
pub fn to_canonical(mac: MacAddr) -> String {
    let MacAddr(a, b, c, d, e, f) = mac;
    format!("{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{f:02X}")
}

/// The first three octets, which identify the manufacturer.
pub fn oui_prefix(mac: MacAddr) -> [u8; 3] {
    [mac.0, mac.1, mac.2]
}

/// Locally administered addresses are randomized or assigned by software and
/// never carry a registered vendor prefix.
pub fn is_locally_administered(mac: MacAddr) -> bool {
    mac.0 & 0b0000_0010 != 0
}
