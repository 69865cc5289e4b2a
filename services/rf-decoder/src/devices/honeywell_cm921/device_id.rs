//! Three-byte device addresses

use std::fmt;

/// Device class tags by 6-bit type code
const DEVICE_TYPES: &[(u8, &str)] = &[
    // 04 00 2A is type 1, a controller; TRVs are type 4 (10 00 2A)
    (1, "CTL"),
    (2, "UFH"),
    (3, " 30"),
    (4, "TRV"),
    (7, "DHW"),
    (10, "OTB"),
    (12, "THm"),
    (13, "BDR"),
    (17, " 17"),
    (18, "HGI"),
    (22, "THM"),
    (30, "GWY"),
    (32, "VNT"),
    (34, "STA"),
    (63, "NUL"),
];

/// Rendered in place of a tag for type codes not in the table
pub const UNKNOWN_TYPE: &str = " --";

/// Device address: 6-bit type code followed by an 18-bit serial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId([u8; 3]);

impl DeviceId {
    pub fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 3] {
        self.0
    }

    pub fn type_code(&self) -> u8 {
        self.0[0] >> 2
    }

    /// Three-character class tag, e.g. `CTL`
    pub fn tag(&self) -> &'static str {
        let code = self.type_code();
        DEVICE_TYPES
            .iter()
            .find(|(c, _)| *c == code)
            .map_or(UNKNOWN_TYPE, |(_, tag)| tag)
    }

    pub fn serial(&self) -> u32 {
        let [b0, b1, b2] = self.0;
        (u32::from(b0 & 0x03) << 16) | (u32::from(b1) << 8) | u32::from(b2)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}:{:06}", self.tag(), self.serial())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_and_type() {
        let id = DeviceId::new([0x04, 0x00, 0x2A]);
        assert_eq!(id.type_code(), 1);
        assert_eq!(id.serial(), 42);
        assert_eq!(id.tag(), "CTL");
        assert_eq!(id.to_string(), "CTL:000042");
    }

    #[test]
    fn test_trv_address() {
        let id = DeviceId::new([0x10, 0x00, 0x2A]);
        assert_eq!(id.to_string(), "TRV:000042");
    }

    #[test]
    fn test_serial_uses_low_type_bits() {
        let id = DeviceId::new([0x32, 0x55, 0xC1]);
        assert_eq!(id.tag(), "THm");
        assert_eq!(id.serial(), 153_025);
    }

    #[test]
    fn test_unknown_type_placeholder() {
        let id = DeviceId::new([0x14, 0x00, 0x01]);
        assert_eq!(id.type_code(), 5);
        assert_eq!(id.to_string(), " --:000001");
    }
}
