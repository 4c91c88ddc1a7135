use core::fmt;

/// Bus/device/function identity the bridge uses as Requester ID on every request it issues.
///
/// The hardware publishes this in a 32-bit status register once the link has come up and the
/// endpoint has been enumerated. A raw value of zero means "not resolved yet".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RequesterId {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl RequesterId {
    /// Creates a new requester ID.
    ///
    /// The caller is responsible for keeping the values within the PCI ranges:
    /// device < 32, function < 8.
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }

    /// Packs this identity into the 16-bit Requester ID field layout.
    ///
    /// Layout (LSB..MSB):
    /// - bits 0..=2: function (0-7)
    /// - bits 3..=7: device (0-31)
    /// - bits 8..=15: bus (0-255)
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `device >= 32` or `function >= 8`.
    pub const fn pack_u16(self) -> u16 {
        debug_assert!(self.device < 32);
        debug_assert!(self.function < 8);
        ((self.bus as u16) << 8) | ((self.device as u16) << 3) | (self.function as u16)
    }

    /// Unpacks a value produced by [`RequesterId::pack_u16`].
    pub const fn unpack_u16(v: u16) -> Self {
        Self {
            bus: (v >> 8) as u8,
            device: ((v >> 3) & 0x1f) as u8,
            function: (v & 0x7) as u8,
        }
    }

    /// Decodes the identity status register. Returns `None` while the register reads zero.
    ///
    /// Only the low 16 bits carry the identity; upper bits are ignored.
    pub const fn from_status(raw: u32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self::unpack_u16(raw as u16))
        }
    }
}

impl From<RequesterId> for u16 {
    fn from(value: RequesterId) -> Self {
        value.pack_u16()
    }
}

impl From<u16> for RequesterId {
    fn from(value: u16) -> Self {
        Self::unpack_u16(value)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}
