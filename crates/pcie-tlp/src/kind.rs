use core::fmt;

use crate::DecodeError;

/// TLP header format (the `Fmt` field, bits 7..5 of the first header byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TlpFormat {
    /// 3 DW header, no data.
    ThreeDwNoData = 0,
    /// 4 DW header, no data.
    FourDwNoData = 1,
    /// 3 DW header, with data.
    ThreeDwData = 2,
    /// 4 DW header, with data.
    FourDwData = 3,
}

impl TlpFormat {
    pub const fn header_dwords(self) -> usize {
        match self {
            Self::ThreeDwNoData | Self::ThreeDwData => 3,
            Self::FourDwNoData | Self::FourDwData => 4,
        }
    }

    pub const fn has_data(self) -> bool {
        matches!(self, Self::ThreeDwData | Self::FourDwData)
    }
}

/// Combined fmt/type byte of a TLP header.
///
/// Only the encodings the bridge can produce or receive are listed; anything else decodes to
/// [`DecodeError::UnknownType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TlpType {
    MRd32 = 0x00,
    MRd64 = 0x20,
    MRdLk32 = 0x01,
    MRdLk64 = 0x21,
    MWr32 = 0x40,
    MWr64 = 0x60,
    IoRd = 0x02,
    IoWr = 0x42,
    CfgRd0 = 0x04,
    CfgRd1 = 0x05,
    CfgWr0 = 0x44,
    CfgWr1 = 0x45,
    Cpl = 0x0A,
    CplD = 0x4A,
    CplLk = 0x0B,
    CplLkD = 0x4B,
}

impl TlpType {
    pub const ALL: [TlpType; 16] = [
        Self::MRd32,
        Self::MRd64,
        Self::MRdLk32,
        Self::MRdLk64,
        Self::MWr32,
        Self::MWr64,
        Self::IoRd,
        Self::IoWr,
        Self::CfgRd0,
        Self::CfgRd1,
        Self::CfgWr0,
        Self::CfgWr1,
        Self::Cpl,
        Self::CplD,
        Self::CplLk,
        Self::CplLkD,
    ];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn format(self) -> TlpFormat {
        match (self as u8) >> 5 {
            0 => TlpFormat::ThreeDwNoData,
            1 => TlpFormat::FourDwNoData,
            2 => TlpFormat::ThreeDwData,
            _ => TlpFormat::FourDwData,
        }
    }

    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Cpl | Self::CplD | Self::CplLk | Self::CplLkD)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::MRd32 => "MRd32",
            Self::MRd64 => "MRd64",
            Self::MRdLk32 => "MRdLk32",
            Self::MRdLk64 => "MRdLk64",
            Self::MWr32 => "MWr32",
            Self::MWr64 => "MWr64",
            Self::IoRd => "IORd",
            Self::IoWr => "IOWr",
            Self::CfgRd0 => "CfgRd0",
            Self::CfgRd1 => "CfgRd1",
            Self::CfgWr0 => "CfgWr0",
            Self::CfgWr1 => "CfgWr1",
            Self::Cpl => "Cpl",
            Self::CplD => "CplD",
            Self::CplLk => "CplLk",
            Self::CplLkD => "CplLkD",
        }
    }
}

impl TryFrom<u8> for TlpType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_u8() == value)
            .ok_or(DecodeError::UnknownType(value))
    }
}

impl From<TlpType> for u8 {
    fn from(value: TlpType) -> Self {
        value.as_u8()
    }
}

impl fmt::Display for TlpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
