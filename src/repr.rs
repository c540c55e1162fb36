use num::ToPrimitive;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    error::GribError,
    utils::{read_as, GribInt},
};

/// Data representation template numbers implemented by this crate
/// (Code Table 5.0).
#[derive(Debug, Eq, PartialEq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum DataTemplateNumber {
    SimplePacking = 0,
    ComplexPacking = 2,
    ComplexPackingSpatialDiff = 3,
}

/// The packing parameters shared by templates 5.0, 5.2 and 5.3
/// (octets 12-21 of Section 5): reference value, binary and decimal
/// scale factors, and the bit width of packed values (of group
/// reference values for complex packing).
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    /// Reference value `R` (IEEE 32-bit floating point).
    pub reference: f32,
    /// Binary scale factor `E`.
    pub binary_scale: i16,
    /// Decimal scale factor `D`.
    pub decimal_scale: i16,
    /// Number of bits per packed value.
    pub bits: u8,
    /// Type of original field values: 0 floating point, 1 integer.
    pub field_type: u8,
}

impl Packing {
    fn from_buf(buf: &[u8]) -> Self {
        Self {
            reference: read_as!(f32, buf, 6),
            binary_scale: read_as!(u16, buf, 10).as_grib_int(),
            decimal_scale: read_as!(u16, buf, 12).as_grib_int(),
            bits: buf[14],
            field_type: buf[15],
        }
    }

    /// Recovers the physical value of a reconstructed integer:
    /// `(R + raw * 2^E) * 10^(-D)`.
    pub fn scale<N: ToPrimitive>(&self, raw: N) -> f64 {
        let raw = raw.to_f64().unwrap_or(f64::NAN);
        (f64::from(self.reference) + raw * 2f64.powi(i32::from(self.binary_scale)))
            * 10f64.powi(-i32::from(self.decimal_scale))
    }
}

/// Group splitting parameters of complex packing (octets 22-47 of
/// Section 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParams {
    /// Group splitting method used (Code Table 5.4).
    pub method: u8,
    /// Missing value management: 0 none, 1 primary, 2 primary and
    /// secondary (Code Table 5.5).
    pub missing_mode: u8,
    pub missing_substitute1: u32,
    pub missing_substitute2: u32,
    /// NG, the number of groups the field is split into.
    pub ngroups: u32,
    /// Reference added to every decoded group width.
    pub group_width_reference: u8,
    /// Bits per encoded group width delta.
    pub group_width_bits: u8,
    /// Reference for the linear group length reconstruction.
    pub group_length_reference: u32,
    /// Increment for the linear group length reconstruction.
    pub group_length_increment: u8,
    /// True length of the last group, stored verbatim.
    pub group_last_length: u32,
    /// Bits per encoded scaled group length.
    pub group_length_bits: u8,
}

impl GroupParams {
    fn from_buf(buf: &[u8]) -> Self {
        Self {
            method: buf[16],
            missing_mode: buf[17],
            missing_substitute1: read_as!(u32, buf, 18),
            missing_substitute2: read_as!(u32, buf, 22),
            ngroups: read_as!(u32, buf, 26),
            group_width_reference: buf[30],
            group_width_bits: buf[31],
            group_length_reference: read_as!(u32, buf, 32),
            group_length_increment: buf[36],
            group_last_length: read_as!(u32, buf, 37),
            group_length_bits: buf[41],
        }
    }
}

/// Extra parameters of template 5.3 (octets 48-49).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialDiffParams {
    /// Order of spatial differencing, 1 or 2 (Code Table 5.6).
    pub order: u8,
    /// Number of octets holding each seed value and the overall
    /// minimum of the differences.
    pub octets: u8,
}

/// Data representation decoded from Section 5, one variant per
/// supported template number. An unsupported number is kept as
/// [`DataRepresentation::Unknown`] carrying the raw code; the section
/// parser rejects it rather than guessing a layout.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRepresentation {
    /// Template 5.0: grid point data, simple packing.
    Simple(Packing),
    /// Template 5.2: grid point data, complex packing.
    Complex {
        packing: Packing,
        groups: GroupParams,
    },
    /// Template 5.3: complex packing with spatial differencing.
    ComplexSpatialDiff {
        packing: Packing,
        groups: GroupParams,
        spdiff: SpatialDiffParams,
    },
    Unknown(u16),
}

impl DataRepresentation {
    /// Decodes the template portion of a Section 5 body (`buf` starts
    /// at octet 6, so the template itself begins at index 6).
    pub(crate) fn from_template(number: u16, buf: &[u8]) -> Result<Self, GribError> {
        let Ok(template) = DataTemplateNumber::try_from(number) else {
            return Ok(Self::Unknown(number));
        };

        let required = match template {
            DataTemplateNumber::SimplePacking => 16,
            DataTemplateNumber::ComplexPacking => 42,
            DataTemplateNumber::ComplexPackingSpatialDiff => 44,
        };
        if buf.len() < required {
            return Err(GribError::InputTruncated(buf.len()));
        }

        let repr = match template {
            DataTemplateNumber::SimplePacking => Self::Simple(Packing::from_buf(buf)),
            DataTemplateNumber::ComplexPacking => Self::Complex {
                packing: Packing::from_buf(buf),
                groups: GroupParams::from_buf(buf),
            },
            DataTemplateNumber::ComplexPackingSpatialDiff => Self::ComplexSpatialDiff {
                packing: Packing::from_buf(buf),
                groups: GroupParams::from_buf(buf),
                spdiff: SpatialDiffParams {
                    order: buf[42],
                    octets: buf[43],
                },
            },
        };
        Ok(repr)
    }

    /// The template number this representation was decoded from.
    pub fn template_number(&self) -> u16 {
        match self {
            Self::Simple(_) => DataTemplateNumber::SimplePacking.into(),
            Self::Complex { .. } => DataTemplateNumber::ComplexPacking.into(),
            Self::ComplexSpatialDiff { .. } => DataTemplateNumber::ComplexPackingSpatialDiff.into(),
            Self::Unknown(number) => *number,
        }
    }

    /// The packing parameters shared by all supported templates.
    pub fn packing(&self) -> Option<&Packing> {
        match self {
            Self::Simple(packing) => Some(packing),
            Self::Complex { packing, .. } => Some(packing),
            Self::ComplexSpatialDiff { packing, .. } => Some(packing),
            Self::Unknown(_) => None,
        }
    }
}
