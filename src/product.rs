use crate::{error::GribError, utils::read_as};

/// A fixed surface bounding the product vertically (Code Table 4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Surface {
    /// Type of fixed surface.
    pub surface_type: u8,
    /// Scale factor of the fixed surface.
    pub scale: u8,
    /// Scaled value of the fixed surface.
    pub value: u32,
}

const SURFACE_SIZE: usize = 6;

impl Surface {
    fn from_buf(buf: &[u8]) -> Self {
        Self {
            surface_type: buf[0],
            scale: buf[1],
            value: read_as!(u32, buf, 2),
        }
    }
}

/// Product Definition Template 4.0: analysis or forecast at a
/// horizontal level or layer at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductDescriptor {
    /// Parameter category within the message's discipline
    /// (Code Table 4.1).
    pub parameter_category: u8,
    /// Parameter number within the category (Code Table 4.2).
    pub parameter_number: u8,
    /// Type of generating process (Code Table 4.3).
    pub process_type: u8,
    pub background_process: u8,
    pub analysis_process: u8,
    /// Hours of observational data cut-off after the reference time.
    pub hours: u16,
    pub minutes: u8,
    /// Indicator of unit of time range (Code Table 4.4).
    pub time_unit: u8,
    /// Forecast time in units defined by `time_unit`.
    pub forecast_time: u32,
    pub first_surface: Surface,
    pub second_surface: Surface,
}

pub(crate) const PRODUCT_TEMPLATE_SIZE: usize = 25;

impl ProductDescriptor {
    pub(crate) fn from_template(number: u16, buf: &[u8]) -> Result<Self, GribError> {
        if number != 0 {
            return Err(GribError::UnsupportedTemplate { section: 4, number });
        }
        if buf.len() < PRODUCT_TEMPLATE_SIZE {
            return Err(GribError::InputTruncated(buf.len()));
        }

        Ok(Self {
            parameter_category: buf[0],
            parameter_number: buf[1],
            process_type: buf[2],
            background_process: buf[3],
            analysis_process: buf[4],
            hours: read_as!(u16, buf, 5),
            minutes: buf[7],
            time_unit: buf[8],
            forecast_time: read_as!(u32, buf, 9),
            first_surface: Surface::from_buf(&buf[13..13 + SURFACE_SIZE]),
            second_surface: Surface::from_buf(&buf[19..19 + SURFACE_SIZE]),
        })
    }
}
