mod complex;
mod groups;
mod simple;

use crate::{error::GribError, repr::DataRepresentation};

/// Unpacks a Section 7 payload into scaled values using the
/// already-decoded Section 5 descriptor. The result always holds
/// exactly `num_points` values; any disagreement between the declared
/// parameters and the payload is an error.
pub(crate) fn decode_values(
    representation: &DataRepresentation,
    num_points: usize,
    payload: &[u8],
) -> Result<Vec<f64>, GribError> {
    match representation {
        DataRepresentation::Simple(packing) => simple::decode(packing, num_points, payload),
        DataRepresentation::Complex { packing, groups } => {
            complex::decode(packing, groups, None, num_points, payload)
        }
        DataRepresentation::ComplexSpatialDiff {
            packing,
            groups,
            spdiff,
        } => complex::decode(packing, groups, Some(spdiff), num_points, payload),
        DataRepresentation::Unknown(number) => Err(GribError::UnsupportedTemplate {
            section: 5,
            number: *number,
        }),
    }
}
