use crate::{bitreader::BitReader, error::GribError, repr::Packing};

/// Unpacks a simple-packed field (Template 7.0): a flat run of
/// `bits`-wide unsigned values, scaled individually.
///
/// A bit width of 0 means no values are physically present and the
/// whole field is the scaled reference value.
pub(crate) fn decode(
    packing: &Packing,
    num_points: usize,
    payload: &[u8],
) -> Result<Vec<f64>, GribError> {
    if packing.bits == 0 {
        return Ok(vec![packing.scale(0u8); num_points]);
    }
    if packing.bits > 64 {
        return Err(GribError::CorruptData(format!(
            "packed value width {} bits",
            packing.bits
        )));
    }

    let width = usize::from(packing.bits);
    let capacity = payload.len() * 8 / width;
    if capacity < num_points {
        return Err(GribError::CorruptData(format!(
            "section holds {capacity} packed values but {num_points} points are declared"
        )));
    }

    let mut reader = BitReader::new(payload);
    let mut values = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        values.push(packing.scale(reader.read_uint(width)?));
    }
    Ok(values)
}
