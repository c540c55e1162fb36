use crate::{
    bitreader::BitReader,
    error::GribError,
    repr::{GroupParams, Packing},
};

/// Parameters of one bit group: its reference value, the width of its
/// stored values and the number of values it covers. Reconstructed per
/// group during a Section 7 decode and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitGroup {
    pub(crate) reference: u64,
    pub(crate) width: usize,
    pub(crate) length: usize,
}

/// Reconstructs the per-group parameters of a complex-packed field.
///
/// Three fixed-width blocks precede the packed values: NG reference
/// values, NG width deltas (offset by the constant width reference) and
/// NG scaled lengths (linear reconstruction, except the last group
/// whose true length is stored verbatim). Each block starts on a byte
/// boundary.
pub(crate) fn extract_bit_groups(
    reader: &mut BitReader,
    packing: &Packing,
    groups: &GroupParams,
    payload_len: usize,
) -> Result<Vec<BitGroup>, GribError> {
    let ngroups = groups.ngroups as usize;
    if ngroups == 0 {
        return Err(GribError::CorruptData("zero bit groups declared".into()));
    }
    if groups.group_width_bits > 64 || groups.group_length_bits > 64 {
        return Err(GribError::CorruptData(format!(
            "group parameter widths {}/{} bits",
            groups.group_width_bits, groups.group_length_bits
        )));
    }

    let references = reader.read_unsigned_block(usize::from(packing.bits), ngroups, true)?;

    let mut widths =
        reader.read_unsigned_block(usize::from(groups.group_width_bits), ngroups, true)?;
    for width in widths.iter_mut() {
        *width += u64::from(groups.group_width_reference);
    }

    let mut lengths =
        reader.read_unsigned_block(usize::from(groups.group_length_bits), ngroups, true)?;
    for length in lengths.iter_mut() {
        *length = *length * u64::from(groups.group_length_increment)
            + u64::from(groups.group_length_reference);
    }
    // The last group's length is not representable by the linear
    // formula; its true length is carried verbatim in Section 5.
    lengths[ngroups - 1] = u64::from(groups.group_last_length);

    let mut total_bits: u64 = 0;
    for (width, length) in widths.iter().zip(lengths.iter()) {
        if *width > 63 {
            return Err(GribError::CorruptData(format!("group width {width}")));
        }
        total_bits += width * length;
    }
    if total_bits / 8 > payload_len as u64 {
        return Err(GribError::CorruptData(format!(
            "group widths and lengths declare {} bytes but section holds {payload_len}",
            total_bits / 8,
        )));
    }

    Ok(references
        .into_iter()
        .zip(widths)
        .zip(lengths)
        .map(|((reference, width), length)| BitGroup {
            reference,
            width: width as usize,
            length: length as usize,
        })
        .collect())
}
