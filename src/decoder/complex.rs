use crate::{
    bitreader::BitReader,
    decoder::groups::extract_bit_groups,
    error::GribError,
    repr::{GroupParams, Packing, SpatialDiffParams},
};

/// A reconstructed integer before scaling, or a missing-value sentinel
/// mapped to one of the substitute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawValue {
    Normal(i64),
    Missing1,
    Missing2,
}

use RawValue::{Missing1, Missing2, Normal};

/// Unpacks a complex-packed field (Template 7.2), optionally with
/// spatial differencing (Template 7.3).
///
/// The value buffer is allocated once to the declared point count and
/// every group write is checked against it; group parameters that
/// disagree with the count fail with [`GribError::CorruptData`] instead
/// of truncating or padding the grid.
pub(crate) fn decode(
    packing: &Packing,
    groups: &GroupParams,
    spdiff: Option<&SpatialDiffParams>,
    num_points: usize,
    payload: &[u8],
) -> Result<Vec<f64>, GribError> {
    if groups.missing_mode > 2 {
        return Err(GribError::CorruptData(format!(
            "missing value management mode {}",
            groups.missing_mode
        )));
    }
    if usize::from(packing.bits) > 63 {
        return Err(GribError::CorruptData(format!(
            "reference width {} bits",
            packing.bits
        )));
    }

    let mut reader = BitReader::new(payload);

    // Template 7.3 leads with the seed value(s) and the overall
    // minimum of the differences, each signed at `octets * 8` bits.
    let mut seeds = [0i64; 2];
    let mut minsd = 0i64;
    if let Some(spdiff) = spdiff {
        if !(1..=2).contains(&spdiff.order) {
            return Err(GribError::CorruptData(format!(
                "spatial differencing order {}",
                spdiff.order
            )));
        }
        if spdiff.octets > 8 {
            return Err(GribError::CorruptData(format!(
                "spatial differencing descriptor of {} octets",
                spdiff.octets
            )));
        }
        let width = usize::from(spdiff.octets) * 8;
        if width != 0 {
            seeds[0] = reader.read_int(width)?;
            if spdiff.order == 2 {
                seeds[1] = reader.read_int(width)?;
            }
            minsd = reader.read_int(width)?;
        }
    }

    let bit_groups = extract_bit_groups(&mut reader, packing, groups, payload.len())?;

    let mut raw: Vec<RawValue> = Vec::with_capacity(num_points);
    for group in &bit_groups {
        if num_points - raw.len() < group.length {
            return Err(GribError::CorruptData(format!(
                "group lengths cover more than the {num_points} declared points"
            )));
        }

        if group.width == 0 {
            // A constant run: every value equals the group reference
            // and no bits are present. Sentinels apply to the
            // reference itself, at the field's base width.
            let value = classify(
                group.reference,
                usize::from(packing.bits),
                groups.missing_mode,
                group.reference as i64,
            );
            raw.extend(std::iter::repeat(value).take(group.length));
        } else {
            let stored = reader.read_unsigned_block(group.width, group.length, false)?;
            for v in stored {
                raw.push(classify(
                    v,
                    group.width,
                    groups.missing_mode,
                    (v + group.reference) as i64,
                ));
            }
        }
    }
    if raw.len() != num_points {
        return Err(GribError::CorruptData(format!(
            "group lengths cover {} of the {num_points} declared points",
            raw.len()
        )));
    }

    if let Some(spdiff) = spdiff {
        undo_spatial_differencing(&mut raw, spdiff.order, &seeds, minsd);
    }

    let substitute1 = f64::from(groups.missing_substitute1);
    let substitute2 = f64::from(groups.missing_substitute2);
    Ok(raw
        .into_iter()
        .map(|value| match value {
            Normal(v) => packing.scale(v),
            Missing1 => substitute1,
            Missing2 => substitute2,
        })
        .collect())
}

/// Applies the missing-value sentinels: all ones at the given width is
/// the primary sentinel, all ones minus one the secondary. Mode 0
/// disables the check entirely.
fn classify(stored: u64, width: usize, missing_mode: u8, value: i64) -> RawValue {
    if missing_mode == 0 {
        return Normal(value);
    }
    let missing1 = if width >= 64 { u64::MAX } else { (1 << width) - 1 };
    if stored == missing1 {
        Missing1
    } else if missing_mode == 2 && stored == missing1.wrapping_sub(1) {
        Missing2
    } else {
        Normal(value)
    }
}

/// Undoes the encoder-side delta transform. The seed value(s) stand in
/// for the first (order) decoded values; each later value adds the
/// overall minimum back and accumulates over its predecessors.
///
/// Values flagged missing do not participate: they are skipped both as
/// recurrence outputs and as the previous-value references of later
/// points.
fn undo_spatial_differencing(raw: &mut [RawValue], order: u8, seeds: &[i64; 2], minsd: i64) {
    let mut prev1 = 0i64;
    let mut prev2 = 0i64;
    let mut decoded = 0usize;
    for slot in raw.iter_mut() {
        let Normal(g) = *slot else {
            continue;
        };
        let v = match decoded {
            0 => seeds[0],
            1 if order == 2 => seeds[1],
            _ if order == 2 => g + minsd + 2 * prev1 - prev2,
            _ => g + minsd + prev1,
        };
        prev2 = prev1;
        prev1 = v;
        *slot = Normal(v);
        decoded += 1;
    }
}
