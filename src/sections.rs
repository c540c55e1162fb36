use std::io::{self, Read};

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::{
    decoder::decode_values,
    error::GribError,
    grids::Grid,
    product::ProductDescriptor,
    repr::DataRepresentation,
    utils::read_as,
};

/// The `GRIB` magic opening every message, as a big-endian integer.
pub const GRIB_MAGIC: u32 = 0x4752_4942;
/// The `7777` end-of-message marker (Section 8), as a big-endian
/// integer.
pub const END_SECTION_MARKER: u32 = 0x3737_3737;
/// The only GRIB edition this crate decodes.
pub const SUPPORTED_EDITION: u8 = 2;

const SECTION0_SIZE: usize = 16;
const SECTION_HEAD_SIZE: usize = 5;
const END_SECTION_SIZE: usize = 4;

/// Section 0 (Indicator): identifies the record, its discipline and
/// the total message length. Fixed at 16 octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section0 {
    pub reserved: u16,
    /// Discipline of the processed data (Code Table 0.0).
    pub discipline: u8,
    /// GRIB edition number; always 2 after a successful decode.
    pub edition: u8,
    /// Total length of the message in octets, Section 0 included.
    pub total_length: u64,
}

impl Section0 {
    pub(crate) fn from_slice(buf: &[u8]) -> Result<Self, GribError> {
        if read_as!(u32, buf, 0) != GRIB_MAGIC {
            return Err(GribError::NotGrib);
        }
        let edition = buf[7];
        if edition != SUPPORTED_EDITION {
            return Err(GribError::UnsupportedEdition(edition));
        }
        Ok(Self {
            reserved: read_as!(u16, buf, 4),
            discipline: buf[6],
            edition,
            total_length: read_as!(u64, buf, 8),
        })
    }
}

/// The (length, number) pair prefixed to sections 1-7. The end marker
/// substitutes for a real head when the stream reaches the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHead {
    pub length: u32,
    pub number: u8,
}

/// Reference time of the data, as encoded in Section 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Section 1 (Identification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section1 {
    /// Originating/generating centre (Common Code Table C-1).
    pub centre_id: u16,
    pub subcentre_id: u16,
    pub master_table_version: u8,
    pub local_table_version: u8,
    /// Significance of the reference time (Code Table 1.2).
    pub ref_time_significance: u8,
    pub time: Time,
    pub production_status: u8,
    pub data_type: u8,
}

impl Section1 {
    /// The reference time as a calendar timestamp, or `None` when the
    /// encoded fields do not name a valid instant.
    pub fn ref_time(&self) -> Option<DateTime<Utc>> {
        let t = &self.time;
        Utc.with_ymd_and_hms(
            i32::from(t.year),
            u32::from(t.month),
            u32::from(t.day),
            u32::from(t.hour),
            u32::from(t.minute),
            u32::from(t.second),
        )
        .single()
    }
}

/// Section 2 (Local Use): opaque bytes, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section2 {
    pub data: Vec<u8>,
}

/// Section 3 (Grid Definition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section3 {
    /// Source of the grid definition (Code Table 3.0).
    pub source: u8,
    /// Number of data points in the grid.
    pub num_points: u32,
    pub point_count_octets: u8,
    pub point_count_interpretation: u8,
    pub template_number: u16,
    pub grid: Grid,
}

/// Section 4 (Product Definition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section4 {
    pub coordinates_count: u16,
    pub template_number: u16,
    pub product: ProductDescriptor,
    /// Optional hybrid coordinate values, kept verbatim.
    pub coordinates: Vec<u8>,
}

/// Section 5 (Data Representation).
#[derive(Debug, Clone, PartialEq)]
pub struct Section5 {
    /// Number of data points for which values are encoded in
    /// Section 7.
    pub num_points: u32,
    pub template_number: u16,
    pub representation: DataRepresentation,
}

/// Section 6 (Bit Map): opaque in this crate, kept for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section6 {
    /// Bit map indicator (Code Table 6.0); 255 means no bit map.
    pub bitmap_indicator: u8,
    pub bitmap: Vec<u8>,
}

/// Section 7 (Data): the unpacked, scaled values.
#[derive(Debug, Clone, PartialEq)]
pub struct Section7 {
    pub data: Vec<f64>,
}

/// One fully decoded GRIB2 message. Populated in strict ascending
/// section order by [`decode_message`]; a failed decode never produces
/// a partially populated value.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub section0: Section0,
    pub section1: Section1,
    /// Local use data; the only section a message may omit.
    pub section2: Option<Section2>,
    pub section3: Section3,
    pub section4: Section4,
    pub section5: Section5,
    pub section6: Section6,
    pub section7: Section7,
}

impl Message {
    /// The decoded grid values.
    pub fn data(&self) -> &[f64] {
        &self.section7.data
    }
}

fn unpack_section1(body: &[u8]) -> Result<Section1, GribError> {
    if body.len() < 16 {
        return Err(GribError::InputTruncated(body.len()));
    }
    Ok(Section1 {
        centre_id: read_as!(u16, body, 0),
        subcentre_id: read_as!(u16, body, 2),
        master_table_version: body[4],
        local_table_version: body[5],
        ref_time_significance: body[6],
        time: Time {
            year: read_as!(u16, body, 7),
            month: body[9],
            day: body[10],
            hour: body[11],
            minute: body[12],
            second: body[13],
        },
        production_status: body[14],
        data_type: body[15],
    })
}

fn unpack_section3(body: &[u8]) -> Result<Section3, GribError> {
    if body.len() < 9 {
        return Err(GribError::InputTruncated(body.len()));
    }
    let template_number = read_as!(u16, body, 7);
    let grid = Grid::from_template(template_number, &body[9..])?;
    if let Grid::Unknown(number) = grid {
        return Err(GribError::UnsupportedTemplate { section: 3, number });
    }
    Ok(Section3 {
        source: body[0],
        num_points: read_as!(u32, body, 1),
        point_count_octets: body[5],
        point_count_interpretation: body[6],
        template_number,
        grid,
    })
}

fn unpack_section4(body: &[u8]) -> Result<Section4, GribError> {
    if body.len() < 4 {
        return Err(GribError::InputTruncated(body.len()));
    }
    let template_number = read_as!(u16, body, 2);
    let product = ProductDescriptor::from_template(template_number, &body[4..])?;
    Ok(Section4 {
        coordinates_count: read_as!(u16, body, 0),
        template_number,
        product,
        coordinates: body[4 + crate::product::PRODUCT_TEMPLATE_SIZE..].to_vec(),
    })
}

fn unpack_section5(body: &[u8]) -> Result<Section5, GribError> {
    if body.len() < 6 {
        return Err(GribError::InputTruncated(body.len()));
    }
    let template_number = read_as!(u16, body, 4);
    let representation = DataRepresentation::from_template(template_number, body)?;
    if let DataRepresentation::Unknown(number) = representation {
        return Err(GribError::UnsupportedTemplate { section: 5, number });
    }
    Ok(Section5 {
        num_points: read_as!(u32, body, 0),
        template_number,
        representation,
    })
}

fn unpack_section6(body: &[u8]) -> Result<Section6, GribError> {
    if body.is_empty() {
        return Err(GribError::InputTruncated(0));
    }
    Ok(Section6 {
        bitmap_indicator: body[0],
        bitmap: body[1..].to_vec(),
    })
}

/// Decodes the sections of one message from `body`, the bytes between
/// Section 0 and the end of the message.
///
/// Sections must arrive in strictly ascending order, each exactly once
/// (Section 2 may be absent); anything else is
/// [`GribError::MalformedSection`]. Section 7 is unpacked against the
/// already-decoded Section 5 descriptor.
pub(crate) fn decode_message(section0: Section0, body: &[u8]) -> Result<Message, GribError> {
    let mut sect1 = None;
    let mut sect2 = None;
    let mut sect3 = None;
    let mut sect4 = None;
    let mut sect5: Option<Section5> = None;
    let mut sect6 = None;
    let mut sect7 = None;

    let mut pos = 0;
    let mut last = 0u8;
    loop {
        if body.len() - pos < END_SECTION_SIZE {
            return Err(GribError::InputTruncated(pos));
        }
        if read_as!(u32, body, pos) == END_SECTION_MARKER {
            if last != 7 {
                return Err(GribError::MalformedSection(8));
            }
            break;
        }

        if body.len() - pos < SECTION_HEAD_SIZE {
            return Err(GribError::InputTruncated(pos));
        }
        let head = SectionHead {
            length: read_as!(u32, body, pos),
            number: body[pos + 4],
        };
        let length = head.length as usize;
        if length < SECTION_HEAD_SIZE {
            return Err(GribError::CorruptData(format!(
                "section {} declares {length} bytes",
                head.number
            )));
        }
        if length > body.len() - pos {
            return Err(GribError::InputTruncated(body.len()));
        }

        // Strictly ascending, no repeats; only Section 2 is optional.
        let in_order = head.number == last + 1 || (last == 1 && head.number == 3);
        if !in_order || head.number > 7 {
            return Err(GribError::MalformedSection(head.number));
        }

        debug!("section {} ({length} bytes)", head.number);
        let content = &body[pos + SECTION_HEAD_SIZE..pos + length];
        match head.number {
            1 => sect1 = Some(unpack_section1(content)?),
            2 => {
                sect2 = Some(Section2 {
                    data: content.to_vec(),
                })
            }
            3 => sect3 = Some(unpack_section3(content)?),
            4 => sect4 = Some(unpack_section4(content)?),
            5 => sect5 = Some(unpack_section5(content)?),
            6 => sect6 = Some(unpack_section6(content)?),
            7 => {
                // Decoding the values requires the finalized Section 5
                // descriptor; the ordering rule above guarantees it.
                let sect5 = sect5.as_ref().ok_or(GribError::MalformedSection(7))?;
                let data =
                    decode_values(&sect5.representation, sect5.num_points as usize, content)?;
                sect7 = Some(Section7 { data });
            }
            _ => unreachable!(),
        }
        last = head.number;
        pos += length;
    }

    Ok(Message {
        section0,
        section1: sect1.ok_or(GribError::MalformedSection(1))?,
        section2: sect2,
        section3: sect3.ok_or(GribError::MalformedSection(3))?,
        section4: sect4.ok_or(GribError::MalformedSection(4))?,
        section5: sect5.ok_or(GribError::MalformedSection(5))?,
        section6: sect6.ok_or(GribError::MalformedSection(6))?,
        section7: sect7.ok_or(GribError::MalformedSection(7))?,
    })
}

/// Fills `buf` completely, or reports a clean end of input when the
/// source is already exhausted. A partial fill is a truncation.
fn read_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, GribError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(GribError::InputTruncated(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// An iterator over the messages of a GRIB2 byte stream.
///
/// Each message owns a disjoint byte range, so iteration carries no
/// state between messages. Running out of input at a message boundary
/// ends the iteration cleanly; any failure inside a message yields the
/// error and fuses the stream — there is no resynchronization.
pub struct MessageStream<R> {
    reader: R,
    done: bool,
}

impl<R: Read> MessageStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    fn read_message(&mut self, head: &[u8]) -> Result<Message, GribError> {
        let section0 = Section0::from_slice(head)?;
        let body_len = section0
            .total_length
            .checked_sub(SECTION0_SIZE as u64)
            .filter(|len| *len >= END_SECTION_SIZE as u64)
            .ok_or_else(|| {
                GribError::CorruptData(format!(
                    "message declares {} total bytes",
                    section0.total_length
                ))
            })?;

        let mut body = vec![0; body_len as usize];
        if !read_or_eof(&mut self.reader, &mut body)? {
            return Err(GribError::InputTruncated(SECTION0_SIZE));
        }
        decode_message(section0, &body)
    }
}

impl<R: Read> Iterator for MessageStream<R> {
    type Item = Result<Message, GribError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut head = [0u8; SECTION0_SIZE];
        match read_or_eof(&mut self.reader, &mut head) {
            Ok(false) => {
                self.done = true;
                return None;
            }
            Ok(true) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        }

        let result = self.read_message(&head);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

fn collect_messages<R: Read>(
    stream: MessageStream<R>,
    limit: usize,
) -> (Vec<Message>, Option<GribError>) {
    let mut messages = Vec::new();
    for result in stream {
        match result {
            Ok(message) => {
                messages.push(message);
                if messages.len() >= limit {
                    break;
                }
            }
            Err(e) => {
                warn!("stopping after {} messages: {e}", messages.len());
                return (messages, Some(e));
            }
        }
    }
    (messages, None)
}

/// Reads every message from the stream. On failure the messages
/// decoded before the error are returned together with it; a clean end
/// of input is not an error.
pub fn read_messages<R: Read>(reader: R) -> (Vec<Message>, Option<GribError>) {
    collect_messages(MessageStream::new(reader), usize::MAX)
}

/// Reads at most `limit` messages from the stream.
pub fn read_n_messages<R: Read>(reader: R, limit: usize) -> (Vec<Message>, Option<GribError>) {
    collect_messages(MessageStream::new(reader), limit)
}
