//! Message-by-message scanning of a GRIB2 byte stream.

use bytes::Bytes;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::{Grib2Error, Result};
use crate::record::{GribRecord, ParameterId};
use crate::sections::{
    parse_identification, parse_indicator, parse_product_definition, sections, Indicator,
    END_MARKER, INDICATOR_LEN,
};

const MAGIC: &[u8; 4] = b"GRIB";

/// Iterator over the fields of a GRIB2 stream.
///
/// Bytes between messages are skipped by searching for the next `GRIB`
/// magic. A malformed message produces one `Err` item and scanning resumes
/// after it, so a single bad message never hides the rest of the file.
pub struct Grib2Scanner {
    data: Bytes,
    pos: usize,
    file_id: u32,
    pending: VecDeque<Result<GribRecord>>,
    done: bool,
}

impl Grib2Scanner {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            pos: 0,
            file_id: 0,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Tag every record with the identifier of its source file.
    pub fn with_file_id(mut self, file_id: u32) -> Self {
        self.file_id = file_id;
        self
    }

    /// Scan the whole stream, separating records from errors.
    pub fn scan_all(self) -> (Vec<GribRecord>, Vec<Grib2Error>) {
        let mut records = Vec::new();
        let mut errors = Vec::new();
        for item in self {
            match item {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }
        (records, errors)
    }

    fn advance(&mut self) {
        let Some(start) = find_magic(&self.data, self.pos) else {
            self.done = true;
            return;
        };

        if start > self.pos {
            debug!(skipped = start - self.pos, offset = start, "Skipped bytes before GRIB magic");
        }

        let offset = start as u64;
        let indicator = match parse_indicator(&self.data[start..], offset) {
            Ok(indicator) => indicator,
            Err(e) => {
                self.resync(start, e);
                return;
            }
        };

        let available = (self.data.len() - start) as u64;
        if indicator.message_length < (MAGIC.len() + END_MARKER.len()) as u64 {
            self.resync(
                start,
                Grib2Error::format(offset, format!("implausible length {}", indicator.message_length)),
            );
            return;
        }
        if indicator.message_length > available {
            self.resync(
                start,
                Grib2Error::Truncated {
                    offset,
                    declared: indicator.message_length,
                    available,
                },
            );
            return;
        }

        let end = start + indicator.message_length as usize;

        if indicator.edition != 2 {
            self.pos = end;
            self.pending.push_back(Err(Grib2Error::UnsupportedEdition {
                edition: indicator.edition,
                offset,
            }));
            return;
        }

        if &self.data[end - END_MARKER.len()..end] != END_MARKER {
            self.resync(start, Grib2Error::format(offset, "missing end marker"));
            return;
        }

        self.pos = end;
        let message = self.data.slice(start..end);
        match decode_message(&message, &indicator, self.file_id, offset) {
            Ok(fields) => self.pending.extend(fields),
            Err(e) => self.pending.push_back(Err(e)),
        }
    }

    /// Queue an error and continue searching just past the bad magic.
    fn resync(&mut self, start: usize, error: Grib2Error) {
        warn!(offset = start, error = %error, "Malformed GRIB message, resynchronising");
        self.pos = start + MAGIC.len();
        self.pending.push_back(Err(error));
    }
}

impl Iterator for Grib2Scanner {
    type Item = Result<GribRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            self.advance();
        }
    }
}

/// Split one complete message into per-field records.
fn decode_message(
    message: &[u8],
    indicator: &Indicator,
    file_id: u32,
    offset: u64,
) -> Result<Vec<Result<GribRecord>>> {
    if message.len() < INDICATOR_LEN {
        return Err(Grib2Error::format(offset, "message shorter than indicator"));
    }

    let layout = sections(message)?;
    let identification = layout
        .iter()
        .find(|s| s.number == 1)
        .ok_or_else(|| Grib2Error::section(1, "section not found"))
        .and_then(|s| parse_identification(&message[s.offset..s.offset + s.length]))?;

    let fields = layout
        .iter()
        .filter(|s| s.number == 4)
        .enumerate()
        .map(|(field_index, s)| -> Result<GribRecord> {
            let pd = parse_product_definition(&message[s.offset..s.offset + s.length])?;
            Ok(GribRecord {
                file_id,
                offset,
                length: indicator.message_length,
                field_index: field_index as u16,
                centre: identification.centre,
                reference_time: identification.reference_time,
                template: pd.template,
                parameter: ParameterId::new(
                    indicator.discipline,
                    pd.parameter_category,
                    pd.parameter_number,
                ),
                forecast: pd.forecast,
                level: pd.level,
                ensemble: pd.ensemble,
            })
        })
        .collect::<Vec<_>>();

    if fields.is_empty() {
        return Err(Grib2Error::section(4, "message has no product definition"));
    }

    Ok(fields)
}

fn find_magic(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(MAGIC.len())
        .position(|w| w == MAGIC)
        .map(|p| p + from)
}
