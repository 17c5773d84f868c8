//! GRIB2 section parsing.
//!
//! Only the sections that carry coordinate metadata are decoded: the
//! indicator (0), identification (1) and product definition (4). The
//! remaining sections are walked over by length so that multi-field
//! messages can be split into individual records.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Grib2Error, Result};
use crate::record::{EnsembleInfo, FixedSurface, ForecastTime, TimeUnit};

/// Length of section 0 in edition 2.
pub const INDICATOR_LEN: usize = 16;

/// Section 8 marker.
pub const END_MARKER: &[u8; 4] = b"7777";

/// Section 0: Indicator Section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub centre: u16,
    pub sub_centre: u16,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
}

/// Position of one section inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRef {
    pub number: u8,
    pub offset: usize,
    pub length: usize,
}

/// Section 4: Product Definition Section, reduced to coordinate metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub forecast: ForecastTime,
    pub level: Option<FixedSurface>,
    pub ensemble: Option<EnsembleInfo>,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from the start of a message.
///
/// Edition 1 indicators are recognised so that callers can skip them; their
/// length lives in a 3-byte field instead of the 8-byte edition 2 field.
pub fn parse_indicator(data: &[u8], offset: u64) -> Result<Indicator> {
    if data.len() < 8 {
        return Err(Grib2Error::format(offset, "not enough data for indicator section"));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::format(offset, "invalid GRIB magic bytes"));
    }

    let edition = data[7];
    match edition {
        1 => Ok(Indicator {
            discipline: 0,
            edition,
            message_length: u32::from_be_bytes([0, data[4], data[5], data[6]]) as u64,
        }),
        2 => {
            if data.len() < INDICATOR_LEN {
                return Err(Grib2Error::format(offset, "not enough data for indicator section"));
            }
            let mut length = [0u8; 8];
            length.copy_from_slice(&data[8..16]);
            Ok(Indicator {
                discipline: data[6],
                edition,
                message_length: u64::from_be_bytes(length),
            })
        }
        other => Err(Grib2Error::UnsupportedEdition {
            edition: other,
            offset,
        }),
    }
}

/// Walk the sections of a complete message, stopping at the end marker.
pub fn sections(message: &[u8]) -> Result<Vec<SectionRef>> {
    let mut found = Vec::new();
    let mut offset = INDICATOR_LEN;

    loop {
        if message.len() >= offset + 4 && &message[offset..offset + 4] == END_MARKER {
            return Ok(found);
        }

        if offset + 5 > message.len() {
            return Err(Grib2Error::section(8, "end marker not found"));
        }

        let length = read_u32(message, offset) as usize;
        let number = message[offset + 4];

        if length < 5 || offset + length > message.len() {
            return Err(Grib2Error::section(
                number,
                format!("invalid section length {} at byte {}", length, offset),
            ));
        }

        found.push(SectionRef {
            number,
            offset,
            length,
        });
        offset += length;
    }
}

/// Find the first section with the given number.
pub fn find_section(message: &[u8], section_num: u8) -> Result<SectionRef> {
    sections(message)?
        .into_iter()
        .find(|s| s.number == section_num)
        .ok_or_else(|| Grib2Error::section(section_num, "section not found"))
}

/// Parse Section 1 (Identification).
pub fn parse_identification(section: &[u8]) -> Result<Identification> {
    if section.len() < 19 {
        return Err(Grib2Error::section(1, "not enough data"));
    }

    let centre = read_u16(section, 5);
    let sub_centre = read_u16(section, 7);
    let significance_of_reference_time = section[11];

    let year = read_u16(section, 12);
    let (month, day, hour, minute, second) =
        (section[14], section[15], section[16], section[17], section[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            Grib2Error::section(
                1,
                format!(
                    "invalid reference time: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })?;

    Ok(Identification {
        centre,
        sub_centre,
        significance_of_reference_time,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
    })
}

/// Parse Section 4 (Product Definition).
///
/// Supported templates:
/// - 4.0  analysis or forecast at a horizontal level
/// - 4.1  individual ensemble forecast
/// - 4.8  statistically processed (accumulation, average, ...)
/// - 4.11 individual ensemble forecast, statistically processed
pub fn parse_product_definition(section: &[u8]) -> Result<ProductDefinition> {
    if section.len() < 9 {
        return Err(Grib2Error::section(4, "not enough data"));
    }

    let template = read_u16(section, 7);
    let required = match template {
        0 => 34,
        1 => 37,
        8 => 58,
        11 => 61,
        other => return Err(Grib2Error::UnsupportedTemplate(other)),
    };

    if section.len() < required {
        return Err(Grib2Error::section(
            4,
            format!(
                "template 4.{} needs {} bytes, got {}",
                template,
                required,
                section.len()
            ),
        ));
    }

    let parameter_category = section[9];
    let parameter_number = section[10];

    let unit = TimeUnit::from_code(section[17])?;
    let forecast_offset = read_u32(section, 18) as i64 * unit.seconds();

    let level = fixed_surface(section[22], section[23], &section[24..28]);

    let ensemble = match template {
        1 | 11 => Some(EnsembleInfo {
            kind: section[34],
            perturbation: section[35],
            size: section[36],
        }),
        _ => None,
    };

    // Time range specification: unit at +2, length at +3..+7 from the
    // start of the first range block.
    let forecast = match template {
        8 | 11 => {
            let block = if template == 8 { 46 } else { 49 };
            let range_unit = TimeUnit::from_code(section[block + 2])?;
            let range_length = read_u32(section, block + 3) as i64 * range_unit.seconds();
            ForecastTime::Interval {
                start_secs: forecast_offset,
                end_secs: forecast_offset + range_length,
            }
        }
        _ => ForecastTime::Instant {
            offset_secs: forecast_offset,
        },
    };

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        forecast,
        level,
        ensemble,
    })
}

// ===== Helper Functions =====

/// Decode a fixed surface; type 255 means "no surface".
fn fixed_surface(level_type: u8, scale: u8, scaled: &[u8]) -> Option<FixedSurface> {
    if level_type == 255 {
        return None;
    }

    let missing = scale == 255 && scaled.iter().all(|b| *b == 0xFF);
    let value = if missing {
        0.0
    } else {
        let factor = decode_signed_octet(scale) as i32;
        let scaled = decode_grib2_signed(scaled) as f64;
        // Dividing by an exact power of ten yields the double nearest the
        // encoded decimal, so 3 at scale 1 is exactly 0.3.
        if factor >= 0 {
            scaled / 10f64.powi(factor)
        } else {
            scaled * 10f64.powi(-factor)
        }
    };

    Some(FixedSurface { level_type, value })
}

/// Decode a 4-byte GRIB2 sign-magnitude integer.
///
/// The most significant bit carries the sign; the remaining 31 bits are the
/// magnitude. Slices of any other length decode to zero.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    if bytes.len() != 4 {
        return 0;
    }

    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 1-byte GRIB2 sign-magnitude integer.
pub fn decode_signed_octet(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
