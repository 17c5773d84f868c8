//! Synthetic GRIB2 message builder.
//!
//! Creates structurally valid GRIB2 messages carrying only the metadata the
//! scanner reads. Data sections hold a few placeholder bytes; nothing here
//! produces unpackable grid values.

/// Product definition of one field inside a message.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub category: u8,
    pub number: u8,
    /// Code table 4.4 unit of `forecast_time`.
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_scale: i8,
    pub level_value: i32,
    /// (type of ensemble, perturbation number, ensemble size)
    pub ensemble: Option<(u8, u8, u8)>,
    /// (code table 4.4 unit, length) of the statistical processing range
    pub interval: Option<(u8, u32)>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            category: 0,
            number: 0, // TMP
            time_unit: 1,
            forecast_time: 0,
            level_type: 103, // m above ground
            level_scale: 0,
            level_value: 2,
            ensemble: None,
            interval: None,
        }
    }
}

impl FieldSpec {
    /// Product definition template implied by the optional parts.
    pub fn template(&self) -> u16 {
        match (self.ensemble.is_some(), self.interval.is_some()) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 8,
            (true, true) => 11,
        }
    }
}

/// Build a GRIB2 message with one or more fields.
#[derive(Debug, Clone)]
pub struct Grib2MessageBuilder {
    discipline: u8,
    edition: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    fields: Vec<FieldSpec>,
}

impl Default for Grib2MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Grib2MessageBuilder {
    /// GFS-like defaults: NCEP, 2025-12-10 12Z, 2 m temperature, analysis.
    pub fn new() -> Self {
        Self {
            discipline: 0,
            edition: 2,
            center: 7,
            year: 2025,
            month: 12,
            day: 10,
            hour: 12,
            minute: 0,
            fields: vec![FieldSpec::default()],
        }
    }

    pub fn with_discipline(mut self, discipline: u8) -> Self {
        self.discipline = discipline;
        self
    }

    /// Write a different edition number into section 0 (for rejection tests).
    pub fn with_edition(mut self, edition: u8) -> Self {
        self.edition = edition;
        self
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_reference_minute(mut self, minute: u8) -> Self {
        self.minute = minute;
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.first_mut().category = category;
        self.first_mut().number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.first_mut().level_type = level_type;
        self.first_mut().level_scale = 0;
        self.first_mut().level_value = level_value as i32;
        self
    }

    pub fn with_scaled_level(mut self, level_type: u8, scale: i8, scaled_value: i32) -> Self {
        self.first_mut().level_type = level_type;
        self.first_mut().level_scale = scale;
        self.first_mut().level_value = scaled_value;
        self
    }

    pub fn with_forecast_hour(self, hour: u32) -> Self {
        self.with_forecast_time(1, hour)
    }

    pub fn with_forecast_time(mut self, unit: u8, value: u32) -> Self {
        self.first_mut().time_unit = unit;
        self.first_mut().forecast_time = value;
        self
    }

    pub fn with_ensemble(mut self, kind: u8, perturbation: u8, size: u8) -> Self {
        self.first_mut().ensemble = Some((kind, perturbation, size));
        self
    }

    pub fn with_interval(mut self, unit: u8, length: u32) -> Self {
        self.first_mut().interval = Some((unit, length));
        self
    }

    /// Append another field (sections 4-7 repeated) to the message.
    pub fn add_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    fn first_mut(&mut self) -> &mut FieldSpec {
        &mut self.fields[0]
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.build_section1());
        body.extend_from_slice(&build_section3());
        for field in &self.fields {
            body.extend_from_slice(&build_section4(field));
            body.extend_from_slice(&build_section5());
            body.extend_from_slice(&build_section6());
            body.extend_from_slice(&build_section7());
        }

        let message_length = 16 + body.len() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(self.edition);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        message.extend_from_slice(&body);
        message.extend_from_slice(b"7777");
        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Significance of reference time (start of forecast)
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(self.minute);
        section.push(0); // Second
        section.push(0); // Production status
        section.push(1); // Type of data (forecast)
        section
    }
}

/// Concatenate messages into one stream, as a GRIB2 file does.
pub fn concat_messages(messages: &[Vec<u8>]) -> Vec<u8> {
    messages.iter().flatten().copied().collect()
}

/// Encode a GRIB2 sign-magnitude 4-byte integer.
pub fn encode_grib2_signed(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

fn encode_signed_octet(value: i8) -> u8 {
    let magnitude = value.unsigned_abs() & 0x7F;
    if value < 0 {
        magnitude | 0x80
    } else {
        magnitude
    }
}

fn build_section3() -> Vec<u8> {
    // Template 3.0 header only; the scanner walks over it by length.
    let mut section = Vec::new();
    let template_data = [0u8; 58];
    section.extend_from_slice(&(14 + template_data.len() as u32).to_be_bytes());
    section.push(3);
    section.push(0);
    section.extend_from_slice(&4u32.to_be_bytes()); // 2x2 points
    section.push(0);
    section.push(0);
    section.extend_from_slice(&0u16.to_be_bytes());
    section.extend_from_slice(&template_data);
    section
}

fn build_section4(field: &FieldSpec) -> Vec<u8> {
    let mut s = Vec::new();
    s.extend_from_slice(&0u32.to_be_bytes()); // patched below
    s.push(4);
    s.extend_from_slice(&0u16.to_be_bytes()); // Number of coordinate values
    s.extend_from_slice(&field.template().to_be_bytes());

    s.push(field.category);
    s.push(field.number);
    s.push(2); // Type of generating process (forecast)
    s.push(0); // Background generating process
    s.push(0); // Analysis or forecast process
    s.extend_from_slice(&0u16.to_be_bytes()); // Hours of cutoff
    s.push(0); // Minutes of cutoff
    s.push(field.time_unit);
    s.extend_from_slice(&field.forecast_time.to_be_bytes());

    s.push(field.level_type);
    s.push(encode_signed_octet(field.level_scale));
    s.extend_from_slice(&encode_grib2_signed(field.level_value));
    s.push(255); // Type of second fixed surface (none)
    s.push(0);
    s.extend_from_slice(&0u32.to_be_bytes());

    if let Some((kind, perturbation, size)) = field.ensemble {
        s.push(kind);
        s.push(perturbation);
        s.push(size);
    }

    if let Some((unit, length)) = field.interval {
        s.extend_from_slice(&2025u16.to_be_bytes()); // End of overall interval (unchecked)
        s.extend_from_slice(&[12, 10, 18, 0, 0]);
        s.push(1); // Number of time range specifications
        s.extend_from_slice(&0u32.to_be_bytes()); // Missing values
        s.push(1); // Statistical process: accumulation
        s.push(2); // Type of time increment
        s.push(unit);
        s.extend_from_slice(&length.to_be_bytes());
        s.push(255);
        s.extend_from_slice(&0u32.to_be_bytes());
    }

    let len = s.len() as u32;
    s[0..4].copy_from_slice(&len.to_be_bytes());
    s
}

fn build_section5() -> Vec<u8> {
    let mut section = Vec::new();
    section.extend_from_slice(&21u32.to_be_bytes());
    section.push(5);
    section.extend_from_slice(&4u32.to_be_bytes());
    section.extend_from_slice(&0u16.to_be_bytes()); // Template 5.0
    section.extend_from_slice(&288.15f32.to_be_bytes());
    section.extend_from_slice(&0i16.to_be_bytes());
    section.extend_from_slice(&0i16.to_be_bytes());
    section.push(0); // Constant field
    section.push(0);
    section
}

fn build_section6() -> Vec<u8> {
    vec![0, 0, 0, 6, 6, 255]
}

fn build_section7() -> Vec<u8> {
    vec![0, 0, 0, 5, 7]
}
