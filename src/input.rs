//! The countryzones input file.
//!
//! A textual, protobuf-style record format: scalar `key:"value"` lines plus
//! nested blocks opened with `key:<` (or `key {`) and closed with `>` (or
//! `}`). Only two levels of nesting occur, countries and their zone
//! mappings.

use tinystr::TinyAsciiStr;

use crate::error::{TzLookupError, TzLookupResult};

/// A two-letter ISO country code.
pub type CountryCode = TinyAsciiStr<2>;

/// One zone entry of a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMappingInput {
    pub zone_id: String,
    /// The expected non-DST offset, e.g. `"-5:00"`.
    pub utc_offset: String,
    /// Dominance between otherwise identical zones; higher wins.
    pub priority: u8,
    /// Whether the zone should be offered in a settings picker.
    pub shown_in_picker: bool,
    /// The preferred modern id when `zone_id` is an old alias.
    pub alias_id: Option<String>,
}

impl Default for ZoneMappingInput {
    fn default() -> Self {
        Self {
            zone_id: String::new(),
            utc_offset: String::new(),
            priority: 1,
            shown_in_picker: true,
            alias_id: None,
        }
    }
}

/// One country record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInput {
    pub iso_code: CountryCode,
    pub default_zone_id: Option<String>,
    pub default_time_zone_boost: bool,
    /// Zone mappings in file order; the order is significant and preserved
    /// through to the output.
    pub zones: Vec<ZoneMappingInput>,
}

/// The parsed countryzones file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryZonesInput {
    pub iana_version: String,
    pub countries: Vec<CountryInput>,
}

const FILE: &str = "countryzones";

fn parse_error(line: u32, message: impl Into<String>) -> TzLookupError {
    TzLookupError::Parse {
        file: FILE,
        line,
        message: message.into(),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.split_once('#') {
        Some((kept, _)) => kept,
        None => line,
    }
}

/// Classifies one non-empty line.
enum Line<'a> {
    Open(&'a str),
    Close,
    Scalar(&'a str, &'a str),
}

fn classify(line: &str, number: u32) -> TzLookupResult<Line<'_>> {
    if line == ">" || line == "}" {
        return Ok(Line::Close);
    }
    if let Some(key) = line.strip_suffix('{') {
        let key = key.trim_end().trim_end_matches(':').trim_end();
        return Ok(Line::Open(key));
    }
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| parse_error(number, format!("expected key:value, got {line:?}")))?;
    let value = value.trim();
    if value == "<" {
        return Ok(Line::Open(key.trim()));
    }
    Ok(Line::Scalar(key.trim(), value))
}

fn unquote<'a>(value: &'a str, number: u32) -> TzLookupResult<&'a str> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| parse_error(number, format!("expected quoted string, got {value}")))
}

fn parse_bool(value: &str, number: u32) -> TzLookupResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(parse_error(number, format!("expected bool, got {other}"))),
    }
}

#[derive(Default)]
struct CountryBuilder {
    iso_code: Option<CountryCode>,
    default_zone_id: Option<String>,
    default_time_zone_boost: bool,
    zones: Vec<ZoneMappingInput>,
}

impl CountryBuilder {
    fn finish(self, number: u32) -> TzLookupResult<CountryInput> {
        Ok(CountryInput {
            iso_code: self
                .iso_code
                .ok_or_else(|| parse_error(number, "country without isoCode"))?,
            default_zone_id: self.default_zone_id,
            default_time_zone_boost: self.default_time_zone_boost,
            zones: self.zones,
        })
    }
}

impl CountryZonesInput {
    pub fn parse(src: &str) -> TzLookupResult<CountryZonesInput> {
        let mut iana_version: Option<String> = None;
        let mut countries = Vec::new();
        let mut country: Option<CountryBuilder> = None;
        let mut mapping: Option<ZoneMappingInput> = None;

        for (index, raw) in src.lines().enumerate() {
            let number = index as u32 + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            match classify(line, number)? {
                Line::Open("countries") if country.is_none() => {
                    country = Some(CountryBuilder::default());
                }
                Line::Open("timeZoneMappings") if country.is_some() && mapping.is_none() => {
                    mapping = Some(ZoneMappingInput::default());
                }
                Line::Open(key) => {
                    return Err(parse_error(number, format!("unexpected block {key:?}")));
                }
                Line::Close => {
                    if let Some(done) = mapping.take() {
                        if done.zone_id.is_empty() || done.utc_offset.is_empty() {
                            return Err(parse_error(number, "mapping requires id and utcOffset"));
                        }
                        country
                            .as_mut()
                            .expect("mapping exists only inside a country")
                            .zones
                            .push(done);
                    } else if let Some(done) = country.take() {
                        countries.push(done.finish(number)?);
                    } else {
                        return Err(parse_error(number, "unmatched block close"));
                    }
                }
                Line::Scalar(key, value) => match (&mut country, &mut mapping, key) {
                    (_, Some(m), "id") => unquote(value, number)?.clone_into(&mut m.zone_id),
                    (_, Some(m), "utcOffset") => {
                        unquote(value, number)?.clone_into(&mut m.utc_offset)
                    }
                    (_, Some(m), "priority") => {
                        m.priority = value
                            .parse::<u8>()
                            .map_err(|e| parse_error(number, format!("bad priority: {e}")))?;
                    }
                    (_, Some(m), "shownInPicker") => {
                        m.shown_in_picker = parse_bool(value, number)?;
                    }
                    (_, Some(m), "aliasId") => {
                        m.alias_id = Some(unquote(value, number)?.to_owned());
                    }
                    (Some(c), None, "isoCode") => {
                        let code = unquote(value, number)?;
                        c.iso_code = Some(code.parse().map_err(|_| {
                            parse_error(number, format!("bad isoCode {code:?}"))
                        })?);
                    }
                    (Some(c), None, "defaultTimeZoneId") => {
                        c.default_zone_id = Some(unquote(value, number)?.to_owned());
                    }
                    (Some(c), None, "defaultTimeZoneBoost") => {
                        c.default_time_zone_boost = parse_bool(value, number)?;
                    }
                    (None, None, "ianaVersion") => {
                        iana_version = Some(unquote(value, number)?.to_owned());
                    }
                    _ => {
                        return Err(parse_error(number, format!("unknown field {key:?}")));
                    }
                },
            }
        }
        if country.is_some() || mapping.is_some() {
            return Err(parse_error(
                src.lines().count() as u32,
                "unterminated block at end of input",
            ));
        }
        Ok(CountryZonesInput {
            iana_version: iana_version.ok_or_else(|| parse_error(0, "missing ianaVersion"))?,
            countries,
        })
    }
}
