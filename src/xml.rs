//! XML rendering of the resolved document.
//!
//! The consuming platform reads a small, attribute-heavy format: a root
//! element stamped with the IANA version, one `country` element per
//! country, one `id` element per zone. Attributes with a default value are
//! omitted rather than written out.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::TzLookupResult;
use crate::output::{CountryOutputRecord, TzLookupDocument};

fn yn(value: bool) -> &'static str {
    if value {
        "y"
    } else {
        "n"
    }
}

/// Renders the whole document as an indented XML string.
pub fn write_document(doc: &TzLookupDocument) -> TzLookupResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("timezones");
    root.push_attribute(("ianaVersion", doc.iana_version.as_str()));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("countryzones")))?;

    for country in &doc.countries {
        write_country(&mut writer, country)?;
    }

    writer.write_event(Event::End(BytesEnd::new("countryzones")))?;
    writer.write_event(Event::End(BytesEnd::new("timezones")))?;

    let bytes = writer.into_inner();
    Ok(String::from_utf8(bytes).expect("writer only emits utf-8"))
}

fn write_country(
    writer: &mut Writer<Vec<u8>>,
    country: &CountryOutputRecord,
) -> TzLookupResult<()> {
    let mut element = BytesStart::new("country");
    element.push_attribute(("code", country.iso_code.as_str()));
    element.push_attribute(("default", country.default_zone_id.as_str()));
    if country.default_time_zone_boost {
        element.push_attribute(("boost", "y"));
    }
    element.push_attribute(("everutc", yn(country.ever_uses_utc)));
    writer.write_event(Event::Start(element))?;

    for zone in &country.zones {
        let mut id = BytesStart::new("id");
        if !zone.shown_in_picker {
            id.push_attribute(("picker", "n"));
        }
        if let Some(not_used_after) = zone.not_used_after {
            id.push_attribute(("notafter", not_used_after.as_epoch_millis().to_string().as_str()));
        }
        if let Some(replacement) = &zone.replacement {
            id.push_attribute(("repl", replacement.as_str()));
        }
        if !zone.alternative_ids.is_empty() {
            id.push_attribute(("alts", zone.alternative_ids.join(",").as_str()));
        }
        writer.write_event(Event::Start(id))?;
        writer.write_event(Event::Text(BytesText::new(&zone.zone_id)))?;
        writer.write_event(Event::End(BytesEnd::new("id")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("country")))?;
    Ok(())
}
