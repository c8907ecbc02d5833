//! The end-to-end build pipeline.
//!
//! Parses the three inputs, cross-checks them, resolves every country and
//! assembles the output document. Countries are independent of each other,
//! so they are resolved on a worker pool, each with its own diagnostics
//! collector, and the collectors are folded back together in input order so
//! the report reads like a sequential run.

use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::backward::BackwardFile;
use crate::diagnostics::Diagnostics;
use crate::error::TzLookupError;
use crate::input::CountryZonesInput;
use crate::output::TzLookupDocument;
use crate::resolver::CountryResolver;
use crate::rules::ZoneRules;
use crate::utils::all_unique;
use crate::zonetab::ZoneTab;

#[derive(Debug, Error)]
pub enum GeneratorError {
    /// An input that could not be understood at all: malformed or
    /// unrecognized syntax, or alias links that cannot be collapsed.
    #[error("invalid input: {0}")]
    Schema(#[source] TzLookupError),

    /// Validation failed; the details are in the diagnostics.
    #[error("validation failed")]
    Failed,
}

/// Runs the whole build. On success the returned document is complete; on
/// failure nothing should be emitted, and `diags` explains why.
pub fn generate(
    rules: &(dyn ZoneRules + Sync),
    countryzones: &str,
    zone_tab: &str,
    backward: &str,
    diags: &mut Diagnostics,
) -> Result<TzLookupDocument, GeneratorError> {
    let country_zones = parse_input(CountryZonesInput::parse(countryzones), diags)?;
    let zone_tab = parse_input(ZoneTab::parse(zone_tab), diags)?;
    let backward = parse_input(BackwardFile::parse(backward), diags)?;

    // The countryzones data and the rule data must describe the same tzdb
    // release, or every derived instant would silently be wrong.
    if rules.data_version() != country_zones.iana_version {
        diags.fatal(format!(
            "input data is for {} but the rule data is for {}",
            country_zones.iana_version,
            rules.data_version()
        ));
        return Err(GeneratorError::Failed);
    }

    // Collapse the alias links early: a cycle invalidates the whole input.
    let links = match backward.direct_links() {
        Ok(links) => links,
        Err(err) => {
            diags.fatal(err.to_string());
            return Err(GeneratorError::Schema(err));
        }
    };
    for (from, to) in &links {
        if !rules.is_resolvable(from) {
            diags.error(format!("bad 'from' link: {from} -> {to}"));
        }
        if !rules.is_resolvable(to) {
            diags.error(format!("bad 'to' link: {from} -> {to}"));
        }
    }

    let iso_codes: Vec<&str> = country_zones
        .countries
        .iter()
        .map(|c| c.iso_code.as_str())
        .collect();
    if iso_codes
        .iter()
        .any(|code| !code.chars().all(|ch| ch.is_ascii_lowercase()))
    {
        diags.fatal(format!("non-lowercase country ISO codes found in: {iso_codes:?}"));
        return Err(GeneratorError::Failed);
    }
    if !all_unique(iso_codes.iter().copied()) {
        diags.fatal(format!("duplicate input country entries found: {iso_codes:?}"));
        return Err(GeneratorError::Failed);
    }

    // zone.tab spells countries upper-case; the two files must agree on the
    // country set exactly.
    let zone_tab_mapping = zone_tab.country_to_zone_ids();
    let upper_isos: hashbrown::HashSet<String> =
        iso_codes.iter().map(|code| code.to_uppercase()).collect();
    let zone_tab_isos: hashbrown::HashSet<String> = zone_tab_mapping.keys().cloned().collect();
    if upper_isos != zone_tab_isos {
        let only_tab: Vec<&String> = zone_tab_isos.difference(&upper_isos).collect();
        let only_czones: Vec<&String> = upper_isos.difference(&zone_tab_isos).collect();
        diags.fatal(format!(
            "zone.tab contains {only_tab:?} not present in countryzones, \
             countryzones contains {only_czones:?} not present in zone.tab"
        ));
        return Err(GeneratorError::Failed);
    }

    let Some(resolver) = CountryResolver::new(rules, &backward, diags) else {
        return Err(GeneratorError::Failed);
    };

    info!(
        "resolving {} countries for {}",
        country_zones.countries.len(),
        country_zones.iana_version
    );

    let resolved: Vec<_> = country_zones
        .countries
        .par_iter()
        .map(|country| {
            let mut country_diags = Diagnostics::new();
            let iana_zone_ids = zone_tab_mapping
                .get(&country.iso_code.to_uppercase())
                .expect("country sets were compared above");
            let record = resolver.resolve(country, iana_zone_ids, &mut country_diags);
            (record, country_diags)
        })
        .collect();

    let mut countries = Vec::with_capacity(resolved.len());
    for (record, country_diags) in resolved {
        diags.merge(country_diags);
        if let Some(record) = record {
            debug!("resolved {}", record.iso_code);
            countries.push(record);
        }
    }

    if diags.has_error() {
        return Err(GeneratorError::Failed);
    }
    Ok(TzLookupDocument {
        iana_version: country_zones.iana_version,
        countries,
    })
}

fn parse_input<T>(
    result: Result<T, TzLookupError>,
    diags: &mut Diagnostics,
) -> Result<T, GeneratorError> {
    result.map_err(|err| {
        diags.fatal(err.to_string());
        GeneratorError::Schema(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{TransitionZoneRules, ZoneOffsets};

    fn rules() -> TransitionZoneRules {
        let mut rules = TransitionZoneRules::new("2021a");
        rules.insert_zone(
            "Europe/London",
            ZoneOffsets::new(0, 0, "Greenwich Mean Time"),
            vec![],
        );
        rules.insert_zone(
            "Europe/Paris",
            ZoneOffsets::new(3_600_000, 0, "Central European Standard Time"),
            vec![],
        );
        rules
    }

    const COUNTRYZONES: &str = concat!(
        "ianaVersion:\"2021a\"\n",
        "countries:<\n",
        "  isoCode:\"fr\"\n",
        "  timeZoneMappings:<\n",
        "    utcOffset:\"1:00\"\n",
        "    id:\"Europe/Paris\"\n",
        "  >\n",
        ">\n",
        "countries:<\n",
        "  isoCode:\"gb\"\n",
        "  timeZoneMappings:<\n",
        "    utcOffset:\"0:00\"\n",
        "    id:\"Europe/London\"\n",
        "  >\n",
        ">\n",
    );

    const ZONE_TAB: &str =
        "FR\t+4852+00220\tEurope/Paris\nGB\t+513030-0000731\tEurope/London\n";

    #[test]
    fn happy_path_produces_a_document() {
        let rules = rules();
        let mut diags = Diagnostics::new();
        let doc = generate(&rules, COUNTRYZONES, ZONE_TAB, "", &mut diags).unwrap();
        assert_eq!(doc.iana_version, "2021a");
        assert_eq!(doc.countries.len(), 2);
        // Output preserves countryzones order.
        assert_eq!(doc.countries[0].iso_code.as_str(), "fr");
        assert_eq!(doc.countries[1].iso_code.as_str(), "gb");
        assert!(!diags.has_error(), "{}", diags.render());
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let mut rules = rules();
        rules.version = "2020d".to_owned();
        let mut diags = Diagnostics::new();
        let result = generate(&rules, COUNTRYZONES, ZONE_TAB, "", &mut diags);
        assert!(matches!(result, Err(GeneratorError::Failed)));
        assert!(diags.halt_requested());
    }

    #[test]
    fn malformed_countryzones_is_a_schema_error() {
        let rules = rules();
        let mut diags = Diagnostics::new();
        let result = generate(&rules, "ianaVersion:\"2021a\"\nnonsense\n", ZONE_TAB, "", &mut diags);
        assert!(matches!(result, Err(GeneratorError::Schema(_))));
    }

    #[test]
    fn alias_cycle_is_a_schema_error() {
        let rules = rules();
        let mut diags = Diagnostics::new();
        let backward = "Link\tA\tB\nLink\tB\tA\n";
        let result = generate(&rules, COUNTRYZONES, ZONE_TAB, backward, &mut diags);
        assert!(matches!(
            result,
            Err(GeneratorError::Schema(TzLookupError::AliasCycle(_, _)))
        ));
    }

    #[test]
    fn country_set_mismatch_is_fatal() {
        let rules = rules();
        let mut diags = Diagnostics::new();
        let result = generate(
            &rules,
            COUNTRYZONES,
            "FR\t+4852+00220\tEurope/Paris\n",
            "",
            &mut diags,
        );
        assert!(matches!(result, Err(GeneratorError::Failed)));
        assert!(diags.render().contains("not present"), "{}", diags.render());
    }

    #[test]
    fn one_broken_country_does_not_hide_its_siblings() {
        let rules = rules();
        // gb claims an offset that disagrees with the rule data.
        let broken = COUNTRYZONES.replace("utcOffset:\"0:00\"", "utcOffset:\"3:00\"");
        let mut diags = Diagnostics::new();
        let result = generate(&rules, &broken, ZONE_TAB, "", &mut diags);
        assert!(matches!(result, Err(GeneratorError::Failed)));
        let rendered = diags.render();
        assert!(rendered.contains("country=gb"), "{rendered}");
        assert!(
            !rendered.contains("country=fr"),
            "fr resolved cleanly: {rendered}"
        );
    }
}
