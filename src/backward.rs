//! The IANA `backward` file.
//!
//! `Link<TAB>targetId<TAB>linkName` lines declaring that an old zone id is
//! equivalent to a current one. Links can point at other links; consumers
//! want the collapsed old-to-current mapping, and a chain that never
//! terminates within the collapse limit indicates a cycle in the data.

use core::fmt::Write as _;
use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::error::{TzLookupError, TzLookupResult};

/// The longest link chain tolerated while collapsing. Anything longer is
/// treated as a cycle.
const MAX_CHAIN_LENGTH: usize = 2;

#[derive(Debug, Default, Clone)]
pub struct BackwardFile {
    /// linkName (old id) -> target (newer id, possibly itself a link).
    links: HashMap<String, String>,
}

impl BackwardFile {
    pub fn parse(src: &str) -> TzLookupResult<BackwardFile> {
        let mut backward = BackwardFile::default();
        for line in src.lines() {
            let mut fields = line.split_whitespace();
            if fields.next() != Some("Link") {
                continue;
            }
            let (Some(target), Some(link_name)) = (fields.next(), fields.next()) else {
                continue;
            };
            backward.add_link(target, link_name)?;
        }
        Ok(backward)
    }

    fn add_link(&mut self, target: &str, link_name: &str) -> TzLookupResult<()> {
        if self
            .links
            .insert(link_name.to_owned(), target.to_owned())
            .is_some()
        {
            return Err(TzLookupError::DuplicateLink(link_name.to_owned()));
        }
        Ok(())
    }

    /// The raw old-id to target mapping, uncollapsed.
    pub fn links(&self) -> &HashMap<String, String> {
        &self.links
    }

    /// The collapsed old-id to current-id mapping: chains of links are
    /// followed to their final target, and chains longer than
    /// [`MAX_CHAIN_LENGTH`] fail as cycles.
    pub fn direct_links(&self) -> TzLookupResult<HashMap<String, String>> {
        let mut collapsed = HashMap::new();
        for from in self.links.keys() {
            let mut current = from.as_str();
            let mut chain_length = 0;
            while let Some(next) = self.links.get(current) {
                chain_length += 1;
                if chain_length > MAX_CHAIN_LENGTH {
                    return Err(TzLookupError::AliasCycle(from.clone(), MAX_CHAIN_LENGTH));
                }
                current = next;
            }
            collapsed.insert(from.clone(), current.to_owned());
        }
        Ok(collapsed)
    }

    /// Every id linked to `zone_id` in either direction, including through
    /// intermediate links, excluding `zone_id` itself. Sorted for stable
    /// output.
    pub fn all_alternative_ids(&self, zone_id: &str) -> BTreeSet<String> {
        let mut known: BTreeSet<String> = BTreeSet::new();
        known.insert(zone_id.to_owned());
        let mut queue = vec![zone_id.to_owned()];
        while let Some(search) = queue.pop() {
            for (from, to) in &self.links {
                let neighbor = if *from == search {
                    to
                } else if *to == search {
                    from
                } else {
                    continue;
                };
                if known.insert(neighbor.clone()) {
                    queue.push(neighbor.clone());
                }
            }
        }
        known.remove(zone_id);
        known
    }

    /// Renders the links back in `backward` file form, sorted by link name.
    /// Parsing the result reproduces the same mapping.
    pub fn to_backward_string(&self) -> String {
        let mut ordered: Vec<(&String, &String)> = self.links.iter().collect();
        ordered.sort();
        let mut out = String::new();
        for (link_name, target) in ordered {
            let _ = writeln!(out, "Link\t{target}\t{link_name}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# This file provides links from old to current zone names.
Link\tAmerica/Nuuk\tAmerica/Godthab
Link\tAsia/Kolkata\tAsia/Calcutta
Link\tEurope/Dublin\tEire
Link\tAsia/Calcutta\tIndia";

    #[test]
    fn only_link_lines_count() {
        let backward = BackwardFile::parse(SAMPLE).unwrap();
        assert_eq!(backward.links().len(), 4);
        assert_eq!(
            backward.links().get("America/Godthab").map(String::as_str),
            Some("America/Nuuk")
        );
    }

    #[test]
    fn chains_collapse_to_the_final_target() {
        let backward = BackwardFile::parse(SAMPLE).unwrap();
        let direct = backward.direct_links().unwrap();
        // India -> Asia/Calcutta -> Asia/Kolkata collapses in one step.
        assert_eq!(
            direct.get("India").map(String::as_str),
            Some("Asia/Kolkata")
        );
        assert_eq!(
            direct.get("Asia/Calcutta").map(String::as_str),
            Some("Asia/Kolkata")
        );
    }

    #[test]
    fn cycles_are_fatal() {
        let cyclic = "Link\tA\tB\nLink\tB\tA";
        let backward = BackwardFile::parse(cyclic).unwrap();
        assert!(matches!(
            backward.direct_links(),
            Err(TzLookupError::AliasCycle(_, _))
        ));
    }

    #[test]
    fn duplicate_links_are_rejected() {
        let duped = "Link\tAmerica/Nuuk\tAmerica/Godthab\nLink\tAmerica/Thule\tAmerica/Godthab";
        assert!(matches!(
            BackwardFile::parse(duped),
            Err(TzLookupError::DuplicateLink(_))
        ));
    }

    #[test]
    fn alternatives_cross_the_link_both_ways() {
        let backward = BackwardFile::parse(SAMPLE).unwrap();
        let alts: Vec<String> = backward
            .all_alternative_ids("Asia/Kolkata")
            .into_iter()
            .collect();
        assert_eq!(alts, vec!["Asia/Calcutta", "India"]);
        let alts: Vec<String> = backward
            .all_alternative_ids("America/Godthab")
            .into_iter()
            .collect();
        assert_eq!(alts, vec!["America/Nuuk"]);
    }

    #[test]
    fn serialization_round_trips() {
        let backward = BackwardFile::parse(SAMPLE).unwrap();
        let reparsed = BackwardFile::parse(&backward.to_backward_string()).unwrap();
        assert_eq!(backward.links(), reparsed.links());
    }
}
