//! The country zone tree.
//!
//! A tree recording how the zones of one country agreed or diverged over
//! time. The tree grows from the future (the root) into the past (the
//! leaves): below the root every node represents a span during which all of
//! its member zones agreed on what the local time was and what it was
//! called. A node with several children marks the point, looking backward,
//! at which those zones disagreed; looking forward it marks zones being
//! standardized together, after which fewer ids are needed to describe the
//! country's local time.
//!
//! Nodes live in an arena and refer to each other by index, so construction
//! needs no parent/child ownership cycles and compression is an in-place
//! rewrite of the retained node's child list.

use core::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::error::{TzLookupError, TzLookupResult};
use crate::history::ZoneHistory;
use crate::input::CountryCode;
use crate::instant::Instant;
use crate::usage::{CountryZoneUsage, ZoneUsageRecord};

const ROOT: usize = 0;

#[derive(Debug)]
struct ZoneNode {
    /// Dotted debug address, `"0"` for the root, `"0.2.1"` for descendants.
    id: String,
    /// Member zones, as indices into the tree's history table.
    zones: Vec<usize>,
    /// How many periods back from the end of the range this node starts.
    period_offset: usize,
    /// How many consecutive periods this node spans.
    period_count: usize,
    /// The unique highest-priority member. Meaningless when `clash` is set
    /// and for the root.
    primary: usize,
    /// Whether two members tie on the highest priority.
    clash: bool,
    parent: usize,
    children: Vec<usize>,
}

impl ZoneNode {
    fn new(
        id: String,
        zones: Vec<usize>,
        period_offset: usize,
        period_count: usize,
        parent: usize,
        histories: &[ZoneHistory],
    ) -> Self {
        // Establish the dominant member up front. If more than one member
        // shares the top priority we cannot know which one is dominant.
        let mut primary = zones[0];
        let mut tied = 1;
        for &zone in &zones[1..] {
            let priority = histories[zone].priority();
            if histories[primary].priority() < priority {
                primary = zone;
                tied = 1;
            } else if histories[primary].priority() == priority {
                tied += 1;
            }
        }
        ZoneNode {
            id,
            zones,
            period_offset,
            period_count,
            primary,
            clash: tied > 1,
            parent,
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The compressed agreement tree for one country's zones.
#[derive(Debug)]
pub struct ZoneTree {
    country: CountryCode,
    start: Instant,
    end: Instant,
    histories: Vec<ZoneHistory>,
    nodes: Vec<ZoneNode>,
}

impl ZoneTree {
    /// Builds the tree for `histories`, all of which must cover the same
    /// `[start, end_exclusive)` range.
    pub fn build(
        country: CountryCode,
        histories: Vec<ZoneHistory>,
        start: Instant,
        end_exclusive: Instant,
    ) -> TzLookupResult<ZoneTree> {
        debug_assert!(!histories.is_empty());
        let mut tree = ZoneTree {
            country,
            start,
            end: end_exclusive,
            nodes: Vec::new(),
            histories,
        };
        let all: Vec<usize> = (0..tree.histories.len()).collect();
        let root = ZoneNode {
            id: String::from("0"),
            zones: all,
            period_offset: 0,
            period_count: 0,
            primary: 0,
            clash: false,
            parent: ROOT,
            children: Vec::new(),
        };
        tree.nodes.push(root);
        tree.grow()?;
        tree.compress();
        Ok(tree)
    }

    /// Splits each node's members one period further into the past until
    /// every zone has run out of periods.
    fn grow(&mut self) -> TzLookupResult<()> {
        let mut work = vec![ROOT];
        while let Some(current) = work.pop() {
            let child_offset = self.nodes[current].period_offset + 1;

            // Bucket members by their period one step further back. Only a
            // single period needs comparing: everything later already agreed,
            // or the zones would not share a node. Buckets keep first-seen
            // order so sibling order follows member order.
            let mut buckets: Vec<(crate::history::PeriodsKey<'_>, Vec<usize>)> = Vec::new();
            let mut key_index: FxHashMap<crate::history::PeriodsKey<'_>, usize> =
                FxHashMap::default();
            for &zone in &self.nodes[current].zones {
                let history = &self.histories[zone];
                let Some(period_index) = history.period_count().checked_sub(child_offset) else {
                    // The zone's history does not reach this far back; it
                    // ends at this node.
                    continue;
                };
                let key = history.key_over_range(period_index..period_index + 1);
                match key_index.get(&key) {
                    Some(&bucket) => buckets[bucket].1.push(zone),
                    None => {
                        key_index.insert(key, buckets.len());
                        buckets.push((key, vec![zone]));
                    }
                }
            }

            // Either every member moved into a child or none did; anything
            // in between means the zone data is inconsistent.
            let split: usize = buckets.iter().map(|(_, zones)| zones.len()).sum();
            if split != 0 && split != self.nodes[current].zones.len() {
                return Err(TzLookupError::PartialPartition(
                    self.nodes[current].id.clone(),
                ));
            }

            for (ordinal, (_, zones)) in buckets.into_iter().enumerate() {
                let id = format!("{}.{}", self.nodes[current].id, ordinal + 1);
                let child = ZoneNode::new(id, zones, child_offset, 1, current, &self.histories);
                let child_index = self.nodes.len();
                self.nodes.push(child);
                self.nodes[current].children.push(child_index);
                work.push(child_index);
            }
        }
        Ok(())
    }

    /// Collapses chains of single-child nodes.
    ///
    /// A single child carries the same member set as its parent, just for an
    /// earlier span, so the pair can be represented by one node with a larger
    /// period count. The retained node keeps its own offset and inherits the
    /// deepest chain node's children. Collapsed nodes stay in the arena but
    /// become unreachable.
    fn compress(&mut self) {
        let mut work: Vec<usize> = self.nodes[ROOT].children.clone();
        while let Some(current) = work.pop() {
            while self.nodes[current].children.len() == 1 {
                let child = self.nodes[current].children[0];
                self.nodes[current].period_count += self.nodes[child].period_count;
                let grandchildren = std::mem::take(&mut self.nodes[child].children);
                for &grandchild in &grandchildren {
                    self.nodes[grandchild].parent = current;
                }
                self.nodes[current].children = grandchildren;
            }
            work.extend_from_slice(&self.nodes[current].children);
        }
    }

    /// Yields reachable node indices in pre-order, root first.
    fn preorder(&self) -> impl Iterator<Item = usize> + '_ {
        let mut stack = vec![ROOT];
        core::iter::from_fn(move || {
            let current = stack.pop()?;
            stack.extend(self.nodes[current].children.iter().rev());
            Some(current)
        })
    }

    /// The instant at which a node's span ends: the end of the primary
    /// member's most recent period within the node.
    fn end_instant(&self, node: usize) -> Instant {
        let node = &self.nodes[node];
        let history = &self.histories[node.primary];
        history
            .period(history.period_count() - node.period_offset)
            .end()
    }

    fn describe_members(&self, node: usize) -> String {
        let mut out = String::new();
        for (i, &zone) in self.nodes[node].zones.iter().enumerate() {
            let history = &self.histories[zone];
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}({})", history.zone_id(), history.priority());
        }
        out
    }

    /// Returns one description per node on which two zones tie for the
    /// highest priority. Empty means usage can be derived.
    pub fn validate(&self) -> Vec<String> {
        self.preorder()
            .filter(|&node| node != ROOT && self.nodes[node].clash)
            .map(|node| self.describe_members(node))
            .collect()
    }

    /// Derives the per-zone usage records.
    ///
    /// Walking top-down, a node contributes its end instant for its primary
    /// zone (or, at a leaf, for every member); the first entry recorded for
    /// a zone wins, so a zone that is primary high in the tree keeps its
    /// longest-lived entry. Nodes directly below the root use the range end
    /// instead of their own end, which matters for zones with DST. Ends
    /// beyond `cutoff` are recorded as "still in use".
    pub fn compute_usage(&self, cutoff: Instant) -> TzLookupResult<CountryZoneUsage> {
        let clashes = self.validate();
        if !clashes.is_empty() {
            return Err(TzLookupError::PriorityClash(clashes.join("; ")));
        }

        let mut usage = CountryZoneUsage::new(self.country);
        for node in self.preorder() {
            if node == ROOT {
                continue;
            }
            let end_instant = if self.nodes[node].parent == ROOT {
                // The span of a node below the root ends where we stopped
                // generating periods, not where its last period happens to
                // end.
                self.end
            } else {
                self.end_instant(node)
            };
            let record = if cutoff.is_before(end_instant) {
                ZoneUsageRecord::still_in_use()
            } else {
                ZoneUsageRecord::replaced(
                    end_instant,
                    self.histories[self.root_subtree_primary(node)].zone_id(),
                )
            };

            if self.nodes[node].is_leaf() {
                // Zones can agree for the whole range (e.g. Canada's
                // Swift_Current and Creston), leaving leaves with several
                // members; record all of them, not just the primary.
                for &zone in &self.nodes[node].zones {
                    usage.add_entry_if_missing(self.histories[zone].zone_id(), record.clone());
                }
            } else {
                usage.add_entry_if_missing(
                    self.histories[self.nodes[node].primary].zone_id(),
                    record,
                );
            }
        }
        Ok(usage)
    }

    /// The primary member of the topmost non-root ancestor: the zone that
    /// remains in use for the whole subtree and can stand in for any member
    /// whose history has merged into it.
    fn root_subtree_primary(&self, node: usize) -> usize {
        let mut current = node;
        while self.nodes[current].parent != ROOT {
            current = self.nodes[current].parent;
        }
        self.nodes[current].primary
    }

    /// Renders the tree in Graphviz dot form for debugging; nodes with
    /// priority ties are drawn red.
    pub fn to_graphviz(&self) -> String {
        let mut out = format!("strict digraph {} {{\n", self.country);
        for node in self.preorder() {
            if node == ROOT {
                // The root is not a real node; drawing it would hide the
                // forest shape.
                continue;
            }
            let record = &self.nodes[node];
            let color = if record.clash { ",color=\"red\"" } else { "" };
            let _ = writeln!(
                out,
                "\"{}\"[label=\"{}\\nperiods={}+{}\"{color}];",
                record.id,
                self.describe_members(node),
                record.period_offset,
                record.period_count,
            );
            for &child in &record.children {
                let _ = writeln!(out, "\"{}\" -> \"{}\";", record.id, self.nodes[child].id);
            }
        }
        out.push_str("}\n");
        out
    }
}
