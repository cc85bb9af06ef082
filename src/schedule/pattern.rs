use std::{collections::HashMap, fmt::Display, sync::Arc};

use crate::schedule::platform::PlatformTally;

/// Content-derived identity of a pattern.
///
/// `route-origin-destination` when the two stations are adjacent, otherwise
/// followed by a 64-bit hash of the ordered intermediate slugs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey(String);

impl PatternKey {
    pub fn new<'a, I>(route_id: &str, origin: &str, destination: &str, intermediate: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut joined = String::new();
        for (i, slug) in intermediate.into_iter().enumerate() {
            if i > 0 {
                // Slugs are alphanumerics and underscores, never a pipe.
                joined.push('|');
            }
            joined.push_str(slug);
        }
        if joined.is_empty() {
            Self(format!("{route_id}-{origin}-{destination}"))
        } else {
            let hash = seahash::hash(joined.as_bytes());
            Self(format!("{route_id}-{origin}-{destination}-{hash:016x}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An intermediate call of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternStop {
    pub station_idx: u32,
    pub platform_idx: u32,
}

/// A distinct way of travelling from one origin station to one destination.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Dense, origin-scoped index.
    pub index: u32,
    pub key: PatternKey,
    pub route_id: Arc<str>,
    pub route_name: Arc<str>,
    pub destination_idx: u32,
    pub stops: Box<[PatternStop]>,
    pub trip_count: u32,
    pub origin_platforms: PlatformTally,
    pub destination_platforms: PlatformTally,
    origin_default: Option<Arc<str>>,
    destination_default: Option<Arc<str>>,
    resolved: bool,
}

impl Pattern {
    pub fn new(
        index: u32,
        key: PatternKey,
        route_id: Arc<str>,
        route_name: Arc<str>,
        destination_idx: u32,
        stops: Box<[PatternStop]>,
    ) -> Self {
        Self {
            index,
            key,
            route_id,
            route_name,
            destination_idx,
            stops,
            trip_count: 0,
            origin_platforms: PlatformTally::default(),
            destination_platforms: PlatformTally::default(),
            origin_default: None,
            destination_default: None,
            resolved: false,
        }
    }

    /// Counts one trip occurrence and the platforms it used.
    pub fn record(&mut self, origin_platform: &Arc<str>, destination_platform: &Arc<str>) {
        debug_assert!(!self.resolved, "pattern tallied after defaults were fixed");
        self.trip_count += 1;
        self.origin_platforms.record(origin_platform);
        self.destination_platforms.record(destination_platform);
    }

    /// Fixes the default platforms from the tallies. Later calls are no-ops.
    pub fn resolve_defaults(&mut self) {
        if self.resolved {
            return;
        }
        self.origin_default = self.origin_platforms.most_used().cloned();
        self.destination_default = self.destination_platforms.most_used().cloned();
        self.resolved = true;
    }

    pub fn origin_default(&self) -> Option<&Arc<str>> {
        self.origin_default.as_ref()
    }

    pub fn destination_default(&self) -> Option<&Arc<str>> {
        self.destination_default.as_ref()
    }
}

/// One trip on one service day travelling along a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Offset from the start date of the window.
    pub day: u32,
    pub trip_idx: u32,
    /// Position of the origin visit within the trip's station sequence.
    pub from: u32,
    /// Position of the destination visit.
    pub to: u32,
    pub pattern: u32,
}

/// All patterns and occurrences leaving one origin station.
#[derive(Debug, Clone)]
pub struct PatternTable {
    pub origin_idx: u32,
    patterns: Vec<Pattern>,
    lookup: HashMap<PatternKey, u32>,
    occurrences: Vec<Occurrence>,
}

impl PatternTable {
    pub fn new(origin_idx: u32) -> Self {
        Self {
            origin_idx,
            patterns: Vec::new(),
            lookup: HashMap::new(),
            occurrences: Vec::new(),
        }
    }

    /// Returns the index for `key`, creating the pattern with the next free
    /// index when the key has not been seen at this origin.
    pub fn intern<F>(&mut self, key: PatternKey, create: F) -> u32
    where
        F: FnOnce(u32, PatternKey) -> Pattern,
    {
        if let Some(index) = self.lookup.get(&key) {
            return *index;
        }
        let index = self.patterns.len() as u32;
        self.lookup.insert(key.clone(), index);
        self.patterns.push(create(index, key));
        index
    }

    pub fn record(
        &mut self,
        occurrence: Occurrence,
        origin_platform: &Arc<str>,
        destination_platform: &Arc<str>,
    ) {
        self.patterns[occurrence.pattern as usize].record(origin_platform, destination_platform);
        self.occurrences.push(occurrence);
    }

    pub fn resolve_defaults(&mut self) {
        self.patterns
            .iter_mut()
            .for_each(|pattern| pattern.resolve_defaults());
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn pattern(&self, index: u32) -> Option<&Pattern> {
        self.patterns.get(index as usize)
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(index: u32, key: PatternKey) -> Pattern {
        Pattern::new(index, key, "F11".into(), "Express".into(), 1, Box::new([]))
    }

    #[test]
    fn adjacent_stations_have_a_plain_key() {
        let key = PatternKey::new("F11", "BOWEN_HILLS", "RIVERSIDE", []);
        assert_eq!(key.as_str(), "F11-BOWEN_HILLS-RIVERSIDE");
    }

    #[test]
    fn intermediate_order_matters() {
        let ab = PatternKey::new("F11", "O", "D", ["A", "B"]);
        let ba = PatternKey::new("F11", "O", "D", ["B", "A"]);
        let ab_again = PatternKey::new("F11", "O", "D", ["A", "B"]);
        assert_ne!(ab, ba);
        assert_eq!(ab, ab_again);
        assert!(ab.as_str().starts_with("F11-O-D-"));
        assert_eq!(ab.as_str().len(), "F11-O-D-".len() + 16);
    }

    #[test]
    fn joining_is_unambiguous() {
        let a = PatternKey::new("R", "O", "D", ["A_B", "C"]);
        let b = PatternKey::new("R", "O", "D", ["A", "B_C"]);
        assert_ne!(a, b);
    }

    #[test]
    fn interning_is_dense_and_stable() {
        let mut table = PatternTable::new(0);
        let first = table.intern(PatternKey::new("R", "O", "D", []), pattern);
        let second = table.intern(PatternKey::new("R", "O", "E", []), pattern);
        let again = table.intern(PatternKey::new("R", "O", "D", []), pattern);
        assert_eq!((first, second, again), (0, 1, 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn defaults_are_fixed_once() {
        let mut table = PatternTable::new(0);
        let index = table.intern(PatternKey::new("R", "O", "D", []), pattern);
        let (one, two): (Arc<str>, Arc<str>) = ("1".into(), "2".into());
        let occurrence = |day| Occurrence {
            day,
            trip_idx: 0,
            from: 0,
            to: 1,
            pattern: index,
        };
        table.record(occurrence(0), &two, &one);
        table.record(occurrence(1), &one, &one);
        table.record(occurrence(2), &one, &two);
        table.resolve_defaults();

        let pattern = table.pattern(index).unwrap();
        assert_eq!(pattern.trip_count, 3);
        assert_eq!(pattern.origin_default(), Some(&one));
        assert_eq!(pattern.destination_default(), Some(&one));
        assert_eq!(table.occurrences().len(), 3);
    }
}
