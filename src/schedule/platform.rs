use std::sync::Arc;

/// How often each platform was used, in the order platforms were first seen.
#[derive(Debug, Default, Clone)]
pub struct PlatformTally {
    counts: Vec<(Arc<str>, u32)>,
}

impl PlatformTally {
    pub fn record(&mut self, platform: &Arc<str>) {
        match self.counts.iter_mut().find(|(seen, _)| seen == platform) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((platform.clone(), 1)),
        }
    }

    pub fn count(&self, platform: &str) -> u32 {
        self.counts
            .iter()
            .find(|(seen, _)| &**seen == platform)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// The platform with the highest count. On a tie the platform seen first wins.
    pub fn most_used(&self) -> Option<&Arc<str>> {
        let mut best: Option<&(Arc<str>, u32)> = None;
        for entry in self.counts.iter() {
            if best.is_none_or(|(_, count)| entry.1 > *count) {
                best = Some(entry);
            }
        }
        best.map(|(platform, _)| platform)
    }
}

/// The explicit platform a trip has to carry, `None` when it uses the default.
pub fn platform_override(actual: &Arc<str>, default: Option<&Arc<str>>) -> Option<Arc<str>> {
    match default {
        Some(default) if default == actual => None,
        _ => Some(actual.clone()),
    }
}

#[test]
fn most_used_wins() {
    let mut tally = PlatformTally::default();
    let (one, two): (Arc<str>, Arc<str>) = ("1".into(), "2".into());
    tally.record(&one);
    tally.record(&two);
    tally.record(&two);
    assert_eq!(tally.most_used(), Some(&two));
    assert_eq!(tally.count("2"), 2);
    assert_eq!(tally.count("9"), 0);
}

#[test]
fn ties_go_to_the_first_seen_platform() {
    let mut tally = PlatformTally::default();
    let (one, two): (Arc<str>, Arc<str>) = ("1".into(), "2".into());
    tally.record(&two);
    tally.record(&one);
    tally.record(&one);
    tally.record(&two);
    assert_eq!(tally.most_used(), Some(&two));
}

#[test]
fn empty_tally_has_no_default() {
    assert!(PlatformTally::default().most_used().is_none());
}

#[test]
fn overrides_only_when_different() {
    let (one, two): (Arc<str>, Arc<str>) = ("1".into(), "2".into());
    assert_eq!(platform_override(&one, Some(&one)), None);
    assert_eq!(platform_override(&two, Some(&one)), Some(two.clone()));
    assert_eq!(platform_override(&two, None), Some(two));
}
