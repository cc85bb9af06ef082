const DROPPED_SUFFIXES: [&str; 2] = ["STATION", "TERMINAL"];

/// Turns a station display name into its stable identifier.
///
/// The name is upper-cased, split on every run of non-alphanumeric characters
/// and re-joined with `_`. A trailing "station" or "terminal" word is dropped
/// unless it is the only word.
pub fn slugify(name: &str) -> String {
    let upper = name.to_uppercase();
    let mut words: Vec<&str> = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    if words.len() > 1 && words.last().is_some_and(|last| DROPPED_SUFFIXES.contains(last)) {
        words.pop();
    }
    words.join("_")
}

#[test]
fn case_and_whitespace_insensitive() {
    assert_eq!(slugify("Bowen Hills"), "BOWEN_HILLS");
    assert_eq!(slugify("Bowen hills "), "BOWEN_HILLS");
    assert_eq!(slugify("  bowen   HILLS"), "BOWEN_HILLS");
}

#[test]
fn trailing_station_words_are_dropped() {
    assert_eq!(slugify("Roma Street station"), "ROMA_STREET");
    assert_eq!(slugify("Brisbane Airport Terminal"), "BRISBANE_AIRPORT");
    assert_eq!(slugify("Station Square"), "STATION_SQUARE");
    assert_eq!(slugify("Station"), "STATION");
}

#[test]
fn punctuation_collapses_to_one_separator() {
    assert_eq!(slugify("St. Lucia -- (UQ)"), "ST_LUCIA_UQ");
    assert_eq!(slugify("--"), "");
}
