mod common;

use common::*;
use stationboard::{prelude::*, publish};
use std::{fs, path::PathBuf};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "stationboard-tests-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn artifacts() -> Artifacts {
    let feed = line().trip(
        "T1",
        "F11",
        "WK",
        &[("BH1", "06:41:00"), ("NF1", "06:43:00"), ("RS1", "06:44:00")],
    );
    compact(&feed, &line_roster(), &every_day(&["WK"])).artifacts
}

#[test]
fn published_files_decode_from_the_live_version() {
    let dir = scratch("live");
    let publisher = Publisher::new(&dir);
    let manifest = publisher.publish(&artifacts(), "v1").unwrap();
    assert_eq!(manifest.origins, vec!["BOWEN_HILLS", "NEW_FARM"]);
    assert_eq!(manifest.day_count, 7);

    assert!(dir.join("v1/schedules/BOWEN_HILLS.json").is_file());
    assert!(dir.join("v1/patterns/NEW_FARM.json").is_file());
    assert!(!dir.join("v1/schedules/RIVERSIDE.json").exists());

    let (schedule, patterns) = publisher.load_current_station("BOWEN_HILLS").unwrap();
    let departures = decode_departures(&schedule, &patterns, "RIVERSIDE", date(4)).unwrap();
    assert_eq!(departures[0].departure, "06:41:00");
    assert_eq!(publisher.manifest("v1").unwrap(), manifest);
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn failed_verification_writes_nothing() {
    let dir = scratch("verify");
    let publisher = Publisher::new(&dir);
    publisher.publish(&artifacts(), "good").unwrap();

    let mut broken = artifacts();
    broken.stations[0]
        .schedule
        .routes
        .get_mut("RIVERSIDE")
        .unwrap()
        .schedules[0][0]
        .p = 99;
    assert!(matches!(
        publisher.publish(&broken, "broken"),
        Err(publish::Error::Verify(_))
    ));
    assert!(!dir.join("broken").exists());
    assert!(!dir.join(".staging-broken").exists());
    assert_eq!(publisher.current().unwrap().unwrap().version, "good");
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn unknown_station_and_empty_store() {
    let dir = scratch("empty");
    let publisher = Publisher::new(&dir);
    assert!(matches!(
        publisher.load_current_station("BOWEN_HILLS"),
        Err(publish::Error::NothingPublished)
    ));
    assert!(publisher.versions().unwrap().is_empty());

    publisher.publish(&artifacts(), "v1").unwrap();
    assert!(matches!(
        publisher.load_current_station("RIVERSIDE"),
        Err(publish::Error::UnknownStation { .. })
    ));
    fs::remove_dir_all(dir).unwrap();
}
