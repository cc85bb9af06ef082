use stationboard::shared::time::{Time, minutes_to_clock};

#[test]
fn valid_time_test_1() {
    let time = "00:00:00";
    assert_eq!(Time::from_hms(time).unwrap().as_seconds(), 0);
}

#[test]
fn valid_time_test_2() {
    let time = "00:00:30";
    assert_eq!(Time::from_hms(time).unwrap().as_seconds(), 30);
}

#[test]
fn valid_time_test_3() {
    let time = "00:01:30";
    assert_eq!(Time::from_hms(time).unwrap().as_seconds(), 90);
}

#[test]
fn valid_time_test_4() {
    let time = "01:01:30";
    assert_eq!(Time::from_hms(time).unwrap().as_seconds(), 3690);
}

#[test]
fn single_digit_hours() {
    let time = "6:41:00";
    assert_eq!(Time::from_hms(time).unwrap().as_minutes(), 401);
}

#[test]
fn invalid_time_test_1() {
    let time = "00:00:0a";
    assert!(Time::from_hms(time).is_none())
}

#[test]
fn invalid_time_test_2() {
    let time = "00:00";
    assert!(Time::from_hms(time).is_none())
}

#[test]
fn invalid_time_test_3() {
    let time = "";
    assert!(Time::from_hms(time).is_none())
}

#[test]
fn minutes_round_trip_drops_seconds() {
    for (clock, minutes) in [("06:41:00", 401), ("06:41:59", 401), ("23:59:59", 1439)] {
        let time = Time::from_hms(clock).unwrap();
        assert_eq!(time.as_minutes(), minutes);
        assert_eq!(minutes_to_clock(minutes as i64), format!("{}:00", &clock[..5]));
    }
}

#[test]
fn negative_minutes_render_as_midnight() {
    assert_eq!(minutes_to_clock(-1), "00:00:00");
    assert_eq!(minutes_to_clock(i64::MIN), "00:00:00");
}
