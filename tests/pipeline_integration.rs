// Integration tests for the replay preparation pipeline
//
// Sessions are served from memory so each scenario controls exactly which
// laps exist, what their DRS channel contains and which loads fail.

use trackside::session::telemetry::{DISTANCE_CHANNEL, DRS_CHANNEL, X_CHANNEL, Y_CHANNEL};
use trackside::session::{
    CircuitInfo, DriverInfo, EventInfo, InMemorySource, Lap, LapRecord, Session, SessionId,
    SessionType, Telemetry,
};
use trackside::{Pipeline, TelemetryBundle, TracksideError};

const YEAR: u16 = 2024;
const ROUND: u8 = 8;

fn driver(code: &str, number: u32) -> DriverInfo {
    DriverInfo {
        code: code.to_string(),
        number,
        team: None,
        team_color: None,
    }
}

/// A lap sampled once a second with position, distance and the given DRS levels
fn lap(code: &str, number: u32, lap_number: u32, lap_time_ms: u64, drs: &[i32]) -> Lap {
    let start_s = 1000. + (lap_number - 1) as f64 * drs.len() as f64;
    let times: Vec<f64> = (0..drs.len()).map(|i| start_s + i as f64).collect();
    let distance: Vec<f64> = (0..drs.len()).map(|i| i as f64 * 250.).collect();
    let telemetry = Telemetry::new(times)
        .with_channel(X_CHANNEL, distance.clone())
        .unwrap()
        .with_channel(Y_CHANNEL, vec![0.; drs.len()])
        .unwrap()
        .with_channel(DISTANCE_CHANNEL, distance)
        .unwrap()
        .with_channel(DRS_CHANNEL, drs.iter().copied())
        .unwrap();
    Lap::with_telemetry(
        LapRecord {
            driver: code.to_string(),
            driver_number: number,
            lap_number,
            lap_time_ms: Some(lap_time_ms),
            deleted: false,
        },
        telemetry,
    )
}

fn session(session_type: SessionType, laps: Vec<Lap>) -> Session {
    Session::new(
        SessionId::new(YEAR, ROUND, session_type),
        EventInfo {
            name: "Monaco Grand Prix".to_string(),
            location: "Monaco".to_string(),
            country: "Monaco".to_string(),
            date: None,
        },
        CircuitInfo::default(),
        vec![driver("VER", 1), driver("LEC", 16), driver("NOR", 4)],
        laps,
        Vec::new(),
    )
}

fn qualifying_id() -> SessionId {
    SessionId::new(YEAR, ROUND, SessionType::Qualifying)
}

#[test]
fn test_race_lap_with_drs_needs_no_second_load() {
    let race = session(
        SessionType::Race,
        vec![
            lap("VER", 1, 1, 75_000, &[0, 0, 15, 0]),
            lap("LEC", 16, 1, 76_000, &[0, 0, 0, 0]),
            lap("NOR", 4, 1, 77_000, &[0, 0, 0, 0]),
        ],
    );
    let source = InMemorySource::new().with_session(race);

    let prepared = Pipeline::new(&source)
        .run(YEAR, ROUND, SessionType::Race)
        .unwrap();

    let layout = prepared.layout.expect("race runs resolve a layout");
    assert_eq!(layout.driver, "VER");
    assert_eq!(layout.session_type, SessionType::Race);
    assert!(!prepared.fallback_used);
    assert_eq!(
        source.loads(),
        vec![SessionId::new(YEAR, ROUND, SessionType::Race)]
    );
}

#[test]
fn test_qualifying_below_threshold_keeps_race_lap() {
    let race = session(
        SessionType::Race,
        vec![
            lap("VER", 1, 1, 75_000, &[0, 0, 0, 0]),
            lap("LEC", 16, 1, 76_000, &[0, 0, 0, 0]),
        ],
    );
    let quali = session(
        SessionType::Qualifying,
        vec![lap("LEC", 16, 1, 70_000, &[0, 9, 0])],
    );
    let source = InMemorySource::new().with_session(race).with_session(quali);

    let prepared = Pipeline::new(&source)
        .run(YEAR, ROUND, SessionType::Race)
        .unwrap();

    let layout = prepared.layout.unwrap();
    assert_eq!(layout.driver, "VER");
    assert_eq!(layout.session_type, SessionType::Race);
    assert!(layout.drs_zones.is_empty());
    assert!(!prepared.fallback_used);
    assert!(source.loads().contains(&qualifying_id()));
}

#[test]
fn test_qualifying_lap_with_drs_is_used_for_layout() {
    let race = session(
        SessionType::Sprint,
        vec![lap("VER", 1, 1, 75_000, &[0, 0, 0, 0])],
    );
    let quali = session(
        SessionType::Qualifying,
        vec![
            lap("NOR", 4, 1, 70_500, &[0, 0, 0]),
            lap("LEC", 16, 1, 70_000, &[0, 12, 12]),
        ],
    );
    let source = InMemorySource::new().with_session(race).with_session(quali);

    let prepared = Pipeline::new(&source)
        .run(YEAR, ROUND, SessionType::Sprint)
        .unwrap();

    let layout = prepared.layout.unwrap();
    assert_eq!(layout.driver, "LEC");
    assert_eq!(layout.session_type, SessionType::Qualifying);
    assert_eq!(layout.drs_zones.len(), 1);
    assert!(prepared.fallback_used);
    assert_eq!(prepared.info.circuit_length_m, Some(500.));
}

#[test]
fn test_qualifying_source_failure_does_not_abort() {
    let race = session(
        SessionType::Race,
        vec![lap("VER", 1, 1, 75_000, &[0, 0, 0, 0])],
    );
    let source = InMemorySource::new()
        .with_session(race)
        .failing_on(qualifying_id());

    let prepared = Pipeline::new(&source)
        .run(YEAR, ROUND, SessionType::Race)
        .unwrap();

    assert_eq!(prepared.layout.unwrap().driver, "VER");
    assert!(!prepared.fallback_used);
}

#[test]
fn test_session_without_laps_is_fatal() {
    let race = session(SessionType::Race, Vec::new());
    let source = InMemorySource::new().with_session(race);

    let result = Pipeline::new(&source).run(YEAR, ROUND, SessionType::Race);
    match result {
        Err(TracksideError::NoLaps { session }) => {
            assert_eq!(session.session_type, SessionType::Race)
        }
        other => panic!("Expected NoLaps error, got {:?}", other.map(|p| p.info)),
    }
    assert_eq!(source.loads().len(), 1);
}

#[test]
fn test_race_bundle_covers_every_driver() {
    let race = session(
        SessionType::Race,
        vec![
            lap("VER", 1, 1, 75_000, &[0, 0, 15, 0]),
            lap("VER", 1, 2, 74_000, &[0, 0, 15, 0]),
            lap("LEC", 16, 1, 76_000, &[0, 0, 0, 0]),
            lap("NOR", 4, 1, 77_000, &[0, 0, 0, 0]),
        ],
    );
    let source = InMemorySource::new().with_session(race);

    let prepared = Pipeline::new(&source)
        .run(YEAR, ROUND, SessionType::Race)
        .unwrap();

    let TelemetryBundle::Race(race) = prepared.bundle else {
        panic!("Expected race telemetry");
    };
    assert_eq!(race.total_laps, 2);
    assert_eq!(prepared.info.total_laps, 2);
    assert!(race.omitted_drivers.is_empty());
    assert_eq!(race.driver_colors.len(), 3);
    assert_eq!(race.frames[0].drivers.len(), 3);
    assert!(
        race.frames
            .windows(2)
            .all(|pair| pair[0].time_s < pair[1].time_s)
    );
}
