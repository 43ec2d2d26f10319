// Session data model: sessions, drivers, laps and their lazily loaded telemetry

pub mod archive;
pub mod source;
pub mod telemetry;

use std::{cell::OnceCell, fmt, path::PathBuf, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::TracksideError;

pub use archive::{FileSessionSource, RoundSummary, SourceCache};
pub use source::{InMemorySource, SessionSource};
pub use telemetry::{ChannelValue, Telemetry, TelemetryRow};

/// Category of on-track activity, decides which assembly branch applies
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum SessionType {
    Race,
    Qualifying,
    Sprint,
    SprintQualifying,
}

impl SessionType {
    /// Short code used by the data source and on the command line
    pub fn code(&self) -> &'static str {
        match self {
            SessionType::Race => "R",
            SessionType::Qualifying => "Q",
            SessionType::Sprint => "S",
            SessionType::SprintQualifying => "SQ",
        }
    }

    pub fn is_qualifying(&self) -> bool {
        matches!(self, SessionType::Qualifying | SessionType::SprintQualifying)
    }

    /// Suffix used for the replay window title
    pub fn title(&self) -> &'static str {
        match self {
            SessionType::Race => "Race",
            SessionType::Qualifying => "Qualifying Results",
            SessionType::Sprint => "Sprint",
            SessionType::SprintQualifying => "Sprint Qualifying",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Race => write!(f, "Race"),
            SessionType::Qualifying => write!(f, "Qualifying"),
            SessionType::Sprint => write!(f, "Sprint"),
            SessionType::SprintQualifying => write!(f, "Sprint Qualifying"),
        }
    }
}

impl FromStr for SessionType {
    type Err = TracksideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>();
        match normalized.as_str() {
            "r" | "race" => Ok(SessionType::Race),
            "q" | "qualifying" => Ok(SessionType::Qualifying),
            "s" | "sprint" => Ok(SessionType::Sprint),
            "sq" | "sprintqualifying" | "sprintshootout" => Ok(SessionType::SprintQualifying),
            _ => Err(TracksideError::InvalidUserInput {
                field: "session_type".to_string(),
                reason: format!("Unknown session type '{}', expected R, Q, S or SQ", s),
            }),
        }
    }
}

/// Identifies one session of a season
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId {
    pub year: u16,
    pub round: u8,
    pub session_type: SessionType,
}

impl SessionId {
    pub fn new(year: u16, round: u8, session_type: SessionType) -> Self {
        Self {
            year,
            round,
            session_type,
        }
    }

    /// Same event, different session
    pub fn with_type(&self, session_type: SessionType) -> Self {
        Self {
            session_type,
            ..*self
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Round {} Session '{}'",
            self.year,
            self.round,
            self.session_type.code()
        )
    }
}

/// Event descriptor as published by the data source
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EventInfo {
    /// Official event name (e.g. "British Grand Prix")
    pub name: String,
    /// Circuit location (e.g. "Silverstone")
    pub location: String,
    pub country: String,
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CircuitInfo {
    /// Rotation to apply to X/Y coordinates so the map renders upright
    pub rotation_deg: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DriverInfo {
    /// Three letter abbreviation (e.g. "VER")
    pub code: String,
    pub number: u32,
    pub team: Option<String>,
    /// Team colour as a hex string, with or without the leading '#'
    pub team_color: Option<String>,
}

/// Timing data for a single lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapRecord {
    pub driver: String,
    pub driver_number: u32,
    pub lap_number: u32,
    pub lap_time_ms: Option<u64>,
    /// Laps deleted by race control (e.g. track limits) never count as fastest
    #[serde(default)]
    pub deleted: bool,
}

/// Race control track status change
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackStatusChange {
    /// Session time of the change, seconds
    pub time_s: f64,
    /// Numeric status code as published ("1" green, "4" safety car, ...)
    pub status: String,
    pub message: Option<String>,
}

/// A lap of a session. Telemetry is materialized on first access and kept.
#[derive(Clone, Debug)]
pub struct Lap {
    pub record: LapRecord,
    telemetry_path: Option<PathBuf>,
    telemetry: OnceCell<Telemetry>,
}

impl Lap {
    /// Lap whose telemetry is loaded from a telemetry file when first needed
    pub fn from_file(record: LapRecord, telemetry_path: PathBuf) -> Self {
        Self {
            record,
            telemetry_path: Some(telemetry_path),
            telemetry: OnceCell::new(),
        }
    }

    /// Lap with telemetry already in memory
    pub fn with_telemetry(record: LapRecord, telemetry: Telemetry) -> Self {
        Self {
            record,
            telemetry_path: None,
            telemetry: OnceCell::from(telemetry),
        }
    }

    /// Lap without any telemetry, accessing it is an error
    pub fn without_telemetry(record: LapRecord) -> Self {
        Self {
            record,
            telemetry_path: None,
            telemetry: OnceCell::new(),
        }
    }

    pub fn driver(&self) -> &str {
        &self.record.driver
    }

    pub fn telemetry(&self) -> Result<&Telemetry, TracksideError> {
        if let Some(telemetry) = self.telemetry.get() {
            return Ok(telemetry);
        }
        let path = self
            .telemetry_path
            .as_ref()
            .ok_or_else(|| TracksideError::TelemetryUnavailable {
                driver: self.record.driver.clone(),
                lap_number: self.record.lap_number,
                reason: "no telemetry recorded for this lap".to_string(),
            })?;
        let loaded = archive::load_telemetry(path).map_err(|e| {
            TracksideError::TelemetryUnavailable {
                driver: self.record.driver.clone(),
                lap_number: self.record.lap_number,
                reason: e.to_string(),
            }
        })?;
        Ok(self.telemetry.get_or_init(|| loaded))
    }
}

/// A loaded session. Immutable once the data source hands it over.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub event: EventInfo,
    pub circuit: CircuitInfo,
    drivers: Vec<DriverInfo>,
    laps: Vec<Lap>,
    track_status: Vec<TrackStatusChange>,
}

impl Session {
    pub fn new(
        id: SessionId,
        event: EventInfo,
        circuit: CircuitInfo,
        mut drivers: Vec<DriverInfo>,
        mut laps: Vec<Lap>,
        mut track_status: Vec<TrackStatusChange>,
    ) -> Self {
        drivers.sort_by_key(|d| d.number);
        laps.sort_by_key(|l| (l.record.driver_number, l.record.lap_number));
        track_status.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        Self {
            id,
            event,
            circuit,
            drivers,
            laps,
            track_status,
        }
    }

    pub fn session_type(&self) -> SessionType {
        self.id.session_type
    }

    /// Participating drivers, ordered by car number
    pub fn drivers(&self) -> &[DriverInfo] {
        &self.drivers
    }

    /// All laps ordered by driver number then lap number
    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn driver_laps(&self, driver_number: u32) -> impl Iterator<Item = &Lap> {
        self.laps
            .iter()
            .filter(move |lap| lap.record.driver_number == driver_number)
    }

    pub fn track_status(&self) -> &[TrackStatusChange] {
        &self.track_status
    }

    /// The lap with the minimum lap time, ignoring untimed and deleted laps.
    ///
    /// Ties go to the lowest driver number, then the lowest lap number, so the
    /// pick never depends on the order the source listed the laps in.
    pub fn fastest_lap(&self) -> Option<&Lap> {
        self.laps
            .iter()
            .filter(|lap| !lap.record.deleted)
            .filter_map(|lap| lap.record.lap_time_ms.map(|time| (time, lap)))
            .min_by_key(|(time, lap)| (*time, lap.record.driver_number, lap.record.lap_number))
            .map(|(_, lap)| lap)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn session_with_laps(laps: Vec<Lap>) -> Session {
        Session::new(
            SessionId::new(2024, 5, SessionType::Race),
            EventInfo::default(),
            CircuitInfo::default(),
            vec![driver("VER", 1), driver("HAM", 44), driver("NOR", 4)],
            laps,
            Vec::new(),
        )
    }

    #[test]
    fn test_session_type_parsing() {
        assert_eq!("R".parse::<SessionType>().unwrap(), SessionType::Race);
        assert_eq!("sq".parse::<SessionType>().unwrap(), SessionType::SprintQualifying);
        assert_eq!(
            "Sprint Qualifying".parse::<SessionType>().unwrap(),
            SessionType::SprintQualifying
        );
        assert_eq!("qualifying".parse::<SessionType>().unwrap(), SessionType::Qualifying);
        assert!("FP1".parse::<SessionType>().is_err());
    }

    #[test]
    fn test_fastest_lap_picks_minimum_time() {
        let session = session_with_laps(vec![
            Lap::without_telemetry(lap_record("VER", 1, 10, Some(91_000))),
            Lap::without_telemetry(lap_record("HAM", 44, 12, Some(90_500))),
            Lap::without_telemetry(lap_record("NOR", 4, 3, None)),
        ]);
        let fastest = session.fastest_lap().unwrap();
        assert_eq!(fastest.driver(), "HAM");
        assert_eq!(fastest.record.lap_number, 12);
    }

    #[test]
    fn test_fastest_lap_tie_breaks_on_driver_number() {
        let session = session_with_laps(vec![
            Lap::without_telemetry(lap_record("HAM", 44, 7, Some(90_000))),
            Lap::without_telemetry(lap_record("NOR", 4, 9, Some(90_000))),
            Lap::without_telemetry(lap_record("NOR", 4, 8, Some(90_000))),
        ]);
        let fastest = session.fastest_lap().unwrap();
        assert_eq!(fastest.driver(), "NOR");
        assert_eq!(fastest.record.lap_number, 8);
    }

    #[test]
    fn test_fastest_lap_ignores_deleted_laps() {
        let mut deleted = lap_record("VER", 1, 4, Some(80_000));
        deleted.deleted = true;
        let session = session_with_laps(vec![
            Lap::without_telemetry(deleted),
            Lap::without_telemetry(lap_record("HAM", 44, 5, Some(90_000))),
        ]);
        assert_eq!(session.fastest_lap().unwrap().driver(), "HAM");
    }

    #[test]
    fn test_fastest_lap_none_without_laps() {
        let session = session_with_laps(Vec::new());
        assert!(session.fastest_lap().is_none());
    }

    #[test]
    fn test_lap_without_telemetry_errors() {
        let lap = Lap::without_telemetry(lap_record("VER", 1, 1, Some(90_000)));
        match lap.telemetry() {
            Err(TracksideError::TelemetryUnavailable { driver, lap_number, .. }) => {
                assert_eq!(driver, "VER");
                assert_eq!(lap_number, 1);
            }
            _ => panic!("Expected TelemetryUnavailable error"),
        }
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new(2025, 12, SessionType::Sprint);
        assert_eq!(id.to_string(), "2025 Round 12 Session 'S'");
        assert_eq!(id.with_type(SessionType::Qualifying).session_type, SessionType::Qualifying);
    }
}
