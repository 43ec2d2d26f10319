// File-backed session archive kept in the session cache directory
//
// Layout:
//   <cache>/<year>/<round:02>/<code>/session.jsonl
//   <cache>/<year>/<round:02>/<code>/telemetry/<driver number>_<lap>.jsonl

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::source::SessionSource;
use super::telemetry::{Telemetry, TelemetryRow};
use super::{
    CircuitInfo, DriverInfo, EventInfo, Lap, LapRecord, Session, SessionId, SessionType,
    TrackStatusChange,
};
use crate::TracksideError;

const SESSION_FILE_NAME: &str = "session.jsonl";
const TELEMETRY_DIR_NAME: &str = "telemetry";

/// One line of a `session.jsonl` file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SessionRecord {
    Event(EventInfo),
    Circuit(CircuitInfo),
    Driver(DriverInfo),
    Lap(LapRecord),
    TrackStatus(TrackStatusChange),
}

/// Proof that the session cache has been set up.
///
/// Created once before any session load and handed to the data source, so
/// nothing reads the archive before the directory exists.
#[derive(Clone, Debug)]
pub struct SourceCache {
    path: PathBuf,
}

impl SourceCache {
    /// Enable the cache at the given directory, creating it if needed
    pub fn enable(path: PathBuf) -> Result<Self, TracksideError> {
        if !path.exists() {
            fs::create_dir_all(&path).map_err(|e| TracksideError::ConfigIOError { source: e })?;
        }
        Ok(Self { path })
    }

    /// Enable the cache in the default user cache directory
    pub fn enable_default() -> Result<Self, TracksideError> {
        Self::enable(Self::default_cache_path()?)
    }

    pub fn default_cache_path() -> Result<PathBuf, TracksideError> {
        let cache_dir = dirs::cache_dir().ok_or(TracksideError::NoCacheDir)?;
        Ok(cache_dir.join("trackside"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A round available in the archive
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSummary {
    pub round: u8,
    pub event_name: String,
    pub country: String,
    pub has_sprint: bool,
}

/// Reads sessions from the archive kept in the cache directory
pub struct FileSessionSource {
    cache: SourceCache,
}

impl FileSessionSource {
    pub fn new(cache: SourceCache) -> Self {
        Self { cache }
    }

    fn round_dir(&self, year: u16, round: u8) -> PathBuf {
        self.cache
            .path()
            .join(year.to_string())
            .join(format!("{:02}", round))
    }

    /// Directory holding a single session's files
    pub fn session_dir(&self, id: SessionId) -> PathBuf {
        self.round_dir(id.year, id.round)
            .join(id.session_type.code())
    }

    /// Telemetry file for a driver's lap within a session directory
    pub fn telemetry_path(session_dir: &Path, driver_number: u32, lap_number: u32) -> PathBuf {
        session_dir
            .join(TELEMETRY_DIR_NAME)
            .join(format!("{}_{}.jsonl", driver_number, lap_number))
    }

    /// List the rounds of a season that have a race in the archive
    pub fn list_rounds(&self, year: u16) -> Result<Vec<RoundSummary>, TracksideError> {
        let year_dir = self.cache.path().join(year.to_string());
        if !year_dir.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&year_dir).map_err(|e| TracksideError::TelemetryLoaderError { source: e })?;

        let mut rounds = Vec::new();
        for entry in entries.flatten() {
            let Some(round) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u8>().ok())
            else {
                continue;
            };

            let race_id = SessionId::new(year, round, SessionType::Race);
            let race_file = self.session_dir(race_id).join(SESSION_FILE_NAME);
            if !race_file.exists() {
                debug!("Skipping round {} without race data", round);
                continue;
            }

            let event = match read_records(&race_file) {
                Ok(records) => records
                    .into_iter()
                    .find_map(|record| match record {
                        SessionRecord::Event(event) => Some(event),
                        _ => None,
                    })
                    .unwrap_or_default(),
                Err(e) => {
                    warn!("Could not read event for round {}: {}", round, e);
                    EventInfo::default()
                }
            };

            let sprint_file = self
                .session_dir(race_id.with_type(SessionType::Sprint))
                .join(SESSION_FILE_NAME);
            rounds.push(RoundSummary {
                round,
                event_name: event.name,
                country: event.country,
                has_sprint: sprint_file.exists(),
            });
        }

        Ok(rounds.into_iter().sorted_by_key(|r| r.round).collect())
    }
}

impl SessionSource for FileSessionSource {
    fn load_session(&self, id: SessionId) -> Result<Session, TracksideError> {
        let session_dir = self.session_dir(id);
        let session_file = session_dir.join(SESSION_FILE_NAME);
        if !session_file.exists() {
            return Err(TracksideError::SessionLoad {
                session: id,
                reason: format!("no data published at {:?}", session_file),
            });
        }

        let records = read_records(&session_file).map_err(|e| TracksideError::SessionLoad {
            session: id,
            reason: e.to_string(),
        })?;

        let mut event = None;
        let mut circuit = CircuitInfo::default();
        let mut drivers = Vec::new();
        let mut laps = Vec::new();
        let mut track_status = Vec::new();
        for record in records {
            match record {
                SessionRecord::Event(info) => event = Some(info),
                SessionRecord::Circuit(info) => circuit = info,
                SessionRecord::Driver(driver) => drivers.push(driver),
                SessionRecord::Lap(lap) => {
                    let path =
                        Self::telemetry_path(&session_dir, lap.driver_number, lap.lap_number);
                    laps.push(Lap::from_file(lap, path));
                }
                SessionRecord::TrackStatus(change) => track_status.push(change),
            }
        }

        let event = event.ok_or_else(|| TracksideError::SessionLoad {
            session: id,
            reason: "session file has no event record".to_string(),
        })?;

        debug!(
            "Read {} drivers and {} laps for {}",
            drivers.len(),
            laps.len(),
            id
        );
        Ok(Session::new(id, event, circuit, drivers, laps, track_status))
    }
}

fn read_records(path: &Path) -> Result<Vec<SessionRecord>, TracksideError> {
    serde_jsonlines::json_lines(path)
        .map_err(|e| TracksideError::TelemetryLoaderError { source: e })?
        .collect::<Result<Vec<SessionRecord>, std::io::Error>>()
        .map_err(|e| TracksideError::SourceFormatError {
            reason: format!("{:?}: {}", path, e),
        })
}

/// Read a lap telemetry file
pub(crate) fn load_telemetry(path: &Path) -> Result<Telemetry, TracksideError> {
    let rows = serde_jsonlines::json_lines(path)
        .map_err(|e| TracksideError::TelemetryLoaderError { source: e })?
        .collect::<Result<Vec<TelemetryRow>, std::io::Error>>()
        .map_err(|e| TracksideError::SourceFormatError {
            reason: format!("{:?}: {}", path, e),
        })?;
    Ok(Telemetry::from_rows(rows))
}
