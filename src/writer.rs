// Replay hand-off file: one header line, then one line per frame or result

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::TracksideError;
use crate::assembler::{
    Color, Frame, QualifyingResult, QualifyingTelemetry, RaceTelemetry, TelemetryBundle,
    TrackStatusInterval,
};
use crate::layout::TrackLayout;
use crate::pipeline::{PreparedSession, SessionInfo};
use crate::session::SessionType;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReplayHeader {
    pub session_type: SessionType,
    pub info: SessionInfo,
    pub layout: Option<TrackLayout>,
    pub fallback_used: bool,
    pub track_statuses: Vec<TrackStatusInterval>,
    pub driver_colors: BTreeMap<String, Color>,
    pub total_laps: u32,
    pub start_session_time_s: f64,
    pub omitted_drivers: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ReplayOutput {
    Header(Box<ReplayHeader>),
    Frame(Frame),
    QualifyingResult(QualifyingResult),
}

/// A replay file read back into memory
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayFile {
    pub info: SessionInfo,
    pub layout: Option<TrackLayout>,
    pub fallback_used: bool,
    pub bundle: TelemetryBundle,
}

fn header(prepared: &PreparedSession) -> ReplayHeader {
    let (track_statuses, start_session_time_s, omitted_drivers) = match &prepared.bundle {
        TelemetryBundle::Race(race) => (
            race.track_statuses.clone(),
            race.start_session_time_s,
            race.omitted_drivers.clone(),
        ),
        TelemetryBundle::Qualifying(_) => (Vec::new(), 0., Vec::new()),
    };
    ReplayHeader {
        session_type: prepared.session_type,
        info: prepared.info.clone(),
        layout: prepared.layout.clone(),
        fallback_used: prepared.fallback_used,
        track_statuses,
        driver_colors: prepared.bundle.driver_colors().clone(),
        total_laps: prepared.bundle.total_laps(),
        start_session_time_s,
        omitted_drivers,
    }
}

fn write_line(writer: &mut impl Write, line: &ReplayOutput) -> Result<(), TracksideError> {
    let json = serde_json::to_string(line).map_err(|e| TracksideError::WriterError {
        source: std::io::Error::other(e),
    })?;
    writeln!(writer, "{}", json).map_err(|e| TracksideError::WriterError { source: e })
}

/// Write a prepared session for the replay renderer
pub fn write_replay(file: &Path, prepared: &PreparedSession) -> Result<(), TracksideError> {
    let replay_file = File::create(file).map_err(|e| TracksideError::WriterError { source: e })?;
    let mut replay_writer = BufWriter::new(replay_file);

    write_line(
        &mut replay_writer,
        &ReplayOutput::Header(Box::new(header(prepared))),
    )?;
    match &prepared.bundle {
        TelemetryBundle::Race(race) => {
            for frame in &race.frames {
                write_line(&mut replay_writer, &ReplayOutput::Frame(frame.clone()))?;
            }
        }
        TelemetryBundle::Qualifying(qualifying) => {
            for result in &qualifying.results {
                write_line(
                    &mut replay_writer,
                    &ReplayOutput::QualifyingResult(result.clone()),
                )?;
            }
        }
    }

    replay_writer
        .flush()
        .map_err(|e| TracksideError::WriterError { source: e })?;
    info!("Replay written to {:?}", file);
    Ok(())
}

/// Read a replay file written by [`write_replay`]
pub fn load_replay(source_file: &Path) -> Result<ReplayFile, TracksideError> {
    let invalid = || TracksideError::InvalidReplayFile {
        path: format!("{:?}", source_file),
    };

    let mut lines = serde_jsonlines::json_lines::<ReplayOutput, _>(source_file)
        .map_err(|e| TracksideError::TelemetryLoaderError { source: e })?;

    let header = match lines.next() {
        Some(Ok(ReplayOutput::Header(header))) => *header,
        _ => return Err(invalid()),
    };

    let mut frames = Vec::new();
    let mut results = Vec::new();
    for line in lines {
        match line.map_err(|e| TracksideError::TelemetryLoaderError { source: e })? {
            ReplayOutput::Frame(frame) => {
                if frames
                    .last()
                    .is_some_and(|last: &Frame| last.time_s >= frame.time_s)
                {
                    return Err(invalid());
                }
                frames.push(frame);
            }
            ReplayOutput::QualifyingResult(result) => results.push(result),
            ReplayOutput::Header(_) => return Err(invalid()),
        }
    }

    let bundle = if header.session_type.is_qualifying() {
        if !frames.is_empty() {
            return Err(invalid());
        }
        TelemetryBundle::Qualifying(QualifyingTelemetry {
            results,
            driver_colors: header.driver_colors,
            total_laps: header.total_laps,
        })
    } else {
        if !results.is_empty() {
            return Err(invalid());
        }
        TelemetryBundle::Race(RaceTelemetry {
            frames,
            track_statuses: header.track_statuses,
            driver_colors: header.driver_colors,
            total_laps: header.total_laps,
            start_session_time_s: header.start_session_time_s,
            omitted_drivers: header.omitted_drivers,
        })
    };

    Ok(ReplayFile {
        info: header.info,
        layout: header.layout,
        fallback_used: header.fallback_used,
        bundle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{DriverFrame, TrackFlag};
    use crate::pipeline::PipelineStage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame(index: usize, time_s: f64) -> Frame {
        Frame {
            index,
            time_s,
            leader_lap: 1,
            drivers: vec![DriverFrame {
                driver: "VER".to_string(),
                driver_number: 1,
                position: 1,
                x: 10.,
                y: -4.5,
                race_distance_m: 120.,
                lap: 1,
                speed_kph: Some(280.),
                gear: Some(7),
                drs: None,
            }],
        }
    }

    fn race_session() -> PreparedSession {
        PreparedSession {
            session_type: SessionType::Race,
            bundle: TelemetryBundle::Race(RaceTelemetry {
                frames: vec![frame(0, 0.), frame(1, 0.5)],
                track_statuses: vec![TrackStatusInterval {
                    flag: TrackFlag::SafetyCar,
                    start_time_s: 0.,
                    end_time_s: None,
                    message: None,
                }],
                driver_colors: BTreeMap::from([("VER".to_string(), [54, 113, 198])]),
                total_laps: 57,
                start_session_time_s: 3600.,
                omitted_drivers: vec!["SAR".to_string()],
            }),
            info: SessionInfo {
                event_name: "Bahrain Grand Prix".to_string(),
                total_laps: 57,
                ..Default::default()
            },
            layout: None,
            fallback_used: false,
            stages: vec![PipelineStage::Ready],
        }
    }

    #[test]
    fn test_written_replay_loads_back() {
        let file = NamedTempFile::new().unwrap();
        let prepared = race_session();
        write_replay(file.path(), &prepared).unwrap();

        let replay = load_replay(file.path()).unwrap();
        assert_eq!(replay.bundle, prepared.bundle);
        assert_eq!(replay.info, prepared.info);
        assert!(replay.layout.is_none());
    }

    #[test]
    fn test_file_without_header_is_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{}",
            serde_json::to_string(&ReplayOutput::Frame(frame(0, 0.))).unwrap()
        )
        .unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_replay(file.path()),
            Err(TracksideError::InvalidReplayFile { .. })
        ));
    }

    #[test]
    fn test_frames_out_of_order_are_invalid() {
        let file = NamedTempFile::new().unwrap();
        let mut prepared = race_session();
        if let TelemetryBundle::Race(race) = &mut prepared.bundle {
            race.frames.reverse();
        }
        write_replay(file.path(), &prepared).unwrap();

        assert!(matches!(
            load_replay(file.path()),
            Err(TracksideError::InvalidReplayFile { .. })
        ));
    }
}
