// Race and sprint replay frames
//
// Each driver's laps are stitched into one track of samples keyed by session
// time, with distance accumulated over the race. The tracks are then resampled
// on a shared clock so every frame holds all drivers at the same instant.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::track_status::{TrackStatusInterval, track_status_timeline};
use super::{AssemblyOptions, Color, driver_colors};
use crate::TracksideError;
use crate::session::telemetry::{
    DISTANCE_CHANNEL, DRS_CHANNEL, GEAR_CHANNEL, SPEED_CHANNEL, Telemetry, X_CHANNEL, Y_CHANNEL,
};
use crate::session::{DriverInfo, Session};

/// Longest stretch of session time a replay can cover, seconds
pub const MAX_SESSION_SPAN_S: f64 = 6. * 3600.;
/// Highest frame rate honoured, higher requests are clamped
pub const MAX_FRAME_RATE: u32 = 100;

/// State of one driver in a frame
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DriverFrame {
    pub driver: String,
    pub driver_number: u32,
    /// Race position, 1 is the leader
    pub position: u32,
    pub x: f64,
    pub y: f64,
    /// Distance covered since the start of the session, meters
    pub race_distance_m: f64,
    pub lap: u32,
    pub speed_kph: Option<f64>,
    pub gear: Option<u32>,
    pub drs: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub index: usize,
    /// Seconds since the first frame
    pub time_s: f64,
    pub leader_lap: u32,
    /// Drivers still running at this instant, in race order
    pub drivers: Vec<DriverFrame>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RaceTelemetry {
    /// Frames in ascending time order
    pub frames: Vec<Frame>,
    pub track_statuses: Vec<TrackStatusInterval>,
    pub driver_colors: BTreeMap<String, Color>,
    /// Highest lap number reached by a driver present in the frames
    pub total_laps: u32,
    /// Session time of the first frame, seconds
    pub start_session_time_s: f64,
    /// Drivers left out because their data could not be read
    pub omitted_drivers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TrackSample {
    time_s: f64,
    x: f64,
    y: f64,
    race_distance_m: f64,
    lap: u32,
    speed_kph: Option<f64>,
    gear: Option<u32>,
    drs: Option<f64>,
}

#[derive(Clone, Debug)]
struct DriverTrack {
    driver: String,
    driver_number: u32,
    max_lap: u32,
    samples: Vec<TrackSample>,
}

fn required_channel(
    telemetry: &Telemetry,
    name: &str,
) -> Result<Vec<Option<f64>>, String> {
    telemetry
        .numeric(name)
        .ok_or_else(|| format!("telemetry has no {} channel", name))
}

fn driver_track(session: &Session, driver: &DriverInfo) -> Result<DriverTrack, TracksideError> {
    let unavailable = |reason: String| TracksideError::DriverDataUnavailable {
        driver: driver.code.clone(),
        reason,
    };

    let mut samples: Vec<TrackSample> = Vec::new();
    let mut max_lap = 0;
    let mut distance_offset = 0.;
    for lap in session.driver_laps(driver.number) {
        let telemetry = lap.telemetry().map_err(|e| unavailable(e.to_string()))?;
        let x = required_channel(telemetry, X_CHANNEL).map_err(unavailable)?;
        let y = required_channel(telemetry, Y_CHANNEL).map_err(unavailable)?;
        let distance = required_channel(telemetry, DISTANCE_CHANNEL).map_err(unavailable)?;
        let speed = telemetry.numeric(SPEED_CHANNEL);
        let gear = telemetry.numeric(GEAR_CHANNEL);
        let drs = telemetry.numeric(DRS_CHANNEL);

        let mut lap_distance = 0f64;
        for (idx, &time_s) in telemetry.times().iter().enumerate() {
            let (Some(x), Some(y), Some(distance)) = (x[idx], y[idx], distance[idx]) else {
                continue;
            };
            if !time_s.is_finite() || samples.last().is_some_and(|last| last.time_s >= time_s) {
                continue;
            }
            lap_distance = lap_distance.max(distance);
            samples.push(TrackSample {
                time_s,
                x,
                y,
                race_distance_m: distance_offset + distance,
                lap: lap.record.lap_number,
                speed_kph: speed.as_ref().and_then(|s| s[idx]),
                gear: gear
                    .as_ref()
                    .and_then(|g| g[idx])
                    .filter(|g| *g >= 0.)
                    .map(|g| g as u32),
                drs: drs.as_ref().and_then(|d| d[idx]),
            });
        }
        distance_offset += lap_distance;
        max_lap = max_lap.max(lap.record.lap_number);
    }

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Err(unavailable("no usable position samples".to_string()));
    };
    if last.time_s - first.time_s > MAX_SESSION_SPAN_S {
        return Err(unavailable(format!(
            "telemetry spans {:.0}s of session time",
            last.time_s - first.time_s
        )));
    }
    Ok(DriverTrack {
        driver: driver.code.clone(),
        driver_number: driver.number,
        max_lap,
        samples,
    })
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Driver state at session time `time_s`, `None` once the driver's data has ended
fn sample_at(track: &DriverTrack, time_s: f64) -> Option<TrackSample> {
    let first = track.samples.first()?;
    let last = track.samples.last()?;
    if time_s > last.time_s {
        return None;
    }
    if time_s <= first.time_s {
        return Some(*first);
    }

    let next_idx = track.samples.partition_point(|s| s.time_s <= time_s);
    if next_idx >= track.samples.len() {
        return Some(*last);
    }
    let prev = track.samples[next_idx - 1];
    let next = track.samples[next_idx];
    let t = (time_s - prev.time_s) / (next.time_s - prev.time_s);
    Some(TrackSample {
        time_s,
        x: lerp(prev.x, next.x, t),
        y: lerp(prev.y, next.y, t),
        race_distance_m: lerp(prev.race_distance_m, next.race_distance_m, t),
        speed_kph: match (prev.speed_kph, next.speed_kph) {
            (Some(a), Some(b)) => Some(lerp(a, b, t)),
            (a, _) => a,
        },
        ..prev
    })
}

/// Tracks inside the session window around the median start time, then those outside it
fn split_session_window(tracks: Vec<DriverTrack>) -> (Vec<DriverTrack>, Vec<DriverTrack>) {
    let mut starts: Vec<f64> = tracks.iter().map(|t| t.samples[0].time_s).collect();
    starts.sort_by(f64::total_cmp);
    let Some(&anchor_s) = starts.get(starts.len() / 2) else {
        return (tracks, Vec::new());
    };
    tracks.into_iter().partition(|track| {
        let first = track.samples[0].time_s;
        let last = track.samples[track.samples.len() - 1].time_s;
        first >= anchor_s - MAX_SESSION_SPAN_S && last <= anchor_s + MAX_SESSION_SPAN_S
    })
}

fn build_frames(tracks: &[DriverTrack], start_s: f64, end_s: f64, frame_rate: u32) -> Vec<Frame> {
    let frame_rate = frame_rate.clamp(1, MAX_FRAME_RATE) as f64;
    let steps = ((end_s - start_s) * frame_rate).floor();
    if !steps.is_finite() || steps < 0. || steps > MAX_SESSION_SPAN_S * 2. * frame_rate {
        warn!("Refusing to build frames over {:.0}s of session time", end_s - start_s);
        return Vec::new();
    }
    let frame_count = steps as usize + 1;

    let mut frames = Vec::with_capacity(frame_count);
    for index in 0..frame_count {
        let time_s = index as f64 / frame_rate;
        let mut active: Vec<(&DriverTrack, TrackSample)> = tracks
            .iter()
            .filter_map(|track| sample_at(track, start_s + time_s).map(|s| (track, s)))
            .collect();
        active.sort_by(|(a_track, a), (b_track, b)| {
            b.race_distance_m
                .total_cmp(&a.race_distance_m)
                .then(a_track.driver_number.cmp(&b_track.driver_number))
        });

        let drivers: Vec<DriverFrame> = active
            .into_iter()
            .enumerate()
            .map(|(idx, (track, sample))| DriverFrame {
                driver: track.driver.clone(),
                driver_number: track.driver_number,
                position: idx as u32 + 1,
                x: sample.x,
                y: sample.y,
                race_distance_m: sample.race_distance_m,
                lap: sample.lap,
                speed_kph: sample.speed_kph,
                gear: sample.gear,
                drs: sample.drs,
            })
            .collect();
        frames.push(Frame {
            index,
            time_s,
            leader_lap: drivers.first().map(|d| d.lap).unwrap_or(0),
            drivers,
        });
    }
    frames
}

/// Build replay frames for a race or sprint session
pub fn assemble_race(session: &Session, options: &AssemblyOptions) -> RaceTelemetry {
    let mut tracks = Vec::new();
    let mut omitted_drivers = Vec::new();
    for driver in session.drivers() {
        match driver_track(session, driver) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                warn!("Omitting driver from replay: {}", e);
                omitted_drivers.push(driver.code.clone());
            }
        }
    }
    let (tracks, outliers) = split_session_window(tracks);
    for track in outliers {
        warn!(
            "Omitting driver from replay: {} telemetry lies outside the session window",
            track.driver
        );
        omitted_drivers.push(track.driver);
    }

    let start_s = tracks
        .iter()
        .map(|t| t.samples[0].time_s)
        .min_by(f64::total_cmp);
    let end_s = tracks
        .iter()
        .filter_map(|t| t.samples.last().map(|s| s.time_s))
        .max_by(f64::total_cmp);

    let (frames, start_session_time_s) = match (start_s, end_s) {
        (Some(start_s), Some(end_s)) => (
            build_frames(&tracks, start_s, end_s, options.frame_rate),
            start_s,
        ),
        _ => (Vec::new(), 0.),
    };
    debug!(
        "Assembled {} frames for {} drivers ({} omitted)",
        frames.len(),
        tracks.len(),
        omitted_drivers.len()
    );

    RaceTelemetry {
        frames,
        track_statuses: track_status_timeline(session.track_status(), start_session_time_s),
        driver_colors: driver_colors(session),
        total_laps: tracks.iter().map(|t| t.max_lap).max().unwrap_or(0),
        start_session_time_s,
        omitted_drivers,
    }
}
