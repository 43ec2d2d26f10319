use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{Color, driver_colors};
use crate::session::Session;

/// Classification line of a qualifying session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualifyingResult {
    pub position: u32,
    pub driver: String,
    pub driver_number: u32,
    pub team: Option<String>,
    /// Best valid lap, `None` if the driver never set a timed lap
    pub best_lap_ms: Option<u64>,
    pub gap_to_pole_ms: Option<u64>,
    pub laps_completed: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualifyingTelemetry {
    /// Results ordered by position
    pub results: Vec<QualifyingResult>,
    pub driver_colors: BTreeMap<String, Color>,
    pub total_laps: u32,
}

/// Build the results table of a qualifying or sprint qualifying session.
///
/// Drivers are ranked by their best non-deleted lap; drivers without one are
/// listed last by car number.
pub fn assemble_qualifying(session: &Session) -> QualifyingTelemetry {
    let ranked = session
        .drivers()
        .iter()
        .map(|driver| {
            let laps = session.driver_laps(driver.number).collect_vec();
            let best_lap_ms = laps
                .iter()
                .filter(|lap| !lap.record.deleted)
                .filter_map(|lap| lap.record.lap_time_ms)
                .min();
            (driver, best_lap_ms, laps.len() as u32)
        })
        .sorted_by_key(|(driver, best_lap_ms, _)| {
            (best_lap_ms.is_none(), best_lap_ms.unwrap_or(u64::MAX), driver.number)
        })
        .collect_vec();

    let pole_ms = ranked.first().and_then(|(_, best, _)| *best);
    let results = ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (driver, best_lap_ms, laps_completed))| QualifyingResult {
            position: idx as u32 + 1,
            driver: driver.code.clone(),
            driver_number: driver.number,
            team: driver.team.clone(),
            best_lap_ms,
            gap_to_pole_ms: best_lap_ms.zip(pole_ms).map(|(best, pole)| best - pole),
            laps_completed,
        })
        .collect();

    QualifyingTelemetry {
        results,
        driver_colors: driver_colors(session),
        total_laps: session
            .laps()
            .iter()
            .map(|lap| lap.record.lap_number)
            .max()
            .unwrap_or(0),
    }
}
