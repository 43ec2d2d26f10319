// Telemetry assembly: turns a loaded session into the dataset the replay renders

pub mod qualifying;
pub mod race;
pub mod track_status;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionType};

pub use qualifying::{QualifyingResult, QualifyingTelemetry};
pub use race::{DriverFrame, Frame, RaceTelemetry};
pub use track_status::{TrackFlag, TrackStatusInterval};

pub const DEFAULT_FRAME_RATE: u32 = 25;

/// RGB display colour
pub type Color = [u8; 3];

/// Used for drivers whose team colour is unknown, assigned by car number order
const FALLBACK_PALETTE: [Color; 20] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [250, 190, 212],
    [0, 128, 128],
    [220, 190, 255],
    [170, 110, 40],
    [255, 250, 200],
    [128, 0, 0],
    [170, 255, 195],
    [128, 128, 0],
    [255, 215, 180],
    [0, 0, 128],
    [128, 128, 128],
];

#[derive(Clone, Debug)]
pub struct AssemblyOptions {
    /// Replay frames per second of session time
    pub frame_rate: u32,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Everything the replay needs besides the track layout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TelemetryBundle {
    Race(RaceTelemetry),
    Qualifying(QualifyingTelemetry),
}

impl TelemetryBundle {
    pub fn total_laps(&self) -> u32 {
        match self {
            TelemetryBundle::Race(race) => race.total_laps,
            TelemetryBundle::Qualifying(qualifying) => qualifying.total_laps,
        }
    }

    pub fn driver_colors(&self) -> &BTreeMap<String, Color> {
        match self {
            TelemetryBundle::Race(race) => &race.driver_colors,
            TelemetryBundle::Qualifying(qualifying) => &qualifying.driver_colors,
        }
    }
}

/// Build the replay dataset for a session.
///
/// Qualifying sessions produce a results table, races and sprints produce
/// animation frames. Drivers whose data can't be read are left out.
pub fn assemble(
    session: &Session,
    session_type: SessionType,
    options: &AssemblyOptions,
) -> TelemetryBundle {
    if session_type.is_qualifying() {
        TelemetryBundle::Qualifying(qualifying::assemble_qualifying(session))
    } else {
        TelemetryBundle::Race(race::assemble_race(session, options))
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Colour per driver code, fixed for the whole session
pub fn driver_colors(session: &Session) -> BTreeMap<String, Color> {
    session
        .drivers()
        .iter()
        .enumerate()
        .map(|(idx, driver)| {
            let color = driver
                .team_color
                .as_deref()
                .and_then(parse_hex_color)
                .unwrap_or(FALLBACK_PALETTE[idx % FALLBACK_PALETTE.len()]);
            (driver.code.clone(), color)
        })
        .collect()
}
