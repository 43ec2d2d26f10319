use serde::{Deserialize, Serialize};

use crate::session::TrackStatusChange;

/// Race control flag state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TrackFlag {
    Green,
    Yellow,
    SafetyCar,
    Red,
    VirtualSafetyCar,
    VirtualSafetyCarEnding,
    Unknown(String),
}

impl From<&str> for TrackFlag {
    fn from(code: &str) -> Self {
        match code.trim() {
            "1" => TrackFlag::Green,
            "2" => TrackFlag::Yellow,
            "4" => TrackFlag::SafetyCar,
            "5" => TrackFlag::Red,
            "6" => TrackFlag::VirtualSafetyCar,
            "7" => TrackFlag::VirtualSafetyCarEnding,
            other => TrackFlag::Unknown(other.to_string()),
        }
    }
}

/// A flag state over a time range, in seconds from the first replay frame.
/// The last interval stays open.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackStatusInterval {
    pub flag: TrackFlag,
    pub start_time_s: f64,
    pub end_time_s: Option<f64>,
    pub message: Option<String>,
}

/// Turn status change points into ranges relative to `origin_s` (session time).
///
/// Ranges ending before the origin are dropped, a range spanning it is clipped.
pub fn track_status_timeline(
    changes: &[TrackStatusChange],
    origin_s: f64,
) -> Vec<TrackStatusInterval> {
    let mut timeline = Vec::with_capacity(changes.len());
    for (idx, change) in changes.iter().enumerate() {
        let end_time_s = changes.get(idx + 1).map(|next| next.time_s - origin_s);
        if end_time_s.is_some_and(|end| end <= 0.) {
            continue;
        }
        timeline.push(TrackStatusInterval {
            flag: TrackFlag::from(change.status.as_str()),
            start_time_s: (change.time_s - origin_s).max(0.),
            end_time_s,
            message: change.message.clone(),
        });
    }
    timeline
}
