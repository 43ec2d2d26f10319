// DRS activation detection on lap telemetry

use serde::{Deserialize, Serialize};

use crate::session::telemetry::{DISTANCE_CHANNEL, DRS_CHANNEL, Telemetry};

/// DRS levels at or above this value mean the flap is open
pub const DRS_ACTIVATION_THRESHOLD: f64 = 10.;

/// Stretch of track where DRS was open on the reference lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrsZone {
    pub start_distance_m: f64,
    pub end_distance_m: f64,
}

fn is_active(level: Option<f64>) -> bool {
    level.is_some_and(|level| level >= DRS_ACTIVATION_THRESHOLD)
}

/// Whether the lap shows DRS activation anywhere.
///
/// Absent telemetry or a missing DRS channel count as no activation.
/// Samples that can't be read as a number are skipped.
pub fn has_activation(telemetry: Option<&Telemetry>) -> bool {
    let Some(values) = telemetry.and_then(|t| t.channel(DRS_CHANNEL)) else {
        return false;
    };
    values.iter().any(|value| is_active(value.as_f64()))
}

/// Contiguous DRS-open stretches of a lap, bounded by the Distance channel.
///
/// Samples without a readable distance are ignored, a zone still open on the
/// last sample closes there.
pub fn drs_zones(telemetry: &Telemetry) -> Vec<DrsZone> {
    let (Some(drs), Some(distance)) = (
        telemetry.numeric(DRS_CHANNEL),
        telemetry.numeric(DISTANCE_CHANNEL),
    ) else {
        return Vec::new();
    };

    let mut zones = Vec::new();
    let mut open: Option<(f64, f64)> = None;
    for (level, distance) in drs.into_iter().zip(distance) {
        let Some(distance) = distance else {
            continue;
        };
        match (open, is_active(level)) {
            (None, true) => open = Some((distance, distance)),
            (Some((start, _)), true) => open = Some((start, distance)),
            (Some((start, end)), false) => {
                zones.push(DrsZone {
                    start_distance_m: start,
                    end_distance_m: end,
                });
                open = None;
            }
            (None, false) => {}
        }
    }
    if let Some((start, end)) = open {
        zones.push(DrsZone {
            start_distance_m: start,
            end_distance_m: end,
        });
    }
    zones
}
