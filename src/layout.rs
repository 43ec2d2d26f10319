// Track layout selection
//
// The fastest lap of the loaded session is tried first since its telemetry is
// already at hand. When it shows no DRS activation the fastest qualifying lap
// of the same event is tried instead, qualifying laps open DRS far more often.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::TracksideError;
use crate::session::telemetry::DISTANCE_CHANNEL;
use crate::session::{Lap, Session, SessionSource, SessionType, Telemetry};
use crate::signal::{self, DrsZone};
use crate::timing::{StageTimer, log_line};

/// Telemetry of the lap chosen to draw the circuit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackLayout {
    /// Driver who set the reference lap
    pub driver: String,
    pub driver_number: u32,
    pub lap_number: u32,
    /// Session the reference lap comes from
    pub session_type: SessionType,
    pub telemetry: Telemetry,
    /// DRS zones found on the reference lap, empty if it never opened DRS
    pub drs_zones: Vec<DrsZone>,
    /// Rotation to draw the circuit upright, from the primary session's circuit info
    pub rotation_deg: Option<f64>,
}

impl TrackLayout {
    fn from_lap(
        lap: &Lap,
        session_type: SessionType,
        telemetry: Telemetry,
        rotation_deg: Option<f64>,
    ) -> Self {
        let drs_zones = signal::drs_zones(&telemetry);
        Self {
            driver: lap.record.driver.clone(),
            driver_number: lap.record.driver_number,
            lap_number: lap.record.lap_number,
            session_type,
            telemetry,
            drs_zones,
            rotation_deg,
        }
    }

    /// Lap length according to the Distance channel
    pub fn circuit_length_m(&self) -> Option<f64> {
        self.telemetry.max_value(DISTANCE_CHANNEL)
    }
}

/// Why the qualifying fallback did not replace the primary lap
#[derive(Clone, Debug, PartialEq)]
pub enum FallbackOutcome {
    /// The qualifying session could not be loaded
    LoadFailed(String),
    NoLaps,
    NoFastestLap,
    TelemetryUnavailable(String),
    /// The qualifying lap has no DRS activation either
    NoActivation,
}

impl FallbackOutcome {
    fn into_error(self) -> TracksideError {
        let reason = match self {
            FallbackOutcome::LoadFailed(reason) => format!("could not load session: {}", reason),
            FallbackOutcome::NoLaps => "session has no laps".to_string(),
            FallbackOutcome::NoFastestLap => "session has no timed lap".to_string(),
            FallbackOutcome::TelemetryUnavailable(reason) => reason,
            FallbackOutcome::NoActivation => "fastest lap shows no DRS activation".to_string(),
        };
        TracksideError::FallbackUnavailable { reason }
    }
}

/// Which lap ended up defining the layout
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutDecision {
    /// Primary session's fastest lap, it shows DRS activation
    RaceLap,
    /// Fastest qualifying lap, the primary lap had no DRS activation
    QualifyingLap,
    /// Primary session's fastest lap without DRS activation, fallback failed
    RaceLapNoActivation(FallbackOutcome),
}

impl LayoutDecision {
    pub fn fallback_used(&self) -> bool {
        matches!(self, LayoutDecision::QualifyingLap)
    }
}

/// Fastest qualifying lap with activation, or why there is none
fn qualifying_candidate(
    primary: &Session,
    source: &impl SessionSource,
    rotation_deg: Option<f64>,
) -> Result<TrackLayout, FallbackOutcome> {
    let mut timer = StageTimer::start("Qualifying fallback attempt finished");
    let qualifying = source
        .load_session(primary.id.with_type(SessionType::Qualifying))
        .map_err(|e| {
            timer.abandon();
            FallbackOutcome::LoadFailed(e.to_string())
        })?;
    timer.finish("Loaded qualifying session for DRS zone extraction");

    if qualifying.laps().is_empty() {
        return Err(FallbackOutcome::NoLaps);
    }
    let fastest = qualifying
        .fastest_lap()
        .ok_or(FallbackOutcome::NoFastestLap)?;
    let telemetry = fastest
        .telemetry()
        .map_err(|e| FallbackOutcome::TelemetryUnavailable(e.to_string()))?;
    if !signal::has_activation(Some(telemetry)) {
        return Err(FallbackOutcome::NoActivation);
    }
    Ok(TrackLayout::from_lap(
        fastest,
        SessionType::Qualifying,
        telemetry.clone(),
        rotation_deg,
    ))
}

/// Decide which lap's telemetry defines the track layout.
///
/// Fails with [`TracksideError::NoLaps`] when the primary session has no timed
/// lap. Anything going wrong with the qualifying fallback is logged and the
/// primary lap is kept.
pub fn resolve_layout(
    primary: &Session,
    source: &impl SessionSource,
) -> Result<(TrackLayout, LayoutDecision), TracksideError> {
    let fastest = primary
        .fastest_lap()
        .ok_or(TracksideError::NoLaps { session: primary.id })?;
    let telemetry = fastest.telemetry()?;
    let rotation_deg = primary.circuit.rotation_deg;
    let primary_layout = TrackLayout::from_lap(
        fastest,
        primary.session_type(),
        telemetry.clone(),
        rotation_deg,
    );

    if signal::has_activation(Some(telemetry)) {
        log_line(&format!(
            "Using fastest {} lap from driver {} for track layout",
            primary.session_type().to_string().to_lowercase(),
            fastest.driver()
        ));
        return Ok((primary_layout, LayoutDecision::RaceLap));
    }

    log_line(&format!(
        "{} lap lacks clear DRS activation. Attempting qualifying session for DRS zones...",
        primary.session_type()
    ));
    match qualifying_candidate(primary, source, rotation_deg) {
        Ok(layout) => {
            log_line(&format!(
                "Using qualifying lap from driver {} for DRS zones",
                layout.driver
            ));
            Ok((layout, LayoutDecision::QualifyingLap))
        }
        Err(outcome) => {
            match &outcome {
                FallbackOutcome::NoActivation => {
                    info!("{}", outcome.clone().into_error())
                }
                _ => warn!("{}", outcome.clone().into_error()),
            }
            Ok((primary_layout, LayoutDecision::RaceLapNoActivation(outcome)))
        }
    }
}

/// Pick the layout lap and report whether the qualifying fallback was used
pub fn select_layout(
    primary: &Session,
    source: &impl SessionSource,
) -> Result<(TrackLayout, bool), TracksideError> {
    let (layout, decision) = resolve_layout(primary, source)?;
    Ok((layout, decision.fallback_used()))
}
