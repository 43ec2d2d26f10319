// Pipeline orchestration: load, resolve layout, assemble, hand off

use std::time::Instant;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::TracksideError;
use crate::assembler::{self, AssemblyOptions, TelemetryBundle};
use crate::layout::{self, TrackLayout};
use crate::session::{Session, SessionId, SessionSource, SessionType};
use crate::timing::{StageTimer, elapsed_line, log_line, stage_line};

/// Flat summary shown in the replay banner
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub event_name: String,
    pub circuit_name: String,
    pub country: String,
    pub year: u16,
    pub round: u8,
    /// Event date as "Month DD, YYYY", empty when unknown
    pub date: String,
    pub total_laps: u32,
    pub circuit_length_m: Option<f64>,
    /// Replay window title, e.g. "British Grand Prix - Race"
    pub title: String,
}

impl SessionInfo {
    pub fn new(session: &Session, bundle: &TelemetryBundle, layout: Option<&TrackLayout>) -> Self {
        Self {
            event_name: session.event.name.clone(),
            circuit_name: session.event.location.clone(),
            country: session.event.country.clone(),
            year: session.id.year,
            round: session.id.round,
            date: session
                .event
                .date
                .map(|date| date.format("%B %d, %Y").to_string())
                .unwrap_or_default(),
            total_laps: bundle.total_laps(),
            circuit_length_m: layout.and_then(TrackLayout::circuit_length_m),
            title: format!("{} - {}", session.event.name, session.session_type().title()),
        }
    }
}

/// Pipeline states, in the order a run visits them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    SessionLoaded,
    /// Only visited by race and sprint sessions
    LayoutResolved,
    TelemetryAssembled,
    Ready,
}

/// Result of a pipeline run, handed to the replay as a whole
#[derive(Clone, Debug)]
pub struct PreparedSession {
    pub session_type: SessionType,
    pub bundle: TelemetryBundle,
    pub info: SessionInfo,
    /// Absent for qualifying sessions
    pub layout: Option<TrackLayout>,
    /// Whether the layout lap came from the qualifying fallback
    pub fallback_used: bool,
    pub stages: Vec<PipelineStage>,
}

pub struct Pipeline<S: SessionSource> {
    source: S,
    options: AssemblyOptions,
}

impl<S: SessionSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: AssemblyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Prepare a session for replay.
    ///
    /// Session load failures and a primary session without laps are fatal and
    /// returned as-is; degraded paths are only logged.
    pub fn run(
        &self,
        year: u16,
        round: u8,
        session_type: SessionType,
    ) -> Result<PreparedSession, TracksideError> {
        let id = SessionId::new(year, round, session_type);
        self.prepare(id).inspect_err(|e| {
            error!("{}", stage_line(&format!("Error: {}", e)));
        })
    }

    fn prepare(&self, id: SessionId) -> Result<PreparedSession, TracksideError> {
        let started_at = Instant::now();
        let mut stages = vec![PipelineStage::Idle];
        log_line(&format!("Loading F1 {}", id));

        let mut timer = StageTimer::start("Session load finished");
        let session = self
            .source
            .load_session(id)
            .inspect_err(|_| timer.abandon())?;
        timer.finish(&format!(
            "Loaded session: {} - {} - {}",
            session.event.name,
            id.round,
            id.session_type.code()
        ));
        stages.push(PipelineStage::SessionLoaded);

        let (layout, fallback_used) = if id.session_type.is_qualifying() {
            (None, false)
        } else {
            let mut timer = StageTimer::start("Track layout telemetry prepared");
            let (layout, fallback_used) = layout::select_layout(&session, &self.source)
                .inspect_err(|_| timer.abandon())?;
            stages.push(PipelineStage::LayoutResolved);
            (Some(layout), fallback_used)
        };

        let bundle = {
            let _timer = StageTimer::start(if id.session_type.is_qualifying() {
                "Prepared qualifying telemetry dataset"
            } else {
                "Prepared race telemetry dataset"
            });
            assembler::assemble(&session, id.session_type, &self.options)
        };
        stages.push(PipelineStage::TelemetryAssembled);
        if let TelemetryBundle::Race(race) = &bundle {
            if !race.omitted_drivers.is_empty() {
                info!(
                    "Replay continues without drivers: {}",
                    race.omitted_drivers.join(", ")
                );
            }
        }

        let info = SessionInfo::new(&session, &bundle, layout.as_ref());
        stages.push(PipelineStage::Ready);
        info!(
            "{}",
            elapsed_line("Session ready for replay window", started_at.elapsed())
        );

        Ok(PreparedSession {
            session_type: id.session_type,
            bundle,
            info,
            layout,
            fallback_used,
            stages,
        })
    }
}
