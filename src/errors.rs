// Error types for trackside

use snafu::Snafu;
use std::io;

use crate::session::SessionId;

#[derive(Debug, Snafu)]
pub enum TracksideError {
    // Errors from the session data source
    #[snafu(display("Unable to load session {session}: {reason}"))]
    SessionLoad { session: SessionId, reason: String },
    #[snafu(display("No valid laps found in session {session}"))]
    NoLaps { session: SessionId },
    #[snafu(display("Telemetry unavailable for driver {driver} lap {lap_number}: {reason}"))]
    TelemetryUnavailable {
        driver: String,
        lap_number: u32,
        reason: String,
    },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
    #[snafu(display("Malformed session data: {reason}"))]
    SourceFormatError { reason: String },
    #[snafu(display("Channel {channel} has {actual} samples, expected {expected}"))]
    ChannelLengthMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    // Degraded paths, logged but never returned from the pipeline
    #[snafu(display("Data unavailable for driver {driver}: {reason}"))]
    DriverDataUnavailable { driver: String, reason: String },
    #[snafu(display("Qualifying fallback unavailable: {reason}"))]
    FallbackUnavailable { reason: String },

    // Errors for the replay writer and loader
    #[snafu(display("Error writing replay file"))]
    WriterError { source: io::Error },
    #[snafu(display("Invalid replay file: {path}"))]
    InvalidReplayFile { path: String },

    // Config and cache management errors
    #[snafu(display("Could not find a cache directory for session data"))]
    NoCacheDir,
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error accessing config or cache directory"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}
