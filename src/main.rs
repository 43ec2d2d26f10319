use std::path::PathBuf;

use clap::{Parser, Subcommand, arg};
use log::info;
use trackside::{
    AssemblyOptions, Pipeline, SessionType, TracksideError,
    config::AppConfig,
    session::{FileSessionSource, SourceCache},
    timing::{StageTimer, log_line},
    writer::write_replay,
};

const DEFAULT_YEAR: u16 = 2025;
const DEFAULT_ROUND: u8 = 12;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Session archive directory, overrides the configured one
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare a session for replay
    Prepare {
        #[arg(short, long, default_value_t = DEFAULT_YEAR)]
        year: u16,

        #[arg(short, long, default_value_t = DEFAULT_ROUND)]
        round: u8,

        /// R, Q, S or SQ
        #[arg(short, long, default_value = "R")]
        session: SessionType,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        frame_rate: Option<u32>,
    },
    /// List the rounds of a season available in the archive
    Rounds {
        #[arg(short, long, default_value_t = DEFAULT_YEAR)]
        year: u16,

        /// Only list rounds with a sprint
        #[arg(long)]
        sprints: bool,
    },
}

fn open_source(cache_dir: Option<PathBuf>) -> Result<FileSessionSource, TracksideError> {
    // the cache has to be enabled before any session load
    let timer = StageTimer::start("Session cache initialized");
    let cache = match cache_dir {
        Some(path) => SourceCache::enable(path)?,
        None => SourceCache::enable_default()?,
    };
    timer.finish(&format!("Session cache initialized at {:?}", cache.path()));
    Ok(FileSessionSource::new(cache))
}

fn default_output(config: &AppConfig, year: u16, round: u8, session: SessionType) -> PathBuf {
    let file_name = format!("{}_{:02}_{}.replay.jsonl", year, round, session.code());
    match &config.output_dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn prepare(
    config: &AppConfig,
    year: u16,
    round: u8,
    session: SessionType,
    output: Option<PathBuf>,
) -> Result<(), TracksideError> {
    let source = open_source(config.cache_dir.clone())?;
    let pipeline = Pipeline::new(source).with_options(AssemblyOptions {
        frame_rate: config.frame_rate,
    });
    let prepared = pipeline.run(year, round, session)?;

    let output = output.unwrap_or_else(|| default_output(config, year, round, session));
    write_replay(&output, &prepared)?;
    log_line(&format!(
        "Replay data for {} ready at {:?}",
        prepared.info.title, output
    ));
    Ok(())
}

fn rounds(config: &AppConfig, year: u16, sprints_only: bool) -> Result<(), TracksideError> {
    let source = open_source(config.cache_dir.clone())?;
    let rounds = source.list_rounds(year)?;
    if rounds.is_empty() {
        info!("No rounds of {} found in the archive", year);
    }
    for round in rounds.iter().filter(|r| !sprints_only || r.has_sprint) {
        println!(
            "{:>2}  {}  ({}){}",
            round.round,
            round.event_name,
            round.country,
            if round.has_sprint { "  [sprint]" } else { "" }
        );
    }
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let mut config = match AppConfig::from_local_file() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            log::warn!("Ignoring config file: {}", e);
            AppConfig::default()
        }
    };
    if cli.cache_dir.is_some() {
        config.cache_dir = cli.cache_dir.clone();
    }

    let result = match cli.command {
        Commands::Prepare {
            year,
            round,
            session,
            output,
            frame_rate,
        } => {
            if let Some(frame_rate) = frame_rate {
                config.frame_rate = frame_rate;
            }
            prepare(&config, year, round, session, output)
        }
        Commands::Rounds { year, sprints } => rounds(&config, year, sprints),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
