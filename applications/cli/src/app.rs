/// A complete listening session, from files to report
use crate::cli::Cli;
use crate::config::CliConfig;
use crate::settings::Settings;
use crate::status::StatusLine;
use earmark_audio::FileLoader;
use earmark_audio_desktop::CpalOpener;
use earmark_core::{EarmarkError, InputSource, Result, Sample, SampleLoader};
use earmark_playback::{coordinator, prepare, Session, SessionStatus, StopReason, TrialReport};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Load, prepare, play and report
pub fn run(cli: &Cli) -> Result<()> {
    let config = CliConfig::load().map_err(|e| EarmarkError::usage(format!("{e:#}")))?;
    let settings = Settings::resolve(cli, &config)?;

    let samples = load_samples(&FileLoader::new(), &settings.files)?;
    let opener = CpalOpener::new(settings.device.clone());
    let prepared = prepare(samples, &opener, &settings.prepare)?;
    let mut session = Session::new(prepared.samples, prepared.windows, settings.session.clone())?;

    let input = open_input()?;
    let mut status = StatusLine::new(io::stderr());
    let reason = coordinator::run(
        &mut session,
        prepared.sink,
        input,
        &mut |s: &SessionStatus| {
            let _ = status.update(s);
        },
    );
    let _ = status.finish();

    match reason? {
        StopReason::Completed => info!("All trials recorded"),
        StopReason::Quit => info!("Session ended by user"),
        StopReason::DeviceClosed => warn!("Output device closed, session ended early"),
        StopReason::InputClosed => warn!("Keyboard input closed, session ended early"),
    }

    print_report(&session.report(), settings.json)
}

/// Decode every file, in command-line order
pub fn load_samples(loader: &dyn SampleLoader, files: &[PathBuf]) -> Result<Vec<Sample>> {
    files
        .iter()
        .map(|path| {
            let sample = loader.load(path)?;
            info!(
                "Loaded {} ({} Hz, {} channels, {:.2}s)",
                path.display(),
                sample.rate(),
                sample.channels(),
                sample.duration_secs()
            );
            Ok(sample)
        })
        .collect()
}

/// Write the report to stdout
pub fn print_report(report: &TrialReport, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        let text = report
            .to_json()
            .map_err(|e| EarmarkError::internal(format!("report serialisation: {e}")))?;
        writeln!(out, "{text}")?;
    } else {
        write!(out, "{report}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(unix)]
fn open_input() -> Result<Box<dyn InputSource>> {
    let input = earmark_audio_desktop::TerminalInput::open()?;
    Ok(Box::new(input))
}

#[cfg(not(unix))]
fn open_input() -> Result<Box<dyn InputSource>> {
    Err(EarmarkError::Terminal(
        "keyboard input needs a Unix terminal".into(),
    ))
}
