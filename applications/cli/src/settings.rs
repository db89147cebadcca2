/// Command line and configuration merged into engine options
use crate::cli::Cli;
use crate::config::CliConfig;
use earmark_audio_desktop::DeviceSelector;
use earmark_core::EarmarkError;
use earmark_playback::{PrepareOptions, SessionOptions, TestMode, MAX_CASUAL_SAMPLES};
use std::path::PathBuf;

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct Settings {
    /// Files in slot order
    pub files: Vec<PathBuf>,
    /// Session options
    pub session: SessionOptions,
    /// Preparation options
    pub prepare: PrepareOptions,
    /// Output device
    pub device: DeviceSelector,
    /// Report as JSON instead of text
    pub json: bool,
}

impl Settings {
    /// Merge `cli` over `config`, checking what can be checked before any
    /// file is opened
    pub fn resolve(cli: &Cli, config: &CliConfig) -> Result<Self, EarmarkError> {
        config.validate()?;

        let mode = cli.mode.selected().unwrap_or(TestMode::Casual);
        let files = cli.files.len();
        match mode {
            TestMode::Casual if files > MAX_CASUAL_SAMPLES => {
                return Err(EarmarkError::usage(format!(
                    "casual mode takes at most {MAX_CASUAL_SAMPLES} files, got {files}"
                )));
            }
            TestMode::Ab | TestMode::Abx | TestMode::Xxy if files != 2 => {
                return Err(EarmarkError::usage(format!(
                    "{mode} mode takes exactly two files, got {files}"
                )));
            }
            _ => {}
        }

        if let (Some(start), Some(end)) = (cli.start, cli.end) {
            if end <= start {
                return Err(EarmarkError::usage(format!(
                    "end ({end}s) must come after start ({start}s)"
                )));
            }
        }

        let session = SessionOptions {
            mode,
            trials: cli.trials.map_or(config.trials, |n| n as usize),
            flip_style: cli.flip.selected().unwrap_or(config.flip_style),
            restart: cli.restart.selected().unwrap_or(config.restart),
            start_secs: cli.start.unwrap_or(0.0),
            end_secs: cli.end,
            running_score: cli.running_score || config.running_score,
            seed: cli.seed,
        };

        let prepare = PrepareOptions {
            force_dither: cli.force_dither,
            force_truncate: cli.force_truncate,
            downmix: cli.downmix,
            seed: cli.seed,
        };

        let device = DeviceSelector::parse(cli.device.as_deref().or(config.device.as_deref()));

        Ok(Self {
            files: cli.files.clone(),
            session,
            prepare,
            device,
            json: cli.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use earmark_playback::{FlipStyle, RestartMode};

    fn resolve(args: &[&str], config: &CliConfig) -> Result<Settings, EarmarkError> {
        let cli = Cli::try_parse_from(std::iter::once("earmark").chain(args.iter().copied())).unwrap();
        Settings::resolve(&cli, config)
    }

    #[test]
    fn flags_override_config() {
        let config = CliConfig {
            flip_style: FlipStyle::Mark,
            restart: RestartMode::AfterTrial,
            trials: 12,
            device: Some("1".into()),
            running_score: false,
        };
        let settings = resolve(
            &["--abx", "--beep-flip", "-n", "20", "-d", "USB", "a.wav", "b.wav"],
            &config,
        )
        .unwrap();

        assert_eq!(settings.session.mode, TestMode::Abx);
        assert_eq!(settings.session.flip_style, FlipStyle::Beep);
        assert_eq!(settings.session.restart, RestartMode::AfterTrial);
        assert_eq!(settings.session.trials, 20);
        assert_eq!(settings.device, DeviceSelector::Name("USB".into()));
    }

    #[test]
    fn config_fills_the_gaps() {
        let config = CliConfig {
            trials: 7,
            device: Some("2".into()),
            running_score: true,
            ..Default::default()
        };
        let settings = resolve(&["a.wav"], &config).unwrap();

        assert_eq!(settings.session.mode, TestMode::Casual);
        assert_eq!(settings.session.trials, 7);
        assert!(settings.session.running_score);
        assert_eq!(settings.device, DeviceSelector::Index(2));
    }

    #[test]
    fn randomized_modes_need_two_files() {
        let err = resolve(&["--xxy", "a.wav", "b.wav", "c.wav"], &CliConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(resolve(&["--ab", "a.wav"], &CliConfig::default()).is_err());
    }

    #[test]
    fn casual_mode_takes_up_to_ten_files() {
        let files: Vec<String> = (0..11).map(|i| format!("{i}.wav")).collect();
        let mut args: Vec<&str> = files.iter().map(String::as_str).collect();
        assert!(resolve(&args, &CliConfig::default()).is_err());
        args.pop();
        assert!(resolve(&args, &CliConfig::default()).is_ok());
    }

    #[test]
    fn end_must_follow_start() {
        let err = resolve(&["--start", "1:00", "--end", "30", "a.wav"], &CliConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let settings = resolve(&["--start", "10", "--end", "1:00", "a.wav"], &CliConfig::default())
            .unwrap();
        assert_eq!(settings.session.start_secs, 10.0);
        assert_eq!(settings.session.end_secs, Some(60.0));
    }

    #[test]
    fn seed_reaches_both_stages() {
        let settings = resolve(&["--seed", "42", "--force-dither", "a.wav"], &CliConfig::default())
            .unwrap();
        assert_eq!(settings.session.seed, Some(42));
        assert_eq!(settings.prepare.seed, Some(42));
        assert!(settings.prepare.force_dither);
    }
}
