/// Command-line arguments
use crate::config::MAX_TRIALS;
use clap::{Args, Parser};
use earmark_audio::DownmixTarget;
use earmark_playback::{FlipStyle, RestartMode, TestMode};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "earmark", version)]
#[command(about = "Blind A/B, A/B/X and X/X/Y listening tests in the terminal", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub mode: ModeArgs,

    #[command(flatten)]
    pub flip: FlipArgs,

    #[command(flatten)]
    pub restart: RestartArgs,

    /// Output device: an index, or part of the device name
    #[arg(short, long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Dither every sample when reducing to 16 bits
    #[arg(long, conflicts_with = "force_truncate")]
    pub force_dither: bool,

    /// Never dither, except for 16-bit sources
    #[arg(long)]
    pub force_truncate: bool,

    /// Number of trials to run
    #[arg(
        short = 'n',
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=MAX_TRIALS as i64)
    )]
    pub trials: Option<u32>,

    /// Loop start, as seconds or [[h:]m:]s
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub start: Option<f64>,

    /// Loop end, as seconds or [[h:]m:]s
    #[arg(long, value_name = "TIME", value_parser = parse_time)]
    pub end: Option<f64>,

    /// Mix every sample down before comparing
    #[arg(long, value_name = "mono|stereo", value_parser = parse_downmix)]
    pub downmix: Option<DownmixTarget>,

    /// Show the score while the test runs (disables undo)
    #[arg(long)]
    pub running_score: bool,

    /// Seed for trial randomization and dither
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Audio files to compare
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Test mode flags, at most one
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Preference test between two samples in random order
    #[arg(long)]
    pub ab: bool,

    /// Identify which of A and B the hidden X is
    #[arg(long)]
    pub abx: bool,

    /// Find the odd one out among three slots
    #[arg(long)]
    pub xxy: bool,

    /// Switch freely between up to ten samples (default)
    #[arg(long)]
    pub casual: bool,
}

impl ModeArgs {
    pub fn selected(&self) -> Option<TestMode> {
        if self.ab {
            Some(TestMode::Ab)
        } else if self.abx {
            Some(TestMode::Abx)
        } else if self.xxy {
            Some(TestMode::Xxy)
        } else if self.casual {
            Some(TestMode::Casual)
        } else {
            None
        }
    }
}

/// Flip style flags, at most one
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct FlipArgs {
    /// Short silence between samples on a flip
    #[arg(long)]
    pub mark_flip: bool,

    /// Tone between samples on a flip
    #[arg(long)]
    pub beep_flip: bool,

    /// Plain crossfade on a flip
    #[arg(long)]
    pub seamless_flip: bool,
}

impl FlipArgs {
    pub fn selected(&self) -> Option<FlipStyle> {
        if self.mark_flip {
            Some(FlipStyle::Mark)
        } else if self.beep_flip {
            Some(FlipStyle::Beep)
        } else if self.seamless_flip {
            Some(FlipStyle::Seamless)
        } else {
            None
        }
    }
}

/// Restart mode flags, at most one
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct RestartArgs {
    /// Jump back to the loop start after each trial
    #[arg(long)]
    pub restart_after: bool,

    /// Jump back to the loop start after each trial and each flip
    #[arg(long)]
    pub restart_every: bool,
}

impl RestartArgs {
    pub fn selected(&self) -> Option<RestartMode> {
        if self.restart_after {
            Some(RestartMode::AfterTrial)
        } else if self.restart_every {
            Some(RestartMode::EveryFlip)
        } else {
            None
        }
    }
}

/// Parse `90`, `1:30`, `1:01:30.25` and the like into seconds
pub fn parse_time(s: &str) -> Result<f64, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() > 3 {
        return Err(format!("'{s}' has too many fields; use [[h:]m:]s"));
    }

    let (whole, last) = parts.split_at(parts.len() - 1);
    let secs: f64 = last[0]
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", last[0]))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{s}' is not a valid time"));
    }
    if !whole.is_empty() && secs >= 60.0 {
        return Err(format!("'{s}': seconds must be below 60"));
    }

    let mut total = 0.0;
    for (i, field) in whole.iter().enumerate() {
        let value: u32 = field
            .parse()
            .map_err(|_| format!("'{field}' is not a whole number"))?;
        // minutes after an hours field
        if i > 0 && value >= 60 {
            return Err(format!("'{s}': minutes must be below 60"));
        }
        total = total * 60.0 + f64::from(value);
    }
    Ok(total * 60.0 + secs)
}

fn parse_downmix(s: &str) -> Result<DownmixTarget, String> {
    match s.to_ascii_lowercase().as_str() {
        "mono" => Ok(DownmixTarget::Mono),
        "stereo" => Ok(DownmixTarget::Stereo),
        _ => Err(format!("'{s}' is not mono or stereo")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plain_seconds() {
        assert_relative_eq!(parse_time("90").unwrap(), 90.0);
        assert_relative_eq!(parse_time("2.5").unwrap(), 2.5);
    }

    #[test]
    fn minutes_and_hours() {
        assert_relative_eq!(parse_time("1:30").unwrap(), 90.0);
        assert_relative_eq!(parse_time("1:02:03.5").unwrap(), 3_723.5);
        assert_relative_eq!(parse_time("90:00").unwrap(), 5_400.0);
    }

    #[test]
    fn malformed_times() {
        assert!(parse_time("").is_err());
        assert!(parse_time("-1").is_err());
        assert!(parse_time("1:75").is_err());
        assert!(parse_time("1:60:00").is_err());
        assert!(parse_time("1:2:3:4").is_err());
        assert!(parse_time("a:10").is_err());
        assert!(parse_time("inf").is_err());
    }

    #[test]
    fn downmix_targets() {
        assert_eq!(parse_downmix("Mono"), Ok(DownmixTarget::Mono));
        assert_eq!(parse_downmix("stereo"), Ok(DownmixTarget::Stereo));
        assert!(parse_downmix("5.1").is_err());
    }
}
