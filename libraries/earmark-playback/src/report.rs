//! End-of-session report

use crate::stats::{is_significant, p_dual, p_single};
use crate::trial::{TestMode, TrialHistory, TrialRecord};
use serde::Serialize;
use std::fmt;

/// Counters kept while a session runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Seek commands issued
    pub seeks: usize,
    /// Flips between slots
    pub flips: usize,
    /// Choices withdrawn
    pub undos: usize,
    /// Withdrawn choices restored
    pub redos: usize,
    /// Audible fragments rendered
    pub fragments_played: u64,
}

/// Outcome of a session, printable as text or serialisable
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    /// Test mode
    pub mode: TestMode,
    /// Sample names in command-line order
    pub samples: Vec<String>,
    /// Choices recorded
    pub trials: usize,
    /// Times each sample was preferred (A/B only)
    pub preferences: Option<Vec<usize>>,
    /// Correct identifications (A/B/X and X/X/Y)
    pub correct: Option<usize>,
    /// Probability of a result at least this strong by chance
    pub p_value: Option<f64>,
    /// `p_value` is below the significance threshold
    pub significant: bool,
    /// Session counters
    pub stats: SessionStats,
    /// Audible playback time in seconds
    pub elapsed_secs: f64,
    /// Every choice in effect, oldest first
    pub records: Vec<TrialRecord>,
}

impl TrialReport {
    /// Summarise a finished session
    pub fn new(
        mode: TestMode,
        samples: Vec<String>,
        history: &TrialHistory,
        stats: SessionStats,
        elapsed_secs: f64,
    ) -> Self {
        let trials = history.len();
        let n = trials as u64;
        let (preferences, correct, p_value) = match mode {
            TestMode::Ab if trials > 0 => {
                let prefs = history.preferences(samples.len());
                let p = p_dual(prefs[0] as u64, n);
                (Some(prefs), None, Some(p))
            }
            TestMode::Abx | TestMode::Xxy if trials > 0 => {
                let correct = history.correct();
                (None, Some(correct), Some(p_single(correct as u64, n)))
            }
            _ => (None, None, None),
        };

        Self {
            mode,
            samples,
            trials,
            preferences,
            correct,
            p_value,
            significant: p_value.is_some_and(is_significant),
            stats,
            elapsed_secs,
            records: history.records().to_vec(),
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trials > 0 {
            writeln!(f, "{} test results:", self.mode)?;
        } else {
            writeln!(f, "{} session:", self.mode)?;
        }

        if let Some(prefs) = &self.preferences {
            for (i, (name, count)) in self.samples.iter().zip(prefs).enumerate() {
                writeln!(f, "\tSample {} ({name}) chosen {count}/{} trials.", i + 1, self.trials)?;
            }
            if let Some(p) = self.p_value {
                writeln!(f, "\tProbability of a preference this strong via random chance: {:.2}%", p * 100.0)?;
            }
        }
        if let Some(correct) = self.correct {
            writeln!(f, "\tCorrect sample identified {correct}/{} trials.", self.trials)?;
            if let Some(p) = self.p_value {
                writeln!(
                    f,
                    "\tProbability of {correct} or better correct via random chance: {:.2}%",
                    p * 100.0
                )?;
            }
        }
        if self.significant {
            writeln!(f, "\tStatistically significant result (>=95% confidence)")?;
        }
        writeln!(
            f,
            "\t{} flips, {} seeks, {} undos, {} of playback",
            self.stats.flips,
            self.stats.seeks,
            self.stats.undos,
            format_time(self.elapsed_secs)
        )
    }
}

/// `H:MM:SS.hh`
pub fn format_time(secs: f64) -> String {
    let hundredths = (secs.max(0.0) * 100.0).round() as u64;
    let h = hundredths / 360_000;
    let m = hundredths / 6_000 % 60;
    let s = hundredths / 100 % 60;
    let c = hundredths % 100;
    format!("{h}:{m:02}:{s:02}.{c:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::Assignment;

    fn history(picks: &[(Vec<usize>, Option<usize>, usize)]) -> TrialHistory {
        let mut h = TrialHistory::new();
        for (slots, answer, slot) in picks {
            h.record(TrialRecord::new(
                Assignment {
                    slots: slots.clone(),
                    answer: *answer,
                },
                *slot,
            ));
        }
        h
    }

    #[test]
    fn abx_seventeen_of_twenty_is_significant() {
        let mut picks = Vec::new();
        for i in 0..20 {
            let slot = if i < 17 { 1 } else { 0 };
            picks.push((vec![0, 1, 1], Some(1), slot));
        }
        let report = TrialReport::new(
            TestMode::Abx,
            vec!["a.wav".into(), "b.wav".into()],
            &history(&picks),
            SessionStats::default(),
            12.0,
        );
        assert_eq!(report.correct, Some(17));
        assert!(report.significant);
        let text = report.to_string();
        assert!(text.contains("17/20"));
        assert!(text.contains("0.13%"));
        assert!(text.contains("Statistically significant"));
    }

    #[test]
    fn ab_even_split_is_not_significant() {
        let mut picks = Vec::new();
        for i in 0..10 {
            picks.push((vec![0, 1], None, i % 2));
        }
        let report = TrialReport::new(
            TestMode::Ab,
            vec!["a.wav".into(), "b.wav".into()],
            &history(&picks),
            SessionStats::default(),
            0.0,
        );
        assert_eq!(report.preferences, Some(vec![5, 5]));
        assert_eq!(report.p_value, Some(1.0));
        assert!(!report.significant);
        assert!(!report.to_string().contains("significant"));
    }

    #[test]
    fn casual_has_no_statistics() {
        let report = TrialReport::new(
            TestMode::Casual,
            vec!["a.wav".into()],
            &TrialHistory::new(),
            SessionStats::default(),
            3.5,
        );
        assert!(report.p_value.is_none());
        assert!(report.to_string().contains("0:00:03.50"));
    }

    #[test]
    fn report_serialises() {
        let report = TrialReport::new(
            TestMode::Xxy,
            vec!["a.wav".into(), "b.wav".into()],
            &history(&[(vec![0, 0, 1], Some(2), 2)]),
            SessionStats::default(),
            1.0,
        );
        let json = report.to_json().unwrap();
        assert!(json.contains("\"mode\": \"xxy\""));
        assert!(json.contains("\"correct\": 1"));
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0.0), "0:00:00.00");
        assert_eq!(format_time(61.25), "0:01:01.25");
        assert_eq!(format_time(3_723.5), "1:02:03.50");
    }
}
