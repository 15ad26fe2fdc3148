//! Round callback that streams summaries as JSON lines.
//!
//! Every completed round is written as one JSON object followed by a
//! newline. A failed write stops the run at the next round boundary and
//! the error is reported once the runner returns.

use std::io::Write;

use keynes_agents::Agent;
use keynes_core::runner::RoundCallback;
use keynes_types::RoundSummary;
use tracing::{debug, warn};

/// Errors that can occur while writing the report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A summary could not be serialized or written.
    #[error("failed to write round {round}: {source}")]
    Serialize {
        /// Zero-based index of the round being written.
        round: u64,
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// Writing the line terminator or flushing the output failed.
    #[error("output I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// Callback that serializes each [`RoundSummary`] to a writer.
pub struct JsonLinesReport<W> {
    out: W,
    written: u64,
    error: Option<ReportError>,
}

impl<W: Write> JsonLinesReport<W> {
    /// Create a report that writes to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            written: 0,
            error: None,
        }
    }

    /// Number of summaries written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Flush the writer and surface the first write failure, if any.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReportError`] raised while writing, or
    /// [`ReportError::Io`] if the final flush fails.
    pub fn finish(mut self) -> Result<W, ReportError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_summary(&mut self, summary: &RoundSummary) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.out, summary).map_err(|source| {
            ReportError::Serialize {
                round: summary.round,
                source,
            }
        })?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> RoundCallback for JsonLinesReport<W> {
    fn on_round(&mut self, summary: &RoundSummary, population: &[Agent]) {
        if self.error.is_some() {
            return;
        }
        match self.write_summary(summary) {
            Ok(()) => {
                self.written = self.written.saturating_add(1);
                debug!(
                    round = summary.round,
                    population = population.len(),
                    "Round summary written"
                );
            }
            Err(error) => {
                warn!(round = summary.round, error = %error, "Stopping after output failure");
                self.error = Some(error);
            }
        }
    }

    fn stop_requested(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use keynes_types::{AgentId, RoundWinner, Strategy};

    use super::*;

    fn summary(round: u64) -> RoundSummary {
        let mut strategy_counts = BTreeMap::new();
        strategy_counts.insert("random".to_owned(), 5);
        RoundSummary {
            round,
            strategy_counts,
            winning_target: 20.0,
            mean_guess: 30.0,
            winner: RoundWinner {
                agent_id: AgentId::new(),
                strategy: Strategy::Random,
                k_level: 0.0,
                guess: 21.0,
            },
        }
    }

    /// Writer that always fails.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_round() {
        let mut report = JsonLinesReport::new(Vec::new());
        report.on_round(&summary(0), &[]);
        report.on_round(&summary(1), &[]);
        assert_eq!(report.written(), 2);
        assert!(!report.stop_requested());

        let bytes = report.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RoundSummary = serde_json::from_str(lines.get(1).unwrap()).unwrap();
        assert_eq!(parsed.round, 1);
        assert!(text.contains("\"strategy_counts\":{\"random\":5}"));
    }

    /// Writer that accepts data but cannot flush.
    struct Unflushable;

    impl Write for Unflushable {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("device gone"))
        }
    }

    #[test]
    fn flush_failure_is_an_io_error() {
        let mut report = JsonLinesReport::new(Unflushable);
        report.on_round(&summary(0), &[]);
        assert_eq!(report.written(), 1);
        assert!(matches!(report.finish(), Err(ReportError::Io { .. })));
    }

    #[test]
    fn write_failure_requests_stop() {
        let mut report = JsonLinesReport::new(Broken);
        report.on_round(&summary(0), &[]);
        assert!(report.stop_requested());
        assert_eq!(report.written(), 0);
        assert!(matches!(
            report.finish(),
            Err(ReportError::Serialize { round: 0, .. })
        ));
    }
}
