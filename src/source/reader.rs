//! Rate-limited sentence reader
//!
//! Pulls lines from the source on a fixed cadence, parses them and forwards
//! records of the target kind to the registry. Each tick emits at most one
//! record; other kinds met on the way are skipped within the same tick.

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::Record;
use crate::sentence::{ParseError, SentenceParser};
use crate::stats::ReaderStats;

use super::config::{ParseErrorPolicy, SourceConfig};
use super::error::SourceError;
use super::lines::LineSource;

/// Why the reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// Shared cancellation token fired
    Cancelled,
    /// Source ran out and looping is disabled
    Exhausted,
    /// Record receiver was dropped
    OutputClosed,
}

impl fmt::Display for ReaderExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderExit::Cancelled => write!(f, "cancelled"),
            ReaderExit::Exhausted => write!(f, "source exhausted"),
            ReaderExit::OutputClosed => write!(f, "output closed"),
        }
    }
}

/// Final state reported by a reader that stopped without error
#[derive(Debug, Clone)]
pub struct ReaderReport {
    pub exit: ReaderExit,
    pub stats: ReaderStats,
}

/// Source reader producing records for the registry
pub struct SourceReader<P> {
    config: SourceConfig,
    parser: P,
    stats: ReaderStats,
}

impl<P: SentenceParser> SourceReader<P> {
    /// Create a new reader
    pub fn new(config: SourceConfig, parser: P) -> Self {
        Self {
            config,
            parser,
            stats: ReaderStats::new(),
        }
    }

    /// Get the reader configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Run until cancelled, exhausted, or the output is dropped
    ///
    /// `output` is dropped when this returns, which closes the record channel.
    pub async fn run(
        self,
        output: mpsc::Sender<Record>,
        cancel: CancellationToken,
    ) -> Result<ReaderReport, SourceError> {
        let source = LineSource::open(&self.config.path).await?;
        self.run_with_source(source, output, cancel).await
    }

    /// Same as [`run`](Self::run) with a source opened by the caller
    pub async fn run_with_source(
        mut self,
        mut source: LineSource,
        output: mpsc::Sender<Record>,
        cancel: CancellationToken,
    ) -> Result<ReaderReport, SourceError> {
        tracing::info!(
            path = %source.path().display(),
            kind = %self.config.target_kind,
            delay_us = self.config.delay.as_micros() as u64,
            loop_forever = self.config.loop_forever,
            "Source reader started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.config.delay, self.config.delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break ReaderExit::Cancelled,
                _ = ticker.tick() => {}
            }

            let record = match self.next_record(&mut source).await {
                Ok(Some(record)) => record,
                Ok(None) if self.config.loop_forever => continue,
                Ok(None) => break ReaderExit::Exhausted,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        lines_read = self.stats.lines_read,
                        records = self.stats.records_emitted,
                        "Source reader failed"
                    );
                    return Err(e);
                }
            };

            tracing::debug!(record = record.canonical(), "Record read");

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ReaderExit::Cancelled,
                sent = output.send(record) => sent,
            };
            if sent.is_err() {
                break ReaderExit::OutputClosed;
            }
            self.stats.records_emitted += 1;
        };

        tracing::info!(
            exit = %exit,
            lines_read = self.stats.lines_read,
            records = self.stats.records_emitted,
            passes = self.stats.passes,
            elapsed_ms = self.stats.duration().as_millis() as u64,
            rate = self.stats.record_rate(),
            "Source reader stopped"
        );

        Ok(ReaderReport {
            exit,
            stats: self.stats,
        })
    }

    /// Advance to the next record of the target kind
    ///
    /// Returns `Ok(None)` when the source is exhausted and either looping is
    /// off or a fresh pass produced nothing.
    async fn next_record(
        &mut self,
        source: &mut LineSource,
    ) -> Result<Option<Record>, SourceError> {
        let mut rewound = false;

        loop {
            let line = match source.next_line().await {
                Ok(line) => line,
                Err(SourceError::Exhausted) => {
                    self.stats.passes += 1;
                    if !self.config.loop_forever || rewound {
                        return Ok(None);
                    }
                    tracing::debug!(path = %source.path().display(), "Source exhausted, rewinding");
                    source.rewind().await?;
                    rewound = true;
                    continue;
                }
                Err(SourceError::Parse { line, source: error }) => {
                    self.stats.lines_read += 1;
                    self.reject(line, error)?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.stats.lines_read += 1;

            if line.trim().is_empty() {
                self.stats.lines_skipped += 1;
                continue;
            }

            match self.parser.parse(&line) {
                Ok(parsed) if parsed.kind == self.config.target_kind => {
                    return Ok(Some(Record::new(parsed.kind, &parsed.canonical)));
                }
                Ok(_) => self.stats.lines_skipped += 1,
                Err(e) => self.reject(source.line_number(), e)?,
            }
        }
    }

    /// Apply the parse error policy to a malformed line
    fn reject(&mut self, line: u64, error: ParseError) -> Result<(), SourceError> {
        self.stats.parse_failures += 1;
        match self.config.parse_error_policy {
            ParseErrorPolicy::Stop => Err(SourceError::Parse {
                line,
                source: error,
            }),
            ParseErrorPolicy::Skip => {
                tracing::warn!(line = line, error = %error, "Skipping malformed sentence");
                self.stats.lines_skipped += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use tempfile::NamedTempFile;
    use tokio_test::assert_ok;

    use super::*;
    use crate::sentence::{NmeaParser, ParsedSentence};

    const RMC_1: &str = "$GPRMC,220516,A,5133.82,N,00042.24,W,173.8,231.8,130694,004.2,W*70";
    const GGA: &str = "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76";

    /// Parser treating every line as `KIND,payload`
    struct PlainParser;

    impl SentenceParser for PlainParser {
        fn parse(&self, line: &str) -> Result<ParsedSentence, ParseError> {
            let (kind, _) = line.split_once(',').ok_or(ParseError::MissingChecksum)?;
            Ok(ParsedSentence {
                kind: kind.to_string(),
                canonical: line.to_string(),
            })
        }
    }

    fn source_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn fast(path: &std::path::Path) -> SourceConfig {
        SourceConfig::new(path).delay(Duration::from_millis(1))
    }

    async fn collect(mut rx: mpsc::Receiver<Record>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(record) = rx.recv().await {
            out.push(record.canonical().to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_forwards_only_target_kind_in_order() {
        let file = source_file(&["RMC,1", "GGA,x", "RMC,2", "GGA,y", "RMC,3"]);
        let reader = SourceReader::new(fast(file.path()), PlainParser);
        let (tx, rx) = mpsc::channel(1);

        let collector = tokio::spawn(collect(rx));
        let report = assert_ok!(reader.run(tx, CancellationToken::new()).await);

        assert_eq!(report.exit, ReaderExit::Exhausted);
        assert_eq!(report.stats.records_emitted, 3);
        assert_eq!(report.stats.lines_skipped, 2);
        assert_eq!(collector.await.unwrap(), vec!["RMC,1", "RMC,2", "RMC,3"]);
    }

    #[tokio::test]
    async fn test_emits_canonical_form() {
        let file = source_file(&[GGA, "", &format!("  {}  ", RMC_1)]);
        let reader = SourceReader::new(fast(file.path()), NmeaParser);
        let (tx, rx) = mpsc::channel(4);

        let report = assert_ok!(reader.run(tx, CancellationToken::new()).await);
        assert_eq!(report.stats.lines_skipped, 2);
        assert_eq!(collect(rx).await, vec![RMC_1.to_string()]);
    }

    #[tokio::test]
    async fn test_parse_failure_stops_reader() {
        let file = source_file(&["RMC,1", "garbage", "RMC,2"]);
        let reader = SourceReader::new(fast(file.path()), PlainParser);
        let (tx, rx) = mpsc::channel(4);

        let result = reader.run(tx, CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(SourceError::Parse {
                line: 2,
                source: ParseError::MissingChecksum
            })
        ));
        // Channel is closed and holds only what was read before the failure
        assert_eq!(collect(rx).await, vec!["RMC,1"]);
    }

    #[tokio::test]
    async fn test_parse_failure_skipped_with_skip_policy() {
        let file = source_file(&["RMC,1", "garbage", "RMC,2"]);
        let config = fast(file.path()).parse_error_policy(ParseErrorPolicy::Skip);
        let reader = SourceReader::new(config, PlainParser);
        let (tx, rx) = mpsc::channel(4);

        let report = assert_ok!(reader.run(tx, CancellationToken::new()).await);

        assert_eq!(report.stats.parse_failures, 1);
        assert_eq!(collect(rx).await, vec!["RMC,1", "RMC,2"]);
    }

    fn file_with_invalid_utf8() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RMC,1\n$GP\xff\xfeRMC,garbage*00\nRMC,2\n")
            .unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_invalid_utf8_stops_reader_as_parse_failure() {
        let file = file_with_invalid_utf8();
        let reader = SourceReader::new(fast(file.path()), PlainParser);
        let (tx, rx) = mpsc::channel(4);

        let result = reader.run(tx, CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(SourceError::Parse {
                line: 2,
                source: ParseError::InvalidUtf8
            })
        ));
        assert_eq!(collect(rx).await, vec!["RMC,1"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_skipped_with_skip_policy() {
        let file = file_with_invalid_utf8();
        let config = fast(file.path()).parse_error_policy(ParseErrorPolicy::Skip);
        let reader = SourceReader::new(config, PlainParser);
        let (tx, rx) = mpsc::channel(4);

        let report = assert_ok!(reader.run(tx, CancellationToken::new()).await);

        assert_eq!(report.exit, ReaderExit::Exhausted);
        assert_eq!(report.stats.parse_failures, 1);
        assert_eq!(report.stats.records_emitted, 2);
        assert_eq!(collect(rx).await, vec!["RMC,1", "RMC,2"]);
    }

    #[tokio::test]
    async fn test_loop_rewinds_source() {
        let file = source_file(&["RMC,1", "GGA,x", "RMC,2"]);
        let config = fast(file.path()).loop_forever(true);
        let reader = SourceReader::new(config, PlainParser);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(reader.run(tx, cancel.clone()));

        let mut got = Vec::new();
        for _ in 0..5 {
            got.push(rx.recv().await.unwrap().canonical().to_string());
        }
        cancel.cancel();

        let report = assert_ok!(handle.await.unwrap());
        assert_eq!(report.exit, ReaderExit::Cancelled);
        assert!(report.stats.passes >= 2);
        assert_eq!(got, vec!["RMC,1", "RMC,2", "RMC,1", "RMC,2", "RMC,1"]);
    }

    #[tokio::test]
    async fn test_loop_over_source_without_targets_waits_for_cancel() {
        let file = source_file(&["GGA,x"]);
        let config = fast(file.path()).loop_forever(true);
        let reader = SourceReader::new(config, PlainParser);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(reader.run(tx, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        let report = assert_ok!(handle.await.unwrap());
        assert_eq!(report.exit, ReaderExit::Cancelled);
        assert_eq!(report.stats.records_emitted, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_tick_wait() {
        let file = source_file(&["RMC,1", "RMC,2"]);
        let config = SourceConfig::new(file.path()).delay(Duration::from_secs(10));
        let reader = SourceReader::new(config, PlainParser);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(reader.run(tx, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let report = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reader did not stop within one tick")
            .unwrap()
            .unwrap();

        assert_eq!(report.exit, ReaderExit::Cancelled);
        assert_eq!(report.stats.records_emitted, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_while_blocked_on_emit() {
        let file = source_file(&["RMC,1", "RMC,2", "RMC,3"]);
        let reader = SourceReader::new(fast(file.path()), PlainParser);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(reader.run(tx, cancel.clone()));
        // Nobody reads: the first record fills the channel, the second blocks
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.exit, ReaderExit::Cancelled);
        assert_eq!(report.stats.records_emitted, 1);
        assert_eq!(rx.recv().await.unwrap().canonical(), "RMC,1");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_output_closed() {
        let file = source_file(&["RMC,1"]);
        let reader = SourceReader::new(fast(file.path()), PlainParser);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let report = reader.run(tx, CancellationToken::new()).await.unwrap();
        assert_eq!(report.exit, ReaderExit::OutputClosed);
    }

    #[tokio::test]
    async fn test_missing_source_is_error() {
        let reader = SourceReader::new(SourceConfig::new("/nonexistent/track.nmea"), PlainParser);
        let (tx, _rx) = mpsc::channel(1);

        let result = reader.run(tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
