use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::SplitStream;

use crate::store::{ReadingStore, StatusStore};
use crate::telemetry::{Field, FieldError, ReadingAccumulator, derive_statuses, parse_line};

/// What a single line contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not a `<label>: <value>` line, an unknown label or a bad number.
    Skipped,
    StatusSaved,
    /// The line completed a record, which was saved along with the status.
    ReadingSaved,
    StorageFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub skipped_lines: u64,
    pub snapshots_saved: u64,
    pub readings_saved: u64,
    pub storage_failures: u64,
}

/// Drives the device stream into the store, one line at a time.
///
/// Owns the in-progress record; nothing outside the ingestor can mutate it.
#[derive(Debug)]
pub struct Ingestor<S> {
    store: S,
    accumulator: ReadingAccumulator,
    last_captured_at: Option<DateTime<Utc>>,
    stats: IngestStats,
}

impl<S> Ingestor<S>
where
    S: ReadingStore + StatusStore + Sync,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            accumulator: ReadingAccumulator::new(),
            last_captured_at: None,
            stats: IngestStats::default(),
        }
    }

    pub fn accumulator(&self) -> &ReadingAccumulator {
        &self.accumulator
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads lines until the stream ends. Only an I/O error is returned; every per-line
    /// failure, including bytes that are not UTF-8, is logged and skipped.
    pub async fn run<R>(&mut self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        tracing::info!("ingestion started");

        let mut lines = SplitStream::new(reader.split(b'\n'));
        while let Some(raw) = lines.next().await {
            let raw = raw.context("failed to read line from device stream")?;
            let Some(line) = decode_utf8(raw) else {
                self.stats.lines += 1;
                self.stats.skipped_lines += 1;
                continue;
            };
            self.process_line(&line, Utc::now()).await;
        }

        tracing::info!(stats = ?self.stats, "device stream closed");
        Ok(())
    }

    pub async fn process_line(&mut self, line: &str, now: DateTime<Utc>) -> LineOutcome {
        self.stats.lines += 1;
        tracing::debug!(line = %line, "received line");

        let Some(field) = decode(line) else {
            self.stats.skipped_lines += 1;
            return LineOutcome::Skipped;
        };
        self.accumulator.apply(field);

        let captured_at = match self.last_captured_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_captured_at = Some(captured_at);

        let snapshot = derive_statuses(self.accumulator.current(), captured_at);
        tracing::debug!(statuses = ?snapshot.statuses, "derived channel statuses");
        if let Err(err) = self.store.save_status(&snapshot).await {
            self.stats.storage_failures += 1;
            tracing::warn!(error = %err, "failed to save status snapshot");
            return LineOutcome::StorageFailed;
        }
        self.stats.snapshots_saved += 1;

        let Some(reading) = self.accumulator.current().to_reading(captured_at) else {
            return LineOutcome::StatusSaved;
        };

        // A failed write drops the record; it is not retried on the next line.
        let saved = self.store.save_reading(&reading).await;
        self.accumulator.reset();

        match saved {
            Ok(()) => {
                self.stats.readings_saved += 1;
                tracing::info!(
                    date = %reading.date,
                    time = %reading.time,
                    "saved reading"
                );
                LineOutcome::ReadingSaved
            }
            Err(err) => {
                self.stats.storage_failures += 1;
                tracing::warn!(error = %err, "failed to save reading");
                LineOutcome::StorageFailed
            }
        }
    }
}

fn decode_utf8(mut raw: Vec<u8>) -> Option<String> {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }

    match String::from_utf8(raw) {
        Ok(line) => Some(line),
        Err(err) => {
            tracing::warn!(
                line = %String::from_utf8_lossy(err.as_bytes()),
                error = %err.utf8_error(),
                "ignoring line that is not valid UTF-8"
            );
            None
        }
    }
}

fn decode(line: &str) -> Option<Field> {
    let Some((key, value)) = parse_line(line) else {
        tracing::warn!(line = %line, "ignoring line without key/value shape");
        return None;
    };

    match Field::from_pair(key, value) {
        Ok(field) => Some(field),
        Err(err @ FieldError::UnknownLabel(_)) => {
            tracing::warn!(error = %err, "ignoring unknown label");
            None
        }
        Err(err @ FieldError::InvalidNumber { .. }) => {
            tracing::warn!(line = %line, error = %err, "ignoring line with invalid number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::telemetry::{Channel, ChannelStatus, PartialReading};

    const FULL_RECORD: [&str; 8] = [
        "Date: 23/11/2024",
        "Time: 14:30",
        "Water Temperature: 21.5",
        "TDS: 450",
        "Humidity: 60",
        "Environment Temperature: 25.0",
        "Water Level: 80",
        "pH: 6.8",
    ];

    async fn feed(ingestor: &mut Ingestor<MemoryStore>, lines: &[&str]) -> Vec<LineOutcome> {
        let start = Utc::now();
        let mut outcomes = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let now = start + TimeDelta::seconds(i as i64);
            outcomes.push(ingestor.process_line(line, now).await);
        }
        outcomes
    }

    #[tokio::test]
    async fn single_measurement_yields_one_snapshot() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        let outcome = ingestor
            .process_line("Water Temperature: 22.1", Utc::now())
            .await;

        assert_eq!(outcome, LineOutcome::StatusSaved);
        let statuses = ingestor.store().statuses();
        assert_eq!(statuses.len(), 1);
        for channel in Channel::ALL {
            let expected = if channel == Channel::WaterTemperature {
                ChannelStatus::Online
            } else {
                ChannelStatus::Offline
            };
            assert_eq!(statuses[0].status(channel), expected, "{channel}");
        }
        assert!(ingestor.store().readings().is_empty());
    }

    #[tokio::test]
    async fn full_record_is_saved_once_and_accumulator_resets() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        let outcomes = feed(&mut ingestor, &FULL_RECORD).await;

        assert_eq!(outcomes[..7], [LineOutcome::StatusSaved; 7]);
        assert_eq!(outcomes[7], LineOutcome::ReadingSaved);

        let readings = ingestor.store().readings();
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert_eq!(reading.date, "23/11/2024");
        assert_eq!(reading.time, "14:30");
        assert_eq!(reading.water_temperature, 21.5);
        assert_eq!(reading.tds, 450.0);
        assert_eq!(reading.humidity, 60.0);
        assert_eq!(reading.environment_temperature, 25.0);
        assert_eq!(reading.water_level, 80.0);
        assert_eq!(reading.ph, 6.8);

        assert_eq!(ingestor.accumulator().current(), &PartialReading::default());
    }

    #[tokio::test]
    async fn snapshots_track_channels_seen_so_far() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        feed(&mut ingestor, &FULL_RECORD).await;

        let statuses = ingestor.store().statuses();
        assert_eq!(statuses.len(), FULL_RECORD.len());

        // Date and time lines carry no channel.
        assert!(statuses[0].all_offline());
        assert!(statuses[1].all_offline());

        for (seen, snapshot) in statuses[2..].iter().enumerate() {
            let online = Channel::ALL
                .iter()
                .filter(|&&c| snapshot.status(c) == ChannelStatus::Online)
                .count();
            assert_eq!(online, seen + 1);
        }
        let last = statuses.last().unwrap();
        assert!(Channel::ALL.iter().all(|&c| last.status(c) == ChannelStatus::Online));
    }

    #[tokio::test]
    async fn malformed_and_unknown_lines_change_nothing() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        let outcomes = feed(
            &mut ingestor,
            &["----------------", "Battery: 3.7", "TDS: lots", ""],
        )
        .await;

        assert_eq!(outcomes, [LineOutcome::Skipped; 4]);
        assert!(ingestor.store().statuses().is_empty());
        assert_eq!(ingestor.accumulator().current(), &PartialReading::default());
        assert_eq!(ingestor.stats().skipped_lines, 4);
    }

    #[tokio::test]
    async fn invalid_number_stalls_record_until_corrected() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        let mut lines = FULL_RECORD.to_vec();
        lines[7] = "pH: ?";
        feed(&mut ingestor, &lines).await;

        assert!(ingestor.store().readings().is_empty());
        assert_eq!(ingestor.store().statuses().len(), 7);

        let outcome = ingestor.process_line("pH: 7.1", Utc::now()).await;
        assert_eq!(outcome, LineOutcome::ReadingSaved);
        assert_eq!(ingestor.store().readings()[0].ph, 7.1);
    }

    #[tokio::test]
    async fn zero_reading_never_completes_record() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        let mut lines = FULL_RECORD.to_vec();
        lines[4] = "Humidity: 0";
        feed(&mut ingestor, &lines).await;

        assert!(ingestor.store().readings().is_empty());
        let last = ingestor.store().statuses().pop().unwrap();
        assert_eq!(last.status(Channel::Humidity), ChannelStatus::Offline);
    }

    #[tokio::test]
    async fn captured_at_never_goes_backwards() {
        let mut ingestor = Ingestor::new(MemoryStore::default());
        let t = Utc::now();

        ingestor.process_line("TDS: 450", t).await;
        ingestor
            .process_line("pH: 6.8", t - TimeDelta::seconds(10))
            .await;

        let statuses = ingestor.store().statuses();
        assert_eq!(statuses[0].captured_at, t);
        assert_eq!(statuses[1].captured_at, t);
    }

    #[tokio::test]
    async fn status_failure_defers_reading_to_next_line() {
        let mut ingestor = Ingestor::new(MemoryStore::default());

        feed(&mut ingestor, &FULL_RECORD[..7]).await;
        ingestor.store().set_fail_statuses(true);
        let outcome = ingestor.process_line(FULL_RECORD[7], Utc::now()).await;
        assert_eq!(outcome, LineOutcome::StorageFailed);
        assert!(ingestor.store().readings().is_empty());
        assert!(ingestor.accumulator().is_complete());

        ingestor.store().set_fail_statuses(false);
        let outcome = ingestor.process_line("Humidity: 61", Utc::now()).await;
        assert_eq!(outcome, LineOutcome::ReadingSaved);
        assert_eq!(ingestor.store().readings()[0].humidity, 61.0);
    }

    #[tokio::test]
    async fn reading_failure_drops_record() {
        let mut ingestor = Ingestor::new(MemoryStore::default());
        ingestor.store().set_fail_readings(true);

        let outcomes = feed(&mut ingestor, &FULL_RECORD).await;

        assert_eq!(outcomes[7], LineOutcome::StorageFailed);
        assert_eq!(ingestor.store().statuses().len(), 8);
        assert!(ingestor.store().readings().is_empty());
        assert_eq!(ingestor.accumulator().current(), &PartialReading::default());
        assert_eq!(ingestor.stats().storage_failures, 1);
    }

    #[tokio::test]
    async fn run_skips_line_with_invalid_utf8() {
        let input: &[u8] = b"TDS: 450\n\xff\xfe garbage\r\npH: 6.8\n";

        let mut ingestor = Ingestor::new(MemoryStore::default());
        ingestor.run(input).await.unwrap();

        let statuses = ingestor.store().statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[1].status(Channel::Tds), ChannelStatus::Online);
        assert_eq!(statuses[1].status(Channel::Ph), ChannelStatus::Online);
        assert_eq!(ingestor.stats().lines, 3);
        assert_eq!(ingestor.stats().skipped_lines, 1);
    }

    #[tokio::test]
    async fn run_consumes_stream_until_closed() {
        let mut input = FULL_RECORD.join("\r\n");
        input.push_str("\r\nnoise\r\nTDS: 451\r\n");

        let mut ingestor = Ingestor::new(MemoryStore::default());
        ingestor.run(input.as_bytes()).await.unwrap();

        assert_eq!(ingestor.store().readings().len(), 1);
        assert_eq!(ingestor.store().statuses().len(), 9);
        assert_eq!(
            ingestor.stats(),
            &IngestStats {
                lines: 10,
                skipped_lines: 1,
                snapshots_saved: 9,
                readings_saved: 1,
                storage_failures: 0,
            }
        );
        assert_eq!(
            ingestor.accumulator().current().measurement(Channel::Tds),
            Some(451.0)
        );
    }
}
