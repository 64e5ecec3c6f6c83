//! OHLCV bar ingestion from CSV files, plain or zstd-compressed

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::signal_core::{Bar, BarSeries};

/// CSV row with the usual OHLCV column spellings. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "date", alias = "Timestamp", alias = "Datetime", alias = "datetime")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

/// Parse an RFC 3339 timestamp, a `%Y-%m-%d[ %H:%M:%S]` date (UTC) or an
/// epoch value (seconds, or milliseconds when too large for seconds)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts.and_utc());
        }
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        let ts = if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        if let Some(ts) = ts {
            return Ok(ts);
        }
    }

    bail!("Unrecognized timestamp: {}", raw)
}

/// Read bars from any CSV source, in file order
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result.with_context(|| format!("Failed to parse CSV row {}", line + 1))?;
        bars.push(Bar {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(bars)
}

/// Load a validated series from a `.csv` or `.csv.zst` file. Rows are sorted
/// by timestamp; duplicates and malformed bars are rejected.
pub fn load_bars(path: &Path) -> Result<BarSeries> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;

    let mut bars = if path.extension().map_or(false, |ext| ext == "zst") {
        let decoder = zstd::stream::Decoder::new(file)
            .with_context(|| format!("Failed to create zstd decoder for: {:?}", path))?;
        read_bars(BufReader::new(decoder))?
    } else {
        read_bars(BufReader::new(file))?
    };

    bars.sort_by_key(|b| b.timestamp);
    tracing::debug!("Loaded {} bars from {:?}", bars.len(), path);

    BarSeries::new(bars).with_context(|| format!("Invalid bar series in {:?}", path))
}

/// Symbol name for a bar file: the file name up to its first `.`
pub fn symbol_from_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// Expand directories into their `.csv` / `.zst` files (sorted); plain
/// file paths pass through
pub fn find_bar_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {:?}", path))?
        {
            let entry_path = entry?.path();
            if entry_path
                .extension()
                .map_or(false, |ext| ext == "csv" || ext == "zst")
            {
                found.push(entry_path);
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-03,101.0,102.0,100.5,101.5,101.5,1200
2024-01-02,100.0,101.2,99.5,101.0,101.0,1000
";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("level-breakout-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let day = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02").unwrap(), day);
        assert_eq!(parse_timestamp("2024-01-02 00:00:00").unwrap(), day);
        assert_eq!(parse_timestamp("2024-01-02T00:00:00Z").unwrap(), day);
        assert_eq!(parse_timestamp("2024-01-01T19:00:00-05:00").unwrap(), day);
        assert_eq!(parse_timestamp("1704153600").unwrap(), day);
        assert_eq!(parse_timestamp("1704153600000").unwrap(), day);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_read_bars_ignores_extra_columns() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 101.5);
        assert_eq!(bars[1].volume, 1000.0);
    }

    #[test]
    fn test_lowercase_headers() {
        let csv = "timestamp,open,high,low,close,volume\n1704153600,1,2,0.5,1.5,10\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars[0].high, 2.0);
    }

    #[test]
    fn test_load_sorts_rows() {
        let path = temp_path("AAPL.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let series = load_bars(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(series.len(), 2);
        assert!(series.bars()[0].timestamp < series.bars()[1].timestamp);
        assert_eq!(series.bars()[0].open, 100.0);
    }

    #[test]
    fn test_load_zstd() {
        let path = temp_path("MSFT.csv.zst");
        let compressed = zstd::encode_all(SAMPLE.as_bytes(), 3).unwrap();
        std::fs::write(&path, compressed).unwrap();
        let series = load_bars(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let path = temp_path("DUP.csv");
        let csv = "date,open,high,low,close,volume\n2024-01-02,1,2,0.5,1.5,10\n2024-01-02,1,2,0.5,1.5,10\n";
        std::fs::write(&path, csv).unwrap();
        let result = load_bars(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_symbol_from_path() {
        assert_eq!(symbol_from_path(Path::new("data/NVDA.csv.zst")), "NVDA");
        assert_eq!(symbol_from_path(Path::new("SPY.csv")), "SPY");
    }
}
