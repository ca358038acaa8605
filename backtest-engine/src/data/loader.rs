use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use common::{BacktestError, PriceBar, Result};
use serde::Deserialize;

/// Load bars from CSV file
///
/// Expected columns: date, open, high, low, close, volume
pub fn load_csv(path: &Path) -> Result<Vec<PriceBar>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;

        if record.len() < 6 {
            continue;
        }

        let field = |idx: usize, name: &str| -> Result<f64> {
            record[idx].parse().map_err(|_| {
                BacktestError::CsvError(format!("Invalid {} on row {}: {}", name, line + 1, &record[idx]))
            })
        };

        let date = parse_date(&record[0])?;
        let open = field(1, "open")?;
        let high = field(2, "high")?;
        let low = field(3, "low")?;
        let close = field(4, "close")?;
        // Volumes sometimes arrive as floats ("5000000.0")
        let volume = field(5, "volume")?.max(0.0) as u64;

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Either a bare array of bars or the `{"price_data": [...]}` payload
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBars {
    Bare(Vec<PriceBar>),
    Wrapped { price_data: Vec<PriceBar> },
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<PriceBar>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let parsed: JsonBars = serde_json::from_reader(reader)?;
    let bars = match parsed {
        JsonBars::Bare(bars) => bars,
        JsonBars::Wrapped { price_data } => price_data,
    };
    Ok(bars)
}

/// Parse a calendar day from common date and datetime formats
fn parse_date(s: &str) -> Result<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(BacktestError::CsvError(format!(
        "Unable to parse date: {}",
        s
    )))
}
