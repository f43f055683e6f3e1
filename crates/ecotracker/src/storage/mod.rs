//! Storage layer for ecotracker.
//!
//! History lives in a single CSV file, one row per day (see [`schema`]).
//! Saving reads the whole file, upserts by date, and rewrites it through a
//! temporary file in the same directory followed by a rename. There is no
//! locking; one writer at a time is assumed.

pub mod schema;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::activity::{Activity, ActivityRecord, Category};
use crate::calculator::{self, EmissionsBreakdown};
use crate::coefficients::CoefficientTable;
use crate::error::{Error, Result};
use crate::history::{History, HistoryRecord, SaveOutcome};

use schema::{category_column, DATE_COLUMN, DATE_FORMAT};

/// CSV-backed history of daily records.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    /// Path to the history file.
    path: PathBuf,
    /// Used to fill in totals missing from older files.
    table: CoefficientTable,
}

impl HistoryStore {
    /// Create a store for the file at `path`.
    ///
    /// Nothing is touched on disk until the first save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, table: CoefficientTable) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table,
        }
    }

    /// Get the path to the history file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all saved records.
    ///
    /// A missing file is an empty history. Unknown columns are ignored,
    /// missing activity columns read as zero, and rows with an unreadable
    /// date, a field that is not UTF-8, or a quantity the calculator would
    /// reject are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, its header cannot be
    /// read, or reading fails with an I/O error.
    pub fn load(&self) -> Result<History> {
        if !self.path.exists() {
            debug!("No history file at {}", self.path.display());
            return Ok(History::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|source| self.csv_error(source))?;

        let headers = reader
            .headers()
            .map_err(|source| self.csv_error(source))?
            .clone();
        let columns = ColumnIndex::new(&headers);

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(source) if is_row_error(&source) => {
                    warn!(
                        "Skipping row {} of {}: {}",
                        line + 2,
                        self.path.display(),
                        source
                    );
                    continue;
                }
                Err(source) => return Err(self.csv_error(source)),
            };
            match columns.parse_row(&row, &self.table) {
                Ok(record) => records.push(record),
                Err(reason) => warn!(
                    "Skipping row {} of {}: {}",
                    line + 2,
                    self.path.display(),
                    reason
                ),
            }
        }

        let history = History::from_records(records);
        debug!(
            "Loaded {} records from {}",
            history.len(),
            self.path.display()
        );
        Ok(history)
    }

    /// Save a record, overwriting any existing record for the same date.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file cannot be read or the new file
    /// cannot be written.
    pub fn save(&self, record: HistoryRecord) -> Result<SaveOutcome> {
        let mut history = self.load()?;
        let date = record.date;
        let outcome = history.upsert(record);
        self.write_all(&history)?;

        match outcome {
            SaveOutcome::Inserted => info!("Saved new entry for {date}"),
            SaveOutcome::Replaced => info!("Replaced existing entry for {date}"),
        }
        Ok(outcome)
    }

    /// Write the history as CSV to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn export_to<W: Write>(&self, writer: W) -> Result<usize> {
        let history = self.load()?;
        write_csv(&history, writer)?;
        Ok(history.len())
    }

    fn write_all(&self, history: &History) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            std::fs::create_dir_all(&parent).map_err(|source| Error::DirectoryCreate {
                path: parent.clone(),
                source,
            })?;
        }

        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        write_csv(history, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        debug!(
            "Wrote {} records to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::HistoryCsv {
            path: self.path.clone(),
            source,
        }
    }
}

/// True for errors confined to a single row, which loading skips.
fn is_row_error(error: &csv::Error) -> bool {
    matches!(
        error.kind(),
        csv::ErrorKind::Utf8 { .. } | csv::ErrorKind::UnequalLengths { .. }
    )
}

/// Serialize `history` in the fixed column layout.
fn write_csv<W: Write>(history: &History, writer: W) -> Result<()> {
    let header = schema::header();
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&header)?;

    for record in history {
        let mut row: Vec<String> = Vec::with_capacity(header.len());
        row.push(record.date.format(DATE_FORMAT).to_string());
        row.extend(
            Activity::ALL
                .iter()
                .map(|a| record.inputs.quantity(*a).to_string()),
        );
        row.extend(
            Category::ALL
                .iter()
                .map(|c| record.breakdown.category(*c).to_string()),
        );
        row.push(record.total().to_string());
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Header name → position lookup for a loaded file.
struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        Self {
            positions: headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), i))
                .collect(),
        }
    }

    fn field<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|i| row.get(*i))
            .filter(|value| !value.is_empty())
    }

    fn number(&self, row: &StringRecord, column: &str) -> std::result::Result<Option<f64>, String> {
        self.field(row, column)
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| format!("{column} is not a number: {raw}"))
            })
            .transpose()
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        table: &CoefficientTable,
    ) -> std::result::Result<HistoryRecord, String> {
        let raw_date = self
            .field(row, DATE_COLUMN)
            .ok_or_else(|| "missing date".to_string())?;
        // Older files wrote full timestamps; the day is the first ten characters
        let date = raw_date
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, DATE_FORMAT).ok())
            .ok_or_else(|| format!("unreadable date: {raw_date}"))?;

        let mut inputs = ActivityRecord::new();
        for activity in Activity::ALL {
            if let Some(quantity) = self.number(row, activity.key())? {
                inputs.set(activity.key(), quantity);
            }
        }

        let invalid = inputs.invalid_fields();
        if !invalid.is_empty() {
            return Err(format!("invalid quantity for {}", invalid.join(", ")));
        }

        let mut sums = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            match self.number(row, category_column(category))? {
                Some(sum) if !sum.is_finite() || sum < 0.0 => {
                    return Err(format!("invalid {}: {sum}", category_column(category)));
                }
                Some(sum) => sums.push((category, sum)),
                None => break,
            }
        }

        let breakdown = if sums.len() == Category::ALL.len() {
            EmissionsBreakdown::from_categories(sums)
        } else {
            calculator::calculate(&inputs, table).map_err(|e| e.to_string())?
        };

        Ok(HistoryRecord::new(date, inputs, breakdown))
    }
}
