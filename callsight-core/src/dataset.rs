//! Call-center dataset loading and persistence.
//!
//! The loader reads the CSV, normalizes the duration, rating and resolved
//! columns, fits the Agent and Topic encoders and returns the encoded table.
//! Columns other than the six it understands are carried through as raw
//! strings so a rewrite keeps them.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::duration::{format_duration, parse_duration};
use crate::encoder::LabelEncoder;
use crate::error::{CallsightError, Result};

pub const COL_AGENT: &str = "Agent";
pub const COL_TOPIC: &str = "Topic";
pub const COL_SPEED: &str = "Speed of answer in seconds";
pub const COL_DURATION: &str = "AvgTalkDuration";
pub const COL_RESOLVED: &str = "Resolved";
pub const COL_RATING: &str = "Satisfaction rating";

pub const MAX_RATING: u8 = 5;

/// Where a CSV column's value lives in a [`SessionRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Agent,
    Topic,
    Speed,
    Duration,
    Resolved,
    Rating,
    Extra(usize),
}

impl Column {
    fn from_header(name: &str, extra_count: &mut usize) -> Self {
        match name {
            COL_AGENT => Column::Agent,
            COL_TOPIC => Column::Topic,
            COL_SPEED => Column::Speed,
            COL_DURATION => Column::Duration,
            COL_RESOLVED => Column::Resolved,
            COL_RATING => Column::Rating,
            _ => {
                let idx = *extra_count;
                *extra_count += 1;
                Column::Extra(idx)
            }
        }
    }
}

/// One call-center interaction with Agent and Topic encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub agent: u32,
    pub topic: u32,
    /// `None` for unanswered calls with an empty cell.
    pub speed_of_answer: Option<u32>,
    /// Total seconds; `None` for an empty cell.
    pub avg_talk_duration: Option<f64>,
    /// `None` when the cell is empty (rows added from the dashboard).
    pub resolved: Option<bool>,
    /// 1–5, or 0 when unrated.
    pub satisfaction_rating: u8,
    pub extra: Vec<String>,
}

/// The encoded table in file order, plus the header layout it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTable {
    headers: Vec<String>,
    columns: Vec<Column>,
    extra_count: usize,
    records: Vec<SessionRecord>,
}

impl SessionTable {
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record at the end; extra columns are padded with empty cells.
    pub fn push(&mut self, mut record: SessionRecord) {
        record.extra.resize(self.extra_count, String::new());
        self.records.push(record);
    }
}

/// A loaded dataset: the encoded table, both fitted encoders and the file
/// it came from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: SessionTable,
    pub agents: LabelEncoder,
    pub topics: LabelEncoder,
    path: PathBuf,
}

/// Load and encode the dataset at `path`.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = Dataset::from_reader(file, path)?;
    tracing::info!(
        "Loaded {} sessions from {} ({} agents, {} topics)",
        dataset.table.len(),
        path.display(),
        dataset.agents.len(),
        dataset.topics.len()
    );
    Ok(dataset)
}

impl Dataset {
    /// Parse CSV content; `path` is recorded as the file [`Dataset::save`]
    /// writes back to.
    pub fn from_reader<R: Read>(reader: R, path: impl Into<PathBuf>) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut extra_count = 0;
        let columns: Vec<Column> = headers
            .iter()
            .map(|h| Column::from_header(h, &mut extra_count))
            .collect();

        for (required, column) in [
            (COL_AGENT, Column::Agent),
            (COL_TOPIC, Column::Topic),
            (COL_SPEED, Column::Speed),
            (COL_DURATION, Column::Duration),
            (COL_RESOLVED, Column::Resolved),
            (COL_RATING, Column::Rating),
        ] {
            if !columns.contains(&column) {
                return Err(CallsightError::MissingColumn(required));
            }
        }

        let rows: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;

        let position = |column: Column| columns.iter().position(|c| *c == column);
        let agent_pos = position(Column::Agent).ok_or(CallsightError::MissingColumn(COL_AGENT))?;
        let topic_pos = position(Column::Topic).ok_or(CallsightError::MissingColumn(COL_TOPIC))?;

        for (i, row) in rows.iter().enumerate() {
            for (pos, column) in [(agent_pos, COL_AGENT), (topic_pos, COL_TOPIC)] {
                if row.get(pos).unwrap_or("").is_empty() {
                    return Err(invalid(i + 1, column, "", "category must not be empty"));
                }
            }
        }

        let agents = LabelEncoder::fit(COL_AGENT, rows.iter().map(|r| &r[agent_pos]));
        let topics = LabelEncoder::fit(COL_TOPIC, rows.iter().map(|r| &r[topic_pos]));

        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| parse_row(i + 1, row, &columns, extra_count, &agents, &topics))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            table: SessionTable {
                headers,
                columns,
                extra_count,
                records,
            },
            agents,
            topics,
            path: path.into(),
        })
    }

    /// Rewrite the backing file with the full table.
    ///
    /// The file keeps the schema it was read with: category names, `HH:MM:SS`
    /// durations, `Y`/`N` resolved, and an empty cell for rating 0. The new
    /// content is written to a sibling temp file and renamed into place; the
    /// replaced file's permissions carry over.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_csv(&mut tmp)?;
        if let Ok(meta) = std::fs::metadata(&self.path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CallsightError::Io(e.error))?;

        tracing::info!(
            "Wrote {} sessions to {}",
            self.table.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Serialize the table in its original column layout.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.table.headers)?;

        for record in &self.table.records {
            let mut cells = Vec::with_capacity(self.table.columns.len());
            for column in &self.table.columns {
                let cell = match column {
                    Column::Agent => self.agents.inverse_transform(record.agent)?.to_string(),
                    Column::Topic => self.topics.inverse_transform(record.topic)?.to_string(),
                    Column::Speed => record
                        .speed_of_answer
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    Column::Duration => record
                        .avg_talk_duration
                        .map(format_duration)
                        .unwrap_or_default(),
                    Column::Resolved => match record.resolved {
                        Some(true) => "Y".to_string(),
                        Some(false) => "N".to_string(),
                        None => String::new(),
                    },
                    Column::Rating => match record.satisfaction_rating {
                        0 => String::new(),
                        r => r.to_string(),
                    },
                    Column::Extra(idx) => record.extra.get(*idx).cloned().unwrap_or_default(),
                };
                cells.push(cell);
            }
            wtr.write_record(&cells)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn invalid(row: usize, column: &'static str, value: &str, reason: impl Into<String>) -> CallsightError {
    CallsightError::InvalidField {
        row,
        column,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_row(
    row_no: usize,
    row: &csv::StringRecord,
    columns: &[Column],
    extra_count: usize,
    agents: &LabelEncoder,
    topics: &LabelEncoder,
) -> Result<SessionRecord> {
    let mut record = SessionRecord {
        agent: 0,
        topic: 0,
        speed_of_answer: None,
        avg_talk_duration: None,
        resolved: None,
        satisfaction_rating: 0,
        extra: vec![String::new(); extra_count],
    };

    for (column, cell) in columns.iter().zip(row.iter()) {
        match column {
            Column::Agent => record.agent = agents.transform(cell)?,
            Column::Topic => record.topic = topics.transform(cell)?,
            Column::Speed => {
                if !cell.trim().is_empty() {
                    let speed = cell
                        .trim()
                        .parse::<u32>()
                        .map_err(|e| invalid(row_no, COL_SPEED, cell, e.to_string()))?;
                    record.speed_of_answer = Some(speed);
                }
            }
            Column::Duration => {
                if !cell.trim().is_empty() {
                    let seconds = parse_duration(cell).map_err(|source| CallsightError::Duration {
                        row: row_no,
                        source,
                    })?;
                    record.avg_talk_duration = Some(seconds);
                }
            }
            Column::Resolved => {
                record.resolved = match cell.trim() {
                    "Y" => Some(true),
                    "N" => Some(false),
                    "" => None,
                    _ => return Err(invalid(row_no, COL_RESOLVED, cell, "expected Y or N")),
                };
            }
            Column::Rating => {
                if !cell.trim().is_empty() {
                    let rating = cell
                        .trim()
                        .parse::<u8>()
                        .map_err(|e| invalid(row_no, COL_RATING, cell, e.to_string()))?;
                    if rating > MAX_RATING {
                        return Err(invalid(row_no, COL_RATING, cell, "rating must be 0-5"));
                    }
                    record.satisfaction_rating = rating;
                }
            }
            Column::Extra(idx) => record.extra[*idx] = cell.to_string(),
        }
    }

    Ok(record)
}
