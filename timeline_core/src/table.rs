use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::timeval;
use crate::util::unique_in_order;
use crate::value::Cell;

/// Column used for the raw clock string in every event table.
pub const TIME_STR_COLUMN: &str = "time_str";
/// Column appended by [`EventTable::attach_times`] holding the normalized
/// numeric offset.
pub const TIME_COLUMN: &str = "time";

/// Declarative description of one delimited source table: where it lives,
/// whether the file was found during pre-flight, which source columns to
/// read and what to rename them to, and which columns must be read as text
/// even when their values look numeric.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub path: PathBuf,
    pub available: bool,
    /// Ordered (source column, target column) pairs.
    pub columns: Vec<(&'static str, &'static str)>,
    /// Source columns exempt from numeric inference.
    pub text_columns: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?} is missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: String },
}

/// In-memory, column-renamed event table. Rows are opaque until the
/// event-map pass attaches entity semantics.
#[derive(Debug, Clone)]
pub struct EventTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl EventTable {
    /// Table with zero rows but the full target column set, so downstream
    /// stages never special-case a missing source.
    pub fn empty(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Read the table described by `spec`, or synthesize an empty one when
    /// the source file was not found.
    pub fn load(spec: &TableSpec) -> Result<Self, TableError> {
        let targets: Vec<&str> = spec.columns.iter().map(|(_, tgt)| *tgt).collect();
        if !spec.available {
            tracing::warn!(
                target: "timeline::loader",
                table = spec.name,
                path = %spec.path.display(),
                "source file not available, generating empty table"
            );
            return Ok(Self::empty(spec.name, &targets));
        }

        tracing::info!(
            target: "timeline::loader",
            table = spec.name,
            path = %spec.path.display(),
            "extracting source table"
        );
        for (source, target) in &spec.columns {
            tracing::debug!(
                target: "timeline::loader",
                table = spec.name,
                "column {source} mapped to {target}"
            );
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&spec.path)
            .map_err(|source| TableError::Read {
                path: spec.path.clone(),
                source,
            })?;

        let headers = reader
            .headers()
            .map_err(|source| TableError::Read {
                path: spec.path.clone(),
                source,
            })?
            .clone();

        let mut indices = Vec::with_capacity(spec.columns.len());
        for (source, _) in &spec.columns {
            let idx = headers
                .iter()
                .position(|h| h.trim() == *source)
                .ok_or_else(|| TableError::MissingColumn {
                    path: spec.path.clone(),
                    column: source.to_string(),
                })?;
            indices.push(idx);
        }

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            // The record directly under the header carries units, not data.
            if row_idx == 0 {
                continue;
            }
            let record = record.map_err(|source| TableError::Read {
                path: spec.path.clone(),
                source,
            })?;
            let mut row = Vec::with_capacity(indices.len());
            for ((source, _), idx) in spec.columns.iter().zip(&indices) {
                let raw = record.get(*idx).unwrap_or("");
                let cell = if spec.text_columns.contains(source) {
                    Cell::text(raw)
                } else {
                    Cell::parse(raw)
                };
                row.push(cell);
            }
            rows.push(row);
        }

        tracing::info!(
            target: "timeline::loader",
            table = spec.name,
            rows = rows.len(),
            "source table loaded"
        );
        Ok(Self {
            name: spec.name.to_string(),
            columns: targets.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    /// Append the normalized `time` column derived from `time_str`.
    /// Unparseable clock strings are logged and mapped to 0.0 so the run
    /// stays best-effort.
    pub fn attach_times(&mut self, zero_hour: f64) {
        let idx = match self.col_index(TIME_STR_COLUMN) {
            Some(idx) => idx,
            None => return,
        };
        for row in &mut self.rows {
            let clock = row[idx].render();
            let value = match timeval::normalise_clock(&clock, zero_hour) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(
                        target: "timeline::loader",
                        table = %self.name,
                        error = %err,
                        "time normalisation failed, using 0.0"
                    );
                    0.0
                }
            };
            row.push(Cell::Num(value));
        }
        self.columns.push(TIME_COLUMN.to_string());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.col_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Overwrite one cell. Unknown rows or columns are ignored.
    pub fn set_cell(&mut self, row: usize, column: &str, value: Cell) {
        if let Some(idx) = self.col_index(column) {
            if let Some(r) = self.rows.get_mut(row) {
                r[idx] = value;
            }
        }
    }

    /// Append one row; its cells must align with [`EventTable::columns`].
    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// All cells of one column in row order. An unknown column yields an
    /// empty slice, matching the empty-table contract.
    pub fn column_cells(&self, name: &str) -> Vec<&Cell> {
        match self.col_index(name) {
            Some(idx) => self.rows.iter().map(|r| &r[idx]).collect(),
            None => Vec::new(),
        }
    }

    /// Distinct rendered values of a column, first-appearance order,
    /// missing cells skipped.
    pub fn distinct_rendered(&self, name: &str) -> Vec<String> {
        unique_in_order(
            self.column_cells(name)
                .into_iter()
                .filter(|cell| !cell.is_missing())
                .map(Cell::render),
        )
    }

    /// Drop every row whose flag in `keep` is false. `keep` must be
    /// row-aligned.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.rows.len());
        let mut it = keep.iter();
        self.rows.retain(|_| *it.next().unwrap_or(&true));
    }

    /// Keep only rows whose rendered cell in `column` equals `value`.
    pub fn filter_equals(&mut self, column: &str, value: &str) {
        let idx = match self.col_index(column) {
            Some(idx) => idx,
            None => return,
        };
        self.rows.retain(|row| row[idx].render() == value);
    }

    /// Overwrite (or add) a column holding one constant value.
    pub fn set_constant(&mut self, column: &str, value: Cell) {
        match self.col_index(column) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Copy the values of `source` into `dest`, adding `dest` if absent.
    pub fn copy_column(&mut self, source: &str, dest: &str) {
        let src_idx = match self.col_index(source) {
            Some(idx) => idx,
            None => return,
        };
        match self.col_index(dest) {
            Some(dst_idx) => {
                for row in &mut self.rows {
                    row[dst_idx] = row[src_idx].clone();
                }
            }
            None => {
                self.columns.push(dest.to_string());
                for row in &mut self.rows {
                    let value = row[src_idx].clone();
                    row.push(value);
                }
            }
        }
    }

    /// Keep only the last occurrence per distinct value of `column`,
    /// preserving the order of the surviving rows.
    pub fn dedup_keep_last(&mut self, column: &str) {
        let idx = match self.col_index(column) {
            Some(idx) => idx,
            None => return,
        };
        let mut last_for: HashMap<String, usize> = HashMap::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            last_for.insert(row[idx].render(), row_idx);
        }
        let keep: Vec<bool> = self
            .rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| last_for.get(&row[idx].render()) == Some(&row_idx))
            .collect();
        self.retain_rows(&keep);
    }

    /// Row-wise concatenation over the union of both column sets; cells
    /// absent from one side become missing values.
    pub fn concat(name: &str, first: &EventTable, second: &EventTable) -> EventTable {
        let mut columns: Vec<String> = first.columns.clone();
        for col in &second.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        let mut rows = Vec::with_capacity(first.len() + second.len());
        for source in [first, second] {
            for row_idx in 0..source.len() {
                let row = columns
                    .iter()
                    .map(|col| {
                        source
                            .col_index(col)
                            .map(|idx| source.rows[row_idx][idx].clone())
                            .unwrap_or(Cell::Missing)
                    })
                    .collect();
                rows.push(row);
            }
        }
        EventTable {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    /// Pre-index rows by the rendered value of `column`, so per-entity
    /// extraction is a lookup instead of a full-table scan.
    pub fn group_index(&self, column: &str) -> HashMap<String, Vec<usize>> {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        if let Some(idx) = self.col_index(column) {
            for (row_idx, row) in self.rows.iter().enumerate() {
                groups.entry(row[idx].render()).or_default().push(row_idx);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(columns: &[&str], rows: &[&[Cell]]) -> EventTable {
        let mut out = EventTable::empty("test_table", columns);
        for row in rows {
            out.rows.push(row.to_vec());
        }
        out
    }

    fn num(v: f64) -> Cell {
        Cell::Num(v)
    }

    fn text(v: &str) -> Cell {
        Cell::Text(v.to_string())
    }

    #[test]
    fn load_renames_and_skips_units_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Time,UnitID,UnitLongitude,Fire").unwrap();
        writeln!(file, "hh:mm:ss,-,deg,-").unwrap();
        writeln!(file, "00:00:01.500,U1,3.5,1").unwrap();
        writeln!(file, "00:00:02.100,U2,4.5,").unwrap();
        drop(file);

        let spec = TableSpec {
            name: "move_table",
            path,
            available: true,
            columns: vec![
                ("Time", "time_str"),
                ("UnitID", "id"),
                ("UnitLongitude", "x"),
                ("Fire", "fire_detail"),
            ],
            text_columns: vec!["Fire"],
        };
        let mut loaded = EventTable::load(&spec).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.columns(), &["time_str", "id", "x", "fire_detail"]);
        assert_eq!(loaded.cell(0, "x"), Some(&num(3.5)));
        // Forced-text override keeps "1" textual.
        assert_eq!(loaded.cell(0, "fire_detail"), Some(&text("1")));
        assert_eq!(loaded.cell(1, "fire_detail"), Some(&Cell::Missing));

        loaded.attach_times(0.0);
        assert_eq!(loaded.cell(0, "time"), Some(&num(1.0)));
        assert_eq!(loaded.cell(1, "time"), Some(&num(2.0)));
    }

    #[test]
    fn load_missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pos.csv");
        std::fs::write(&path, "Time,UnitID\nhh:mm:ss,-\n00:00:01,U1\n").unwrap();
        let spec = TableSpec {
            name: "move_table",
            path,
            available: true,
            columns: vec![("Time", "time_str"), ("NoSuchColumn", "x")],
            text_columns: vec![],
        };
        match EventTable::load(&spec) {
            Err(TableError::MissingColumn { column, .. }) => assert_eq!(column, "NoSuchColumn"),
            other => panic!("expected missing column error, got {other:?}"),
        }
    }

    #[test]
    fn unavailable_source_yields_empty_table_with_columns() {
        let spec = TableSpec {
            name: "spot_table",
            path: PathBuf::from("/nowhere/spots.csv"),
            available: false,
            columns: vec![("Time", "time_str"), ("TargetID", "spotted_id")],
            text_columns: vec![],
        };
        let mut loaded = EventTable::load(&spec).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.columns(), &["time_str", "spotted_id"]);
        loaded.attach_times(0.0);
        assert_eq!(loaded.columns(), &["time_str", "spotted_id", "time"]);
    }

    #[test]
    fn filter_and_dedup_last() {
        let mut t = table(
            &["victim_id", "reason"],
            &[
                &[text("U1"), text("sunk")],
                &[text("U2"), text("fire")],
                &[text("U1"), text("flood")],
            ],
        );
        t.dedup_keep_last("victim_id");
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(0, "victim_id"), Some(&text("U2")));
        assert_eq!(t.cell(1, "reason"), Some(&text("flood")));

        t.filter_equals("victim_id", "U1");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn concat_unions_columns_with_missing_fill() {
        let a = table(&["id", "range"], &[&[text("U1"), num(4.0)]]);
        let b = table(&["id", "cause"], &[&[text("U2"), text("fire")]]);
        let merged = EventTable::concat("merged", &a, &b);
        assert_eq!(merged.columns(), &["id", "range", "cause"]);
        assert_eq!(merged.cell(0, "cause"), Some(&Cell::Missing));
        assert_eq!(merged.cell(1, "range"), Some(&Cell::Missing));
        assert_eq!(merged.cell(1, "cause"), Some(&text("fire")));
    }

    #[test]
    fn group_index_keys_by_rendered_value() {
        let t = table(
            &["id"],
            &[&[num(7.0)], &[text("7")], &[text("U1")], &[num(7.0)]],
        );
        let groups = t.group_index("id");
        // Numeric and textual "7" render identically, so they group together.
        assert_eq!(groups.get("7"), Some(&vec![0, 1, 3]));
        assert_eq!(groups.get("U1"), Some(&vec![2]));
    }
}
