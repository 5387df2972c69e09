//! In-memory string table with CSV read/write.
//!
//! Every cell is either a string or absent. Empty strings are stored as
//! absent so that "no value" has a single representation whether a table
//! came from disk or was built in memory.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow_csv::reader::Format;
use arrow_csv::{ReaderBuilder, WriterBuilder};
use arrow_schema::{DataType, Field, Schema as ArrowSchema};

use crate::error::Result;

pub type Row = Vec<Option<String>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

fn cell(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

impl Table {
    /// Rows shorter than `columns` are padded with absent cells, longer rows are cut.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|r| {
                let mut r: Row = r.into_iter().map(cell).collect();
                r.resize(width, None);
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[i].as_deref()).collect())
    }

    /// Distinct cells of `name` in order of first appearance (absent included).
    pub fn distinct(&self, name: &str) -> Option<Vec<Option<String>>> {
        let i = self.column_index(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for r in &self.rows {
            if seen.insert(r[i].as_deref()) {
                out.push(r[i].clone());
            }
        }
        Some(out)
    }

    /// Distinct non-empty values of `name`.
    pub fn distinct_values(&self, name: &str) -> Option<Vec<String>> {
        self.distinct(name)
            .map(|v| v.into_iter().flatten().collect())
    }

    /// Rows whose `name` cell equals `value`. Unknown column selects nothing.
    pub fn select(&self, name: &str, value: Option<&str>) -> Table {
        let rows = match self.column_index(name) {
            Some(i) => self
                .rows
                .iter()
                .filter(|r| r[i].as_deref() == value)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// One table per distinct `name` cell, in order of first appearance.
    pub fn group_by(&self, name: &str) -> Option<Vec<Table>> {
        let i = self.column_index(name)?;
        let mut slots: HashMap<Option<&str>, usize> = HashMap::new();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        for r in &self.rows {
            let slot = *slots.entry(r[i].as_deref()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(r.clone());
        }
        Some(
            groups
                .into_iter()
                .map(|rows| Table {
                    columns: self.columns.clone(),
                    rows,
                })
                .collect(),
        )
    }

    /// Remove columns whose every cell is absent.
    pub fn drop_empty_columns(&mut self) {
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|i| self.rows.iter().any(|r| r[i].is_some()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        let mut k = keep.iter();
        self.columns.retain(|_| *k.next().unwrap_or(&true));
        for r in &mut self.rows {
            let mut k = keep.iter();
            r.retain(|_| *k.next().unwrap_or(&true));
        }
    }

    /// Replace or add column `name`; `values` is padded/cut to the row count.
    pub fn set_column(&mut self, name: &str, mut values: Vec<Option<String>>) {
        values.resize(self.rows.len(), None);
        let values = values.into_iter().map(cell);
        match self.column_index(name) {
            Some(i) => {
                for (r, v) in self.rows.iter_mut().zip(values) {
                    r[i] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (r, v) in self.rows.iter_mut().zip(values) {
                    r.push(v);
                }
            }
        }
    }

    /// Broadcast one value down a (new or existing) column.
    pub fn broadcast(&mut self, name: &str, value: &str) {
        let values = vec![Some(value.to_string()); self.rows.len()];
        self.set_column(name, values);
    }

    /// Concatenate `other` below this table.
    ///
    /// Columns of `other` are reordered to this table's order; columns only
    /// `other` has are appended at the end, with absent cells in prior rows.
    pub fn append(&mut self, other: &Table) {
        for c in &other.columns {
            if !self.has_column(c) {
                self.columns.push(c.clone());
                for r in &mut self.rows {
                    r.push(None);
                }
            }
        }
        let map: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        for r in &other.rows {
            self.rows
                .push(map.iter().map(|i| i.and_then(|i| r[i].clone())).collect());
        }
    }

    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut f = File::open(path)?;
        if f.metadata()?.len() == 0 {
            return Ok(Table::default());
        }

        let format = Format::default().with_header(true);
        let (inferred, _) = format.infer_schema(&mut f, Some(0))?;
        f.rewind()?;

        // every column is text, no type inference
        let columns: Vec<String> = inferred.fields().iter().map(|f| f.name().clone()).collect();
        if columns.is_empty() {
            return Ok(Table::default());
        }
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect();

        // short rows read as absent trailing cells
        let reader = ReaderBuilder::new(Arc::new(ArrowSchema::new(fields)))
            .with_format(format)
            .with_truncated_rows(true)
            .build(f)?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            let arrays: Vec<&StringArray> =
                batch.columns().iter().map(|a| a.as_string::<i32>()).collect();
            for i in 0..batch.num_rows() {
                rows.push(
                    arrays
                        .iter()
                        .map(|a| (!a.is_null(i)).then(|| a.value(i).to_string()))
                        .collect(),
                );
            }
        }
        Ok(Table::new(columns, rows))
    }

    /// Write as CSV with a header row and no index column.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut f = File::create(path)?;
        if self.columns.is_empty() {
            f.flush()?;
            return Ok(());
        }

        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = (0..self.columns.len())
            .map(|i| {
                let col: Vec<Option<&str>> = self.rows.iter().map(|r| r[i].as_deref()).collect();
                Arc::new(StringArray::from(col)) as ArrayRef
            })
            .collect();
        let batch = RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)?;

        let mut writer = WriterBuilder::new().with_header(true).build(f);
        writer.write(&batch)?;
        let mut f = writer.into_inner();
        f.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        )
    }

    #[test]
    fn empty_strings_are_absent() {
        let t = table(&["a", "b"], &[&["x", ""]]);
        assert_eq!(t.rows()[0], vec![Some("x".to_string()), None]);
    }

    #[test]
    fn distinct_keeps_first_appearance_order() {
        let t = table(&["k"], &[&["b"], &["a"], &["b"], &[""]]);
        assert_eq!(
            t.distinct("k").unwrap(),
            vec![Some("b".to_string()), Some("a".to_string()), None]
        );
        assert_eq!(t.distinct_values("k").unwrap(), vec!["b", "a"]);
        assert!(t.distinct("missing").is_none());
    }

    #[test]
    fn select_filters_rows() {
        let t = table(&["k", "v"], &[&["a", "1"], &["b", "2"], &["a", "3"]]);
        let s = t.select("k", Some("a"));
        assert_eq!(s.len(), 2);
        assert_eq!(s.column("v").unwrap(), vec![Some("1"), Some("3")]);
        assert!(t.select("nope", Some("a")).is_empty());
    }

    #[test]
    fn group_by_matches_select_per_value() {
        let t = table(&["k", "v"], &[&["b", "1"], &["a", "2"], &["", "3"], &["b", "4"]]);
        let groups = t.group_by("k").unwrap();
        let values = t.distinct("k").unwrap();
        assert_eq!(groups.len(), values.len());
        for (g, v) in groups.iter().zip(&values) {
            assert_eq!(*g, t.select("k", v.as_deref()));
        }
        assert_eq!(groups[0].column("v").unwrap(), vec![Some("1"), Some("4")]);
        assert!(t.group_by("missing").is_none());
        assert!(Table::new(vec!["k".into()], vec![]).group_by("k").unwrap().is_empty());
    }

    #[test]
    fn drop_empty_columns_removes_all_absent() {
        let mut t = table(&["a", "b", "c"], &[&["1", "", "x"], &["2", "", ""]]);
        t.drop_empty_columns();
        assert_eq!(t.columns(), ["a", "c"]);
        assert_eq!(t.rows()[1], vec![Some("2".to_string()), None]);
    }

    #[test]
    fn append_reconciles_columns() {
        let mut cache = table(&["a", "b"], &[&["1", "2"]]);
        let new = table(&["c", "b", "a"], &[&["z", "y", "x"]]);
        cache.append(&new);
        assert_eq!(cache.columns(), ["a", "b", "c"]);
        assert_eq!(cache.rows()[0], vec![Some("1".to_string()), Some("2".to_string()), None]);
        assert_eq!(
            cache.rows()[1],
            vec![Some("x".to_string()), Some("y".to_string()), Some("z".to_string())]
        );
    }

    #[test]
    fn append_onto_empty_takes_new_order() {
        let mut cache = Table::default();
        cache.append(&table(&["b", "a"], &[&["1", "2"]]));
        assert_eq!(cache.columns(), ["b", "a"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn broadcast_adds_column() {
        let mut t = table(&["a"], &[&["1"], &["2"]]);
        t.broadcast("op", "alice");
        assert_eq!(t.column("op").unwrap(), vec![Some("alice"), Some("alice")]);
    }

    #[test]
    fn csv_round_trip_keeps_text_and_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.csv");
        let t = table(
            &["Species", "Len", "Note"],
            &[&["setosa", "5.10", ""], &["versicolor", "007", "a, b"]],
        );
        t.write_csv(&p).unwrap();
        let back = Table::read_csv(&p).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn read_short_rows_pads_with_absent() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ragged.csv");
        std::fs::write(&p, "a,b,c\n1,2\n3,4,5\n").unwrap();
        let t = Table::read_csv(&p).unwrap();
        assert_eq!(t.columns(), ["a", "b", "c"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("c").unwrap(), vec![None, Some("5")]);
        assert_eq!(t.column("b").unwrap(), vec![Some("2"), Some("4")]);
    }

    #[test]
    fn read_empty_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.csv");
        std::fs::write(&p, "").unwrap();
        let t = Table::read_csv(&p).unwrap();
        assert!(t.is_empty());
        assert!(t.columns().is_empty());
    }

    #[test]
    fn read_header_only_has_columns_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("h.csv");
        std::fs::write(&p, "a,b\n").unwrap();
        let t = Table::read_csv(&p).unwrap();
        assert_eq!(t.columns(), ["a", "b"]);
        assert!(t.is_empty());
    }
}
