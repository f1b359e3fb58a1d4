//! Spreadsheet reading via `calamine`.
//!
//! Only the first worksheet is read. The first row is the header; each column
//! gets the narrowest dtype that holds all of its non-empty cells.

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{ProfilerError, Result};

/// Read the first worksheet of an xlsx/xls workbook into a DataFrame.
pub fn read_excel(bytes: Vec<u8>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ProfilerError::Excel("workbook has no worksheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names = header_names(header);
    let body: Vec<&[Data]> = rows.collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            build_column(name, &cells).into_column()
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

/// Header row to column names.
///
/// Real headers keep their text; blank or repeated ones become the first free
/// `column_<n>`, starting at their 1-based position.
fn header_names(header: &[Data]) -> Vec<String> {
    let texts: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    let mut taken = HashSet::new();
    let keep: Vec<bool> = texts
        .iter()
        .map(|text| !text.is_empty() && taken.insert(text.clone()))
        .collect();

    texts
        .into_iter()
        .zip(keep)
        .enumerate()
        .map(|(idx, (text, keep))| {
            if keep {
                return text;
            }
            let mut n = idx + 1;
            loop {
                let candidate = format!("column_{n}");
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
                n += 1;
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    Datetime,
    Text,
}

fn cell_kind(cell: &Data) -> Option<CellKind> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Int(_) => Some(CellKind::Int),
        Data::Float(_) => Some(CellKind::Float),
        Data::Bool(_) => Some(CellKind::Bool),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(CellKind::Datetime),
        _ => Some(CellKind::Text),
    }
}

fn column_kind(cells: &[&Data]) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells {
        let Some(next) = cell_kind(cell) else {
            continue;
        };
        kind = Some(match (kind, next) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CellKind::Int), CellKind::Float) | (Some(CellKind::Float), CellKind::Int) => {
                CellKind::Float
            }
            _ => return CellKind::Text,
        });
    }
    kind.unwrap_or(CellKind::Text)
}

fn build_column(name: &str, cells: &[&Data]) -> Series {
    let name: PlSmallStr = name.into();
    match column_kind(cells) {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        CellKind::Datetime => {
            let values: Vec<Option<NaiveDateTime>> =
                cells.iter().map(|c| cell_datetime(c)).collect();
            Series::new(name, values)
        }
        CellKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Data::Empty | Data::Error(_) => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(name, values)
        }
    }
}

/// Serial date cells and ISO 8601 strings; a bare date means midnight.
fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(text) => text.parse::<NaiveDateTime>().ok().or_else(|| {
            text.parse::<NaiveDate>()
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }),
        _ => None,
    }
}
