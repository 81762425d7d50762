//! CSV and JSON export of characterization results.
//!
//! CSV files are column-per-series: one header row naming each series, then
//! one row per index. Series shorter than the longest one leave their trailing
//! cells empty.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::characterize::{BufferTraces, CggCurve, IdVdCurves, IdVgCurves, TranTrace};
use crate::error::{with_err_context, ErrorContext, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(&mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> &mut Self {
        self.headers.push(name.into());
        self.columns.push(values.into());
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn num_rows(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(w);
        writer.write_record(&self.headers)?;
        for i in 0..self.num_rows() {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|c| c.get(i).map(f64::to_string).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write_csv_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = crate::io::create_file(path)?;
        with_err_context(self.write_csv(file), || {
            ErrorContext::CreateFile(path.to_path_buf())
        })
    }
}

/// Results that can be laid out as a [`Table`].
pub trait ToTable {
    fn to_table(&self) -> Table;
}

impl ToTable for CggCurve {
    fn to_table(&self) -> Table {
        let mut t = Table::new();
        t.column("vg", self.vg.clone()).column("cgg", self.cgg.clone());
        t
    }
}

impl ToTable for IdVdCurves {
    fn to_table(&self) -> Table {
        let mut t = Table::new();
        t.column("vd", self.vd.clone());
        for c in self.curves.iter() {
            t.column(format!("id_ua@vg={}", c.bias), c.id_ua.clone());
        }
        t
    }
}

impl ToTable for IdVgCurves {
    fn to_table(&self) -> Table {
        let mut t = Table::new();
        t.column("vg", self.vg.clone());
        for c in self.curves.iter() {
            t.column(format!("id_ua@vd={}", c.bias), c.id_ua.clone());
        }
        for c in self.curves.iter() {
            t.column(format!("log_id@vd={}", c.bias), c.log_id.clone());
        }
        t
    }
}

impl ToTable for TranTrace {
    fn to_table(&self) -> Table {
        let mut t = Table::new();
        t.column("time", self.time.clone())
            .column("v(out)", self.out.clone());
        if let Some(ref input) = self.input {
            t.column("v(in)", input.clone());
        }
        t
    }
}

impl ToTable for BufferTraces {
    fn to_table(&self) -> Table {
        let mut t = Table::new();
        for (c_eq, trace) in self.c_eq.iter().zip(self.traces.iter()) {
            t.column(format!("time@ceq={c_eq}"), trace.time.clone())
                .column(format!("v(out)@ceq={c_eq}"), trace.out.clone());
        }
        t
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json_file<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = crate::io::create_file(path)?;
    with_err_context(serde_json::to_writer_pretty(file, value), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })
}

/// Serde adapter for float series that may hold `-inf`, `inf` or `NaN`.
///
/// JSON has no literal for these, so they are written as the strings
/// `"-inf"`, `"inf"` and `"NaN"`. Finite entries stay numbers.
pub mod non_finite {
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(f64),
        Text(String),
    }

    fn name(value: f64) -> &'static str {
        if value.is_nan() {
            "NaN"
        } else if value > 0.0 {
            "inf"
        } else {
            "-inf"
        }
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for &value in values {
            if value.is_finite() {
                seq.serialize_element(&value)?;
            } else {
                seq.serialize_element(name(value))?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Entry>::deserialize(deserializer)?
            .into_iter()
            .map(|entry| match entry {
                Entry::Number(value) => Ok(value),
                Entry::Text(text) => match text.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("invalid float: {other:?}"))),
                },
            })
            .collect()
    }
}
