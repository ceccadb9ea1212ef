use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{ensure, Result};
use itertools::Itertools;

use crate::compression::encode;

/// Delimited text table with a fixed header. Fields containing the delimiter or quotes are quoted.
pub struct Writer<W: Write> {
    writer: W,
    delimiter: char,
    columns: usize,
}

impl Writer<encode::Stream<BufWriter<File>>> {
    pub fn from_path(path: impl AsRef<Path>, delimiter: char, header: &[&str]) -> Result<Self> {
        Self::new(encode::infer_from_path(path)?, delimiter, header)
    }

    pub fn finish(self) -> Result<()> {
        self.writer.finish()?;
        Ok(())
    }
}

impl<W: Write> Writer<W> {
    pub fn new(writer: W, delimiter: char, header: &[&str]) -> Result<Self> {
        ensure!(!header.is_empty(), "Table header can't be empty");
        let mut slf = Self {
            writer,
            delimiter,
            columns: header.len(),
        };
        slf.write_row(header)?;
        Ok(slf)
    }

    pub fn write_row<T: AsRef<str>>(&mut self, fields: &[T]) -> Result<()> {
        ensure!(
            fields.len() == self.columns,
            "Expected {} fields, got {}",
            self.columns,
            fields.len()
        );
        let line = fields
            .iter()
            .map(|x| self.escape(x.as_ref()))
            .join(&self.delimiter.to_string());
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn escape(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}
