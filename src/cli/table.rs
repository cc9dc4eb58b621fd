use std::io::{self, Write};

use anyhow::{bail, Result};

/// Left-aligned columns separated by two spaces.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row<I, S>(&mut self, cols: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cols: Vec<String> = cols.into_iter().map(Into::into).collect();
        if cols.len() != self.headers.len() {
            bail!(
                "number of columns ({}) does not match headers ({})",
                cols.len(),
                self.headers.len()
            );
        }
        self.rows.push(cols);
        Ok(())
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, col) in widths.iter_mut().zip(row) {
                *width = (*width).max(col.chars().count());
            }
        }

        for row in std::iter::once(&self.headers).chain(&self.rows) {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(col, width)| format!("{col:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
