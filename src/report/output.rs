//! Rendering of report rows as text or JSON.

use std::io::Write;

use crate::cli::ReportFormat;

use super::format::{is_blank_row, ReportRow};

/// Writes rows as text, one line per row with cells concatenated.
pub fn write_text<W: Write>(out: &mut W, rows: &[ReportRow]) -> std::io::Result<()> {
    for row in rows {
        if is_blank_row(row) {
            writeln!(out)?;
        } else {
            writeln!(out, "{}", row.concat())?;
        }
    }
    Ok(())
}

/// Writes rows as a JSON array of string arrays. Blank rows become `[]`.
pub fn write_json<W: Write>(out: &mut W, rows: &[ReportRow]) -> anyhow::Result<()> {
    let rows: Vec<&[String]> = rows
        .iter()
        .map(|row| if is_blank_row(row) { &row[..0] } else { &row[..] })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)?;
    Ok(())
}

/// Writes rows in `format`.
pub fn write_report<W: Write>(out: &mut W, rows: &[ReportRow], format: ReportFormat) -> anyhow::Result<()> {
    match format {
        ReportFormat::Text => write_text(out, rows)?,
        ReportFormat::Json => write_json(out, rows)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::format::{blank_row, title_row};

    #[test]
    fn test_write_text() {
        let rows = vec![
            title_row("Total RAM by Category:"),
            blank_row(),
            vec!["a".to_string(), "b".to_string()],
        ];
        let mut out = Vec::new();
        write_text(&mut out, &rows).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Total RAM by Category:\n\nab\n"
        );
    }

    #[test]
    fn test_write_json() {
        let rows = vec![title_row("x"), blank_row()];
        let mut out = Vec::new();
        write_report(&mut out, &rows, ReportFormat::Json).expect("write");
        let parsed: Vec<Vec<String>> =
            serde_json::from_slice(&out).expect("valid json");
        assert_eq!(parsed, vec![vec!["x".to_string()], Vec::new()]);
    }
}
