// src/report/csv.rs

//! Minimal delimited-text writer.

use std::io::{self, Write};

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one row, quoting only the fields that need it.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Render a header row followed by `rows`.
pub fn rows_to_string(headers: &[&str], rows: &[Vec<String>], sep: char) -> io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    write_row(&mut buf, &header, sep)?;
    for row in rows {
        write_row(&mut buf, row, sep)?;
    }

    Ok(match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_plain_fields_unquoted() {
        let mut buf = Vec::new();
        write_row(&mut buf, &row(&["a", "b c", ""]), ',').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,b c,\n");
    }

    #[test]
    fn test_special_fields_quoted() {
        let mut buf = Vec::new();
        write_row(&mut buf, &row(&["x,y", "say \"hi\"", "two\nlines"]), ',').unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\"x,y\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_header_always_written() {
        let out = rows_to_string(&["id", "text"], &[], ',').unwrap();
        assert_eq!(out, "id,text\n");
    }
}
