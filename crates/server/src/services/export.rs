//! Tabular report serialization.
//!
//! Reports are built as plain row sets ([`ReportTable`]) and handed to a
//! [`ReportSink`] that turns them into downloadable bytes. The shipped sink
//! writes RFC 4180 CSV; the HTTP layer only attaches headers around whatever
//! the sink produces.

/// A report as a named sheet of string rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    /// Sheet / dataset name (e.g. "Orders").
    pub name: &'static str,
    /// Column headers.
    pub header: Vec<&'static str>,
    /// Data rows, one `Vec<String>` per record.
    pub rows: Vec<Vec<String>>,
}

/// Serialization sink for report tables: rows in, bytes out.
pub trait ReportSink: Send + Sync {
    /// MIME type of the rendered bytes.
    fn media_type(&self) -> &'static str;

    /// File extension (without dot) for download names.
    fn extension(&self) -> &'static str;

    /// Render the table to bytes.
    fn render(&self, table: &ReportTable) -> Vec<u8>;
}

/// CSV sink (RFC 4180: CRLF rows, quotes doubled, fields quoted on demand).
pub struct CsvSink;

impl CsvSink {
    fn escape(field: &str) -> String {
        if field.contains(['"', ',', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_owned()
        }
    }

    fn write_row(out: &mut String, cells: impl Iterator<Item = String>) {
        let mut first = true;
        for cell in cells {
            if !first {
                out.push(',');
            }
            out.push_str(&Self::escape(&cell));
            first = false;
        }
        out.push_str("\r\n");
    }
}

impl ReportSink for CsvSink {
    fn media_type(&self) -> &'static str {
        "text/csv"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, table: &ReportTable) -> Vec<u8> {
        let mut out = String::new();
        Self::write_row(&mut out, table.header.iter().map(ToString::to_string));
        for row in &table.rows {
            Self::write_row(&mut out, row.iter().cloned());
        }
        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(table: &ReportTable) -> String {
        String::from_utf8(CsvSink.render(table)).expect("valid utf8")
    }

    #[test]
    fn test_plain_rows() {
        let table = ReportTable {
            name: "Orders",
            header: vec!["NO", "SKU"],
            rows: vec![vec!["1".into(), "ABC".into()]],
        };
        assert_eq!(render(&table), "NO,SKU\r\n1,ABC\r\n");
    }

    #[test]
    fn test_fields_with_commas_and_quotes_are_quoted() {
        let table = ReportTable {
            name: "Orders",
            header: vec!["Details"],
            rows: vec![
                vec!["blue, large".into()],
                vec!["said \"ok\"".into()],
                vec!["line\nbreak".into()],
            ],
        };
        assert_eq!(
            render(&table),
            "Details\r\n\"blue, large\"\r\n\"said \"\"ok\"\"\"\r\n\"line\nbreak\"\r\n"
        );
    }

    #[test]
    fn test_sink_metadata() {
        assert_eq!(CsvSink.media_type(), "text/csv");
        assert_eq!(CsvSink.extension(), "csv");
    }
}
