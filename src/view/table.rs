//! Pipe-delimited table output for query results.

use crate::model::entry::JavaLogEntry;

/// Column headers, in output order.
pub const COLUMNS: [&str; 8] = [
    "Id", "Node", "Severity", "JVM", "Timestamp", "Module", "Type", "Message",
];

const ABSENT: &str = "-";

fn header() -> String {
    format!("| {} |", COLUMNS.join(" | "))
}

fn row(record: &JavaLogEntry) -> String {
    let cells = [
        record.id().to_string(),
        record.node().to_string(),
        optional(&record.severity),
        optional(&record.jvm),
        record.timestamp().to_string(),
        optional(&record.module),
        optional(&record.log_type),
        record.message().to_string(),
    ];
    format!("| {} |", cells.join(" | "))
}

fn optional(field: &Option<String>) -> String {
    field.as_deref().unwrap_or(ABSENT).to_string()
}

/// Render `records` as a header line followed by one line per record.
pub fn render_table(records: &[JavaLogEntry]) -> String {
    let mut out = header();
    out.push('\n');
    for record in records {
        out.push_str(&row(record));
        out.push('\n');
    }
    out
}

/// Print `records` to stdout.
pub fn display_result(records: &[JavaLogEntry], database: &str) {
    log::info!("DISPLAY_RESULT database={} records={}", database, records.len());
    print!("{}", render_table(records));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{LogEntry, SourceFile};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn record(severity: Option<&str>) -> JavaLogEntry {
        JavaLogEntry {
            entry: LogEntry {
                id: Uuid::nil(),
                source_file: SourceFile {
                    file_id: Uuid::nil(),
                    path: PathBuf::from("/out/node1/svc/svc.log"),
                    archive_id: Uuid::nil(),
                },
                node: "node1".to_string(),
                timestamp: NaiveDate::from_ymd_opt(2022, 7, 11)
                    .unwrap()
                    .and_hms_opt(18, 13, 47)
                    .unwrap(),
                message: "Started".to_string(),
            },
            severity: severity.map(str::to_string),
            jvm: Some("jvm 1".to_string()),
            module: None,
            log_type: None,
        }
    }

    #[test]
    fn test_header_only_for_empty_result() {
        assert_eq!(
            render_table(&[]),
            "| Id | Node | Severity | JVM | Timestamp | Module | Type | Message |\n"
        );
    }

    #[test]
    fn test_rows_render_absent_fields_as_dash() {
        let table = render_table(&[record(Some("INFO")), record(None)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "| 00000000-0000-0000-0000-000000000000 | node1 | INFO | jvm 1 | \
             2022-07-11 18:13:47 | - | - | Started |"
        );
        assert!(lines[2].contains("| node1 | - | jvm 1 |"));
    }
}
