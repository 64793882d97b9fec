//! SQL statement rendering and the output writer.
//!
//! All quoting lives here: values are escaped by [`quote_literal`] and
//! table/column names by [`quote_identifier`], so record builders never
//! assemble SQL text themselves.

use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::entity::InsertRecord;
use crate::error::{MigrationError, Result};

/// Layout of every timestamp literal in the output
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keywords that must be quoted when used as identifiers.
const RESERVED_IDENTIFIERS: [&str; 10] = [
    "user", "order", "group", "table", "select", "where", "from", "limit", "check", "default",
];

/// Single-quote a text value, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier when it is a reserved word or not a plain
/// lowercase name.
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if plain && !RESERVED_IDENTIFIERS.contains(&name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Render one record as an `INSERT` statement.
pub fn render_insert(record: &InsertRecord) -> String {
    let columns = record
        .columns()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ");
    let values = record
        .values()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_identifier(record.table()),
        columns,
        values
    )
}

/// Writes rendered statements newline-separated, with no trailing newline.
pub struct SqlWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> SqlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write a single record as one statement line
    pub fn write(&mut self, record: &InsertRecord) -> std::io::Result<()> {
        if self.written > 0 {
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(render_insert(record).as_bytes())?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[InsertRecord]) -> std::io::Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Number of statements written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Write every record to `path`, replacing any existing file.
///
/// Statements go to a temporary file next to `path` that is renamed into
/// place once complete; on error `path` is left as it was.
pub fn write_sql_file<P: AsRef<Path>>(path: P, records: &[InsertRecord]) -> Result<usize> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(io_err)?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let mut writer = SqlWriter::new(BufWriter::new(temp.as_file_mut()));
    writer.write_all(records).map_err(io_err)?;
    let written = writer.written();
    writer.finish().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::info!(path = %path.display(), statements = written, "Wrote SQL file");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, SqlValue};
    use uuid::Uuid;

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("properties"), "properties");
        assert_eq!(quote_identifier("user_id"), "user_id");
        assert_eq!(quote_identifier("user"), "\"user\"");
        assert_eq!(quote_identifier("SendSMS"), "\"SendSMS\"");
    }

    #[test]
    fn test_render_user_insert() {
        let id = Uuid::new_v4();
        let record = InsertRecord::new(EntityKind::User, id)
            .with("name", SqlValue::Text("Admin".to_string()))
            .with("email", SqlValue::Text("admin@tms.com".to_string()));

        assert_eq!(
            render_insert(&record),
            format!(
                "INSERT INTO \"user\" (id, name, email) VALUES ('{}', 'Admin', 'admin@tms.com');",
                id
            )
        );
    }

    #[test]
    fn test_writer_joins_with_newlines() {
        let records = vec![
            InsertRecord::new(EntityKind::Penalty, Uuid::new_v4())
                .with("interest_rate", SqlValue::Integer(2)),
            InsertRecord::new(EntityKind::Penalty, Uuid::new_v4())
                .with("interest_rate", SqlValue::Null),
        ];

        let mut writer = SqlWriter::new(Vec::new());
        writer.write_all(&records).unwrap();
        assert_eq!(writer.written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("2);"));
        assert!(lines[1].ends_with("NULL);"));
        assert!(!output.ends_with('\n'));
    }

    #[test]
    fn test_write_sql_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("migration.sql");
        let records = vec![InsertRecord::new(EntityKind::Penalty, Uuid::new_v4())];

        let written = write_sql_file(&path, &records).unwrap();

        assert_eq!(written, 1);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("INSERT INTO penalties (id) VALUES ('"));
    }

    #[test]
    fn test_write_sql_file_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration.sql");
        std::fs::write(&path, "stale contents that are longer than the new file").unwrap();

        write_sql_file(&path, &[InsertRecord::new(EntityKind::Penalty, Uuid::new_v4())]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("INSERT INTO penalties"));
        assert!(!contents.contains("stale"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // a directory in the way makes the final rename fail
        let path = dir.path().join("migration.sql");
        std::fs::create_dir(&path).unwrap();

        let err = write_sql_file(&path, &[InsertRecord::new(EntityKind::Penalty, Uuid::new_v4())])
            .unwrap_err();

        assert!(matches!(err, MigrationError::Io { .. }));
        assert!(path.is_dir());
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(entries, vec![path]);
    }
}
