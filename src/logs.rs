use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::trace;

use crate::db::now_utc_rfc3339;
use crate::error::{Missing, StoreError};
use crate::store::Store;

/// One captured output line, ordered within its `(event, stream)` pair.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogLine {
    pub id: i64,
    pub event_id: i64,
    pub stream: String,
    pub line: String,
    pub line_number: i64,
    pub created_at: String,
}

impl Store {
    /// Append one output line to an event's stream.
    ///
    /// Line numbers per `(event, stream)` are contiguous from 1. The number
    /// is allocated and the row inserted inside one immediate transaction,
    /// so concurrent appenders to the same stream serialize instead of
    /// colliding or leaving gaps.
    pub fn append_line(
        &mut self,
        event_id: i64,
        stream: &str,
        line: &str,
    ) -> Result<LogLine, StoreError> {
        let created_at = now_utc_rfc3339();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let event_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM events WHERE id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .optional()?;
        if event_exists.is_none() {
            return Err(StoreError::NotFound(Missing::Event(event_id)));
        }

        let line_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(line_number), 0) + 1 FROM logs
             WHERE event_id = ?1 AND stream = ?2",
            params![event_id, stream],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO logs (event_id, stream, line, line_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![event_id, stream, line, line_number, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        trace!(event_id, stream, line_number, "appended log line");
        Ok(LogLine {
            id,
            event_id,
            stream: stream.to_string(),
            line: line.to_string(),
            line_number,
            created_at,
        })
    }

    /// Read an event's lines in order, optionally narrowed to one stream.
    ///
    /// Reads are stateless; an event with no lines yields an empty vec.
    pub fn read_lines(
        &self,
        event_id: i64,
        stream: Option<&str>,
    ) -> Result<Vec<LogLine>, StoreError> {
        let (sql, values): (&str, Vec<Box<dyn rusqlite::types::ToSql>>) = match stream {
            Some(stream) => (
                "SELECT id, event_id, stream, line, line_number, created_at
                 FROM logs WHERE event_id = ?1 AND stream = ?2 ORDER BY line_number",
                vec![Box::new(event_id), Box::new(stream.to_string())],
            ),
            None => (
                "SELECT id, event_id, stream, line, line_number, created_at
                 FROM logs WHERE event_id = ?1 ORDER BY stream, line_number",
                vec![Box::new(event_id)],
            ),
        };
        let value_refs: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|value| value.as_ref()).collect();

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(value_refs.as_slice(), |row| {
            Ok(LogLine {
                id: row.get(0)?,
                event_id: row.get(1)?,
                stream: row.get(2)?,
                line: row.get(3)?,
                line_number: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Missing, StoreError};
    use crate::store::Store;

    fn store_with_event() -> (Store, i64) {
        let mut store = Store::open_in_memory().expect("store should open");
        let repo = store.register_repo("app", "/repos/app", None).unwrap();
        let event = store
            .record_event(repo.id, None, "build_started", None)
            .unwrap();
        (store, event.id)
    }

    #[test]
    fn numbering_starts_at_one_and_is_contiguous() {
        let (mut store, event_id) = store_with_event();

        store.append_line(event_id, "stdout", "compiling").unwrap();
        store.append_line(event_id, "stdout", "linking").unwrap();
        store.append_line(event_id, "stdout", "done").unwrap();

        let lines = store.read_lines(event_id, Some("stdout")).unwrap();
        let numbers: Vec<i64> = lines.iter().map(|line| line.line_number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        let texts: Vec<&str> = lines.iter().map(|line| line.line.as_str()).collect();
        assert_eq!(texts, ["compiling", "linking", "done"]);
    }

    #[test]
    fn streams_number_independently() {
        let (mut store, event_id) = store_with_event();

        store.append_line(event_id, "stdout", "ok").unwrap();
        store.append_line(event_id, "stderr", "warning: dusty").unwrap();
        store.append_line(event_id, "stdout", "done").unwrap();

        let stdout = store.read_lines(event_id, Some("stdout")).unwrap();
        assert_eq!(
            stdout.iter().map(|l| l.line_number).collect::<Vec<_>>(),
            [1, 2]
        );

        let stderr = store.read_lines(event_id, Some("stderr")).unwrap();
        assert_eq!(
            stderr.iter().map(|l| l.line_number).collect::<Vec<_>>(),
            [1]
        );

        let all = store.read_lines(event_id, None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn append_to_unknown_event_fails() {
        let mut store = Store::open_in_memory().expect("store should open");

        let err = store.append_line(12, "stdout", "nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Missing::Event(12))));
    }

    #[test]
    fn reading_an_event_with_no_lines_is_empty_not_an_error() {
        let (store, event_id) = store_with_event();

        assert!(store.read_lines(event_id, None).unwrap().is_empty());
        assert!(store.read_lines(event_id, Some("stdout")).unwrap().is_empty());
    }

    #[test]
    fn reads_are_restartable() {
        let (mut store, event_id) = store_with_event();
        store.append_line(event_id, "stdout", "one").unwrap();

        let first = store.read_lines(event_id, Some("stdout")).unwrap();
        let second = store.read_lines(event_id, Some("stdout")).unwrap();
        assert_eq!(first, second);

        store.append_line(event_id, "stdout", "two").unwrap();
        let third = store.read_lines(event_id, Some("stdout")).unwrap();
        assert_eq!(third.len(), 2);
        assert_eq!(third[0], first[0]);
    }
}
