//! SQLite-backed exchange store.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::MatchError;
use crate::model::ExchangeRecord;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS exchanges (
    id INTEGER PRIMARY KEY,
    participant TEXT NOT NULL,  -- username at recording time
    amount INTEGER NOT NULL,    -- signed minor units
    fee INTEGER NOT NULL,       -- minor units
    timestamp TEXT NOT NULL,    -- RFC3339, UTC
    recorder TEXT,              -- non-NULL marks the side-channel payment path
    ref TEXT,                   -- processor transaction id, when recorded
    status TEXT
);
"#;

pub fn open(path: &Path) -> Result<Connection, MatchError> {
    Connection::open(path)
        .map_err(|e| MatchError::Store(format!("cannot open {}: {e}", path.display())))
}

pub fn init(conn: &Connection) -> Result<(), MatchError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// All exchanges not recorded by the side-channel recorder, joined with the
/// owning participant's user id, oldest first. Pure read.
pub fn load_exchanges(conn: &Connection) -> Result<Vec<ExchangeRecord>, MatchError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.participant, p.id, e.amount, e.fee, e.timestamp, e.recorder, e.ref, e.status
           FROM exchanges e
           JOIN participants p ON e.participant = p.username
          WHERE e.recorder IS NULL
          ORDER BY e.timestamp ASC",
    )?;

    let mut rows = stmt.query([])?;
    let mut exchanges = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let raw_ts: String = row.get(5)?;
        let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
            .map_err(|_| MatchError::TimestampParse {
                record_id: id.to_string(),
                value: raw_ts.clone(),
            })?
            .with_timezone(&Utc);

        exchanges.push(ExchangeRecord {
            id,
            participant: row.get(1)?,
            user_id: row.get(2)?,
            amount_cents: row.get(3)?,
            fee_cents: row.get(4)?,
            timestamp,
            recorder: row.get(6)?,
            reference: row.get(7)?,
            status: row.get(8)?,
        });
    }
    Ok(exchanges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn store_with(rows: &[(i64, &str, i64, i64, &str, Option<&str>)]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        conn.execute("INSERT INTO participants (id, username) VALUES (1, 'alice'), (2, 'bob')", [])
            .unwrap();
        for (id, participant, amount, fee, ts, recorder) in rows {
            conn.execute(
                "INSERT INTO exchanges (id, participant, amount, fee, timestamp, recorder)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, participant, amount, fee, ts, recorder],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn loads_in_timestamp_order_with_user_ids() {
        let conn = store_with(&[
            (2, "bob", 500, 30, "2015-06-01T13:00:00+00:00", None),
            (1, "alice", 941, 59, "2015-06-01T12:00:00+00:00", None),
        ]);
        let exchanges = load_exchanges(&conn).unwrap();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].id, 1);
        assert_eq!(exchanges[0].user_id, 1);
        assert_eq!(exchanges[0].amount_cents, 941);
        assert_eq!(exchanges[0].fee_cents, 59);
        assert_eq!(exchanges[1].participant, "bob");
    }

    #[test]
    fn side_channel_recorder_is_filtered_out() {
        let conn = store_with(&[
            (1, "alice", 941, 59, "2015-06-01T12:00:00+00:00", None),
            (2, "alice", 500, 0, "2015-06-01T12:30:00+00:00", Some("paypal")),
        ]);
        let exchanges = load_exchanges(&conn).unwrap();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].id, 1);
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let conn = store_with(&[(1, "alice", 941, 59, "yesterday", None)]);
        let err = load_exchanges(&conn).unwrap_err();
        assert!(matches!(err, MatchError::TimestampParse { .. }));
    }
}
