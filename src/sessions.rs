//! Pick the controlling sessions out of a member's connection history

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::vatsim::{AtcHistoryItem, Connection};

/// Callsign suffixes of ATC facilities. Anything else (pilots, observers, ATIS) is ignored.
pub const ATC_SUFFIXES: [&str; 7] = ["_CTR", "_FSS", "_DEL", "_GND", "_TWR", "_APP", "_DEP"];

/// Format of the `start` and `end` timestamps returned by the API. Always UTC.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Seconds per hour, as a float
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Errors from turning a connection into a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid {field} timestamp `{value}` in connection {callsign}")]
    Timestamp {
        /// Which end of the connection, `start` or `end`
        field: &'static str,
        /// The offending string
        value: String,
        /// Callsign of the connection
        callsign: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// A period of time a member spent controlling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtcSession {
    /// Logon time
    pub start: DateTime<Utc>,
    /// Length of the session. Negative when the API reports an end before the start.
    pub duration_hours: f64,
}

impl AtcSession {
    /// Build a session from a connection, without looking at its callsign.
    pub fn from_connection(connection: &Connection) -> Result<Self, SessionError> {
        let start = parse_timestamp(connection, "start", &connection.start)?;
        let end = parse_timestamp(connection, "end", &connection.end)?;

        #[expect(clippy::cast_precision_loss)]
        let duration_hours = (end - start).num_seconds() as f64 / SECONDS_PER_HOUR;

        Ok(Self {
            start,
            duration_hours,
        })
    }
}

/// Whether a callsign belongs to an ATC position. Case-sensitive.
pub fn is_atc_callsign(callsign: &str) -> bool {
    ATC_SUFFIXES
        .iter()
        .any(|suffix| callsign.ends_with(suffix))
}

/// Lazily convert the ATC connections among `items` into sessions, dropping everything else.
pub fn atc_sessions(
    items: &[AtcHistoryItem],
) -> impl Iterator<Item = Result<AtcSession, SessionError>> {
    items
        .iter()
        .map(|item| &item.connection_id)
        .filter(|connection| is_atc_callsign(&connection.callsign))
        .map(AtcSession::from_connection)
}

fn parse_timestamp(
    connection: &Connection,
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, SessionError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| SessionError::Timestamp {
            field,
            value: value.to_owned(),
            callsign: connection.callsign.clone(),
            source,
        })
}
