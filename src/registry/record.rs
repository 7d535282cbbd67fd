//! Broadcast record type
//!
//! A record is one canonical sentence ready to go on the wire. The payload is
//! built once and shared by every connection in a round.

use bytes::Bytes;

/// Line terminator appended to every delivered record
pub const LINE_TERMINATOR: &str = "\n";

/// A canonical sentence line to be broadcast to connections
///
/// Cheap to clone: `data` is reference counted, so each per-connection task
/// shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Sentence kind the record was filtered on
    pub kind: String,
    /// Wire bytes: canonical sentence followed by the line terminator
    pub data: Bytes,
}

impl Record {
    /// Build a record from a canonical sentence string
    pub fn new(kind: impl Into<String>, canonical: &str) -> Self {
        let mut line = String::with_capacity(canonical.len() + LINE_TERMINATOR.len());
        line.push_str(canonical);
        line.push_str(LINE_TERMINATOR);

        Self {
            kind: kind.into(),
            data: Bytes::from(line),
        }
    }

    /// Canonical sentence without the terminator
    pub fn canonical(&self) -> &str {
        let text = std::str::from_utf8(&self.data).unwrap_or_default();
        text.strip_suffix(LINE_TERMINATOR).unwrap_or(text)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_terminator() {
        let record = Record::new("RMC", "$GPRMC,1*00");

        assert_eq!(record.kind, "RMC");
        assert_eq!(&record.data[..], b"$GPRMC,1*00\n");
        assert_eq!(record.canonical(), "$GPRMC,1*00");
        assert_eq!(record.len(), 12);
    }

    #[test]
    fn test_record_clone_shares_payload() {
        let record = Record::new("RMC", "$GPRMC,1*00");
        let clone = record.clone();

        assert_eq!(record.data.as_ptr(), clone.data.as_ptr());
    }
}
