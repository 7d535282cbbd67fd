//! NMEA 0183 sentence envelope
//!
//! Only the envelope is interpreted: start delimiter, address, comma-separated
//! fields and the XOR checksum. Field contents are kept verbatim, which is all
//! the relay needs to filter by kind and re-serialize.

use std::fmt;

use super::error::ParseError;

/// A checksum-validated NMEA 0183 sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// `$` for parametric sentences, `!` for encapsulated ones
    pub start: char,
    /// Talker identifier (e.g. `GP`), or `P` for proprietary sentences
    pub talker: String,
    /// Sentence kind (e.g. `RMC`)
    pub kind: String,
    /// Data fields following the address
    pub fields: Vec<String>,
    /// Checksum carried by the input line
    pub checksum: u8,
}

impl Sentence {
    /// Parse a single line into a sentence
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let start = match line.chars().next() {
            Some(c @ ('$' | '!')) => c,
            _ => return Err(ParseError::MissingStartDelimiter),
        };

        let (body, checksum_raw) = line[1..]
            .rsplit_once('*')
            .ok_or(ParseError::MissingChecksum)?;

        let found = parse_checksum(checksum_raw)?;
        let computed = checksum(body);
        if computed != found {
            return Err(ParseError::ChecksumMismatch { computed, found });
        }

        let mut parts = body.split(',');
        let address = parts.next().unwrap_or_default();
        let (talker, kind) = split_address(address)?;

        Ok(Self {
            start,
            talker: talker.to_string(),
            kind: kind.to_string(),
            fields: parts.map(str::to_string).collect(),
            checksum: found,
        })
    }

    /// Body between the start delimiter and `*`
    fn body(&self) -> String {
        let mut body = format!("{}{}", self.talker, self.kind);
        for field in &self.fields {
            body.push(',');
            body.push_str(field);
        }
        body
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body();
        write!(f, "{}{}*{:02X}", self.start, body, checksum(&body))
    }
}

/// XOR of every byte in the sentence body
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

fn parse_checksum(raw: &str) -> Result<u8, ParseError> {
    if raw.len() != 2 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidChecksum(raw.to_string()));
    }
    u8::from_str_radix(raw, 16).map_err(|_| ParseError::InvalidChecksum(raw.to_string()))
}

fn split_address(address: &str) -> Result<(&str, &str), ParseError> {
    if address.is_empty() || !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ParseError::InvalidAddress(address.to_string()));
    }

    // Proprietary sentences carry a manufacturer code instead of a talker
    let split_at = if address.starts_with('P') { 1 } else { 2 };
    if address.len() <= split_at {
        return Err(ParseError::InvalidAddress(address.to_string()));
    }

    Ok(address.split_at(split_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &str = "$GPRMC,220516,A,5133.82,N,00042.24,W,173.8,231.8,130694,004.2,W*70";
    const GGA: &str = "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76";

    #[test]
    fn test_parse_rmc() {
        let sentence = Sentence::parse(RMC).unwrap();

        assert_eq!(sentence.start, '$');
        assert_eq!(sentence.talker, "GP");
        assert_eq!(sentence.kind, "RMC");
        assert_eq!(sentence.fields.len(), 11);
        assert_eq!(sentence.fields[0], "220516");
        assert_eq!(sentence.checksum, 0x70);
    }

    #[test]
    fn test_parse_gga_keeps_empty_fields() {
        let sentence = Sentence::parse(GGA).unwrap();

        assert_eq!(sentence.kind, "GGA");
        assert_eq!(sentence.fields.last().map(String::as_str), Some(""));
        assert_eq!(sentence.to_string(), GGA);
    }

    #[test]
    fn test_display_is_canonical() {
        let padded = "  $GPRMC,220516,A,5133.82,N,00042.24,W,173.8,231.8,130694,004.2,W*70\r\n";
        let sentence = Sentence::parse(padded).unwrap();

        assert_eq!(sentence.to_string(), RMC);
    }

    #[test]
    fn test_lowercase_checksum_normalized() {
        let sentence = Sentence::parse("$PGRME,15.0,M,45.0,M,25.0,M*1c").unwrap();

        assert_eq!(sentence.to_string(), "$PGRME,15.0,M,45.0,M,25.0,M*1C");
    }

    #[test]
    fn test_proprietary_address() {
        let body = "PGRME,15.0,M,45.0,M,25.0,M";
        let line = format!("${}*{:02X}", body, checksum(body));
        let sentence = Sentence::parse(&line).unwrap();

        assert_eq!(sentence.talker, "P");
        assert_eq!(sentence.kind, "GRME");
    }

    #[test]
    fn test_encapsulated_start() {
        let body = "AIVDM,1,1,,A,13aEOK?P00PD2wVMdLDRhgvL289?,0";
        let line = format!("!{}*{:02X}", body, checksum(body));
        let sentence = Sentence::parse(&line).unwrap();

        assert_eq!(sentence.start, '!');
        assert_eq!(sentence.kind, "VDM");
        assert_eq!(sentence.to_string(), line);
    }

    #[test]
    fn test_empty() {
        assert_eq!(Sentence::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_missing_start_delimiter() {
        assert_eq!(
            Sentence::parse("GPRMC,220516*70"),
            Err(ParseError::MissingStartDelimiter)
        );
    }

    #[test]
    fn test_missing_checksum() {
        assert_eq!(
            Sentence::parse("$GPRMC,220516,A"),
            Err(ParseError::MissingChecksum)
        );
    }

    #[test]
    fn test_invalid_checksum_digits() {
        assert!(matches!(
            Sentence::parse("$GPRMC,220516,A*7"),
            Err(ParseError::InvalidChecksum(_))
        ));
        assert!(matches!(
            Sentence::parse("$GPRMC,220516,A*ZZ"),
            Err(ParseError::InvalidChecksum(_))
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let bad = RMC.replace("*70", "*71");
        assert_eq!(
            Sentence::parse(&bad),
            Err(ParseError::ChecksumMismatch {
                computed: 0x70,
                found: 0x71
            })
        );
    }

    #[test]
    fn test_invalid_address() {
        let body = "GP-RMC,1";
        let line = format!("${}*{:02X}", body, checksum(body));
        assert!(matches!(
            Sentence::parse(&line),
            Err(ParseError::InvalidAddress(_))
        ));

        let body = "GP,1";
        let line = format!("${}*{:02X}", body, checksum(body));
        assert!(matches!(
            Sentence::parse(&line),
            Err(ParseError::InvalidAddress(_))
        ));
    }
}
