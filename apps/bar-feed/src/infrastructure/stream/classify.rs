//! Stream Line Classifier
//!
//! The barchart stream is newline-delimited. Each line is exactly one
//! of: an `ERROR`-prefixed server complaint, a keep-alive heartbeat
//! object, or a bar payload. Classification is prefix-based and never
//! parses JSON; parsing happens only after a line is known to be data.

/// Prefix of server error lines.
pub const ERROR_PREFIX: &str = "ERROR";

/// Prefix of keep-alive heartbeat lines.
pub const HEARTBEAT_PREFIX: &str = "{\"Heartbeat\":";

/// Classification of one raw stream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Server-side error; the connection must be rebuilt.
    StreamError(&'a str),
    /// Keep-alive; proves the connection is live, carries no data.
    Heartbeat,
    /// Candidate bar payload, still to be parsed.
    Data(&'a str),
}

/// Classify one raw line.
#[must_use]
pub fn classify(line: &str) -> LineKind<'_> {
    if line.starts_with(ERROR_PREFIX) {
        LineKind::StreamError(line)
    } else if line.starts_with(HEARTBEAT_PREFIX) {
        LineKind::Heartbeat
    } else {
        LineKind::Data(line)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("ERROR" ; "bare error")]
    #[test_case("ERROR: token expired" ; "error with detail")]
    #[test_case("ERROR {\"Heartbeat\":1}" ; "error wins over heartbeat shape")]
    fn error_lines(line: &str) {
        assert!(matches!(classify(line), LineKind::StreamError(l) if l == line));
    }

    #[test_case("{\"Heartbeat\":1}" ; "numeric heartbeat")]
    #[test_case("{\"Heartbeat\":\"2024-01-02T03:04:05Z\"}" ; "timestamp heartbeat")]
    fn heartbeat_lines(line: &str) {
        assert_eq!(classify(line), LineKind::Heartbeat);
    }

    #[test_case("{\"Open\":1.0,\"Close\":2.0}" ; "bar object")]
    #[test_case("{ \"Heartbeat\":1}" ; "heartbeat needs exact prefix")]
    #[test_case("error lowercase is data" ; "prefix is case sensitive")]
    #[test_case("" ; "empty line")]
    #[test_case("garbage" ; "garbage is data until parsed")]
    fn data_lines(line: &str) {
        assert!(matches!(classify(line), LineKind::Data(l) if l == line));
    }
}
