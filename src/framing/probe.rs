//! Liveness probe detection.

/// Matches the fixed string a health check sends instead of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeDetector {
    literal: Vec<u8>,
}

impl ProbeDetector {
    pub fn new(literal: impl Into<Vec<u8>>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    /// True when `first` followed by `rest` is exactly the probe literal.
    pub fn matches(&self, first: u8, rest: &[u8]) -> bool {
        match self.literal.split_first() {
            Some((head, tail)) => *head == first && tail == rest,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let probe = ProbeDetector::new("TEST");
        assert!(probe.matches(b'T', b"EST"));
    }

    #[test]
    fn prefix_or_suffix_is_not_a_probe() {
        let probe = ProbeDetector::new("TEST");
        assert!(!probe.matches(b'T', b"ES"));
        assert!(!probe.matches(b'T', b"EST\n"));
        assert!(!probe.matches(b't', b"EST"));
    }

    #[test]
    fn single_byte_literal() {
        let probe = ProbeDetector::new("!");
        assert!(probe.matches(b'!', b""));
        assert!(!probe.matches(b'!', b"!"));
    }

    #[test]
    fn empty_literal_never_matches() {
        let probe = ProbeDetector::new(Vec::new());
        assert!(!probe.matches(b'T', b""));
    }
}
