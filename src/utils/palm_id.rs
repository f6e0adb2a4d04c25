//! Palm identifiers: `RP-<BLOCK>-<SEQUENCE>`, e.g. `RP-A1-00001`.

use regex::Regex;
use std::sync::OnceLock;

const PLANTATION_PREFIX: &str = "RP";

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^RP-[A-Z0-9]+-\d+$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalmId {
    pub plantation: String,
    pub block: String,
    pub sequence: String,
}

/// Surrounding whitespace is ignored.
pub fn validate(palm_id: &str) -> bool {
    pattern().is_match(palm_id.trim())
}

pub fn parse(palm_id: &str) -> Option<PalmId> {
    if !validate(palm_id) {
        return None;
    }

    let mut parts = palm_id.trim().splitn(3, '-');
    let plantation = parts.next()?.to_string();
    let block = parts.next()?.to_string();
    let sequence = parts.next()?.to_string();

    Some(PalmId {
        plantation,
        block,
        sequence,
    })
}

/// Sequence is zero-padded to 5 digits.
pub fn generate(block: &str, sequence: u32) -> String {
    format!("{}-{}-{:05}", PLANTATION_PREFIX, block, sequence)
}

/// A subject key the remote side can resolve: a palm QR code or a UUID.
pub fn is_resolvable_subject(subject: &str) -> bool {
    validate(subject) || uuid::Uuid::parse_str(subject.trim()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_palm_codes() {
        assert!(validate("RP-A1-00001"));
        assert!(validate("  RP-B12-7 "));
        assert!(!validate("rp-a1-00001"));
        assert!(!validate("RP-A1"));
        assert!(!validate("XX-A1-00001"));
        assert!(!validate(""));
    }

    #[test]
    fn parses_components() {
        let id = parse("RP-A1-00042").unwrap();
        assert_eq!(id.plantation, "RP");
        assert_eq!(id.block, "A1");
        assert_eq!(id.sequence, "00042");
        assert!(parse("RP-A1-x").is_none());
    }

    #[test]
    fn generates_padded_codes() {
        assert_eq!(generate("A1", 1), "RP-A1-00001");
        assert_eq!(generate("C7", 123456), "RP-C7-123456");
        assert!(validate(&generate("Z9", 3)));
    }

    #[test]
    fn accepts_uuid_subjects() {
        assert!(is_resolvable_subject("6f1c2b9e-3f3a-4c55-9d0b-2a4b7c1e8f00"));
        assert!(is_resolvable_subject("RP-A1-00001"));
        assert!(!is_resolvable_subject("palm 12"));
    }
}
