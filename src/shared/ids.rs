use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_SPACE: u32 = 36 * 36 * 36 * 36;

pub fn validate_identifier_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '-' or '_'"
    ))
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                validate_identifier_value($kind, raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(|err| {
                    D::Error::custom(format!("invalid {} `{}`: {}", $kind, raw, err))
                })
            }
        }
    };
}

define_id_type!(JobId, "job id");

impl JobId {
    /// Compact sortable id: `job-<base36 millis>-<4 base36 chars>`.
    ///
    /// The suffix is random; `fallback_seq` stands in when the OS cannot
    /// supply randomness.
    pub fn generate(now_millis: i64, fallback_seq: u32) -> Self {
        let timestamp = u64::try_from(now_millis).unwrap_or(0);
        let mut bytes = [0_u8; 4];
        let sample = match getrandom::getrandom(&mut bytes) {
            Ok(()) => u32::from_le_bytes(bytes),
            Err(_) => fallback_seq,
        } % SUFFIX_SPACE;
        Self(format!(
            "job-{}-{}",
            base36_encode_u64(timestamp),
            base36_encode_fixed_u32(sample, 4)
        ))
    }
}

fn base36_encode_u64(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    out.into_iter().rev().collect()
}

fn base36_encode_fixed_u32(mut value: u32, width: usize) -> String {
    let mut chars = vec!['0'; width];
    for idx in (0..width).rev() {
        chars[idx] = BASE36_ALPHABET[(value % 36) as usize] as char;
        value /= 36;
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_job_ids_are_valid_identifiers() {
        let id = JobId::generate(1_700_000_000_000, 7);
        assert!(id.as_str().starts_with("job-"));
        assert_eq!(JobId::parse(id.as_str()).expect("parse"), id);
        assert_eq!(id.as_str().rsplit('-').next().map(str::len), Some(4));
    }

    #[test]
    fn negative_timestamps_clamp_to_zero() {
        let id = JobId::generate(-1, 0);
        assert!(id.as_str().starts_with("job-0-"));
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert!(JobId::parse("job 1").is_err());
        assert!(JobId::parse("").is_err());
    }
}
