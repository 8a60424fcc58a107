// core/common/src/cache/value.rs
// Tagged cache payload: a confirmed-absent marker can never collide with a snapshot

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::store::CacheError;

/// What a cache entry holds. Serialised with an explicit tag, so
/// `Present("absent")` and `Absent` have different encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum CachedValue<T> {
    Absent,
    Present(T),
}

impl<T: Serialize> CachedValue<T> {
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(self).map_err(|e| CacheError::Payload(e.to_string()))
    }
}

impl<T: DeserializeOwned> CachedValue<T> {
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_encoding_is_tagged() {
        let bytes = CachedValue::<String>::Absent.encode().unwrap();
        assert_eq!(bytes, br#"{"state":"absent"}"#.to_vec());
    }

    #[test]
    fn test_present_value_equal_to_marker_text_stays_present() {
        let bytes = CachedValue::Present("absent".to_string()).encode().unwrap();
        let decoded = CachedValue::<String>::decode(&bytes).unwrap();
        assert_eq!(decoded, CachedValue::Present("absent".to_string()));
    }

    #[test]
    fn test_untagged_bytes_are_rejected() {
        // A bare legacy sentinel must not decode as either variant
        assert!(CachedValue::<String>::decode(b"NULL").is_err());
        assert!(CachedValue::<String>::decode(br#""absent""#).is_err());
    }
}
