//! YAML with enums written as single-key maps.
//!
//! `serde_yaml_ng` reads externally tagged enums only as `!tag` values by
//! default. Scenario and config files write them as maps instead
//! (`- click: "#go"`, `dialog_policy: { respond: accept }`), at any depth.

use crate::result::HarnessResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml_ng::with::singleton_map_recursive;

/// Parse YAML, reading enum variants from single-key maps
pub fn from_str<T: DeserializeOwned>(yaml: &str) -> HarnessResult<T> {
    Ok(singleton_map_recursive::deserialize(
        serde_yaml_ng::Deserializer::from_str(yaml),
    )?)
}

/// Render YAML, writing enum variants as single-key maps
pub fn to_string<T: Serialize>(value: &T) -> HarnessResult<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_yaml_ng::Serializer::new(&mut buffer);
    singleton_map_recursive::serialize(value, &mut serializer)?;
    drop(serializer);
    String::from_utf8(buffer).map_err(|e| crate::result::HarnessError::config(e.to_string()))
}
