use serde::de::DeserializeOwned;
use std::fs;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// This function reads a file from `file_path`, attempts to parse it
/// as JSON, and returns an instance of `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(Error::IoError)?;

    log::debug!("Read {} bytes from '{}'.", data.len(), file_path);

    parse_json_str(&data)
}

/// Parses an in-memory JSON document into `T`.
pub fn parse_json_str<T: DeserializeOwned>(data: &str) -> Result<T> {
    let parsed_data: T = serde_json::from_str(data).map_err(Error::DeserializationError)?;

    Ok(parsed_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        value: i64,
    }

    #[test]
    fn test_parse_json_str() {
        let probe: Probe = parse_json_str(r#"{ "value": 42 }"#).unwrap();
        assert_eq!(probe.value, 42);
    }

    #[test]
    fn test_parse_malformed_json_is_deserialization_error() {
        let result: Result<Probe> = parse_json_str("{ value: ");
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let result: Result<Probe> = parse_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
