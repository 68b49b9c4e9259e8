//! JSON serialization for benchmark results.

use crate::result::RunResult;

/// Serialize a RunResult to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunResult).
pub fn to_json(result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Serialize a RunResult to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for RunResult).
pub fn to_json_pretty(result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Parse a RunResult previously written by [`to_json`] or [`to_json_pretty`].
pub fn from_json(json: &str) -> Result<RunResult, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::tests::sample_result;

    #[test]
    fn test_to_json() {
        let json = to_json(&sample_result(true)).unwrap();
        assert!(json.contains("\"mean_ns\":100.0"));
        assert!(json.contains("\"termination\":\"Converged\""));
        assert!(json.contains("\"is_outlier\":true"));
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json_pretty(&sample_result(false)).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("\"converged\": false"));
    }

    #[test]
    fn test_parse_back() {
        let result = sample_result(true);
        let parsed = from_json(&to_json(&result).unwrap()).unwrap();
        assert_eq!(parsed, result);
    }
}
