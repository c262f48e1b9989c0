// The utils module organizes useful functions, used by other modules.

use anyhow::Result;
use serde::Serialize;

// Convert any `Serialize` type into a two-space-indented JSON string.
pub fn to_two_space_indented_json<T: Serialize>(value: &T) -> Result<String> {
    let json_value: serde_json::Value = serde_json::to_value(value)?;
    let pretty_json: String = serde_json::to_string_pretty(&json_value)?;
    Ok(pretty_json)
}

// Trim trailing slashes so "<base>/<path>" never doubles them.
pub fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
