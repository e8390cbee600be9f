//! Small JSON-argument extraction helpers shared by the individual tool
//! implementations. Every tool's argument spec is, in effect, "these
//! fields must be present and this shape" — these helpers turn a missing
//! or mistyped field into a uniform `ToolError::InvalidArgs`.

use crate::errors::{ToolError, ToolResult};
use serde_json::Value;

pub fn str_field<'a>(args: &'a Value, tool: &str, field: &str) -> ToolResult<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::invalid(tool, format!("missing required string field `{field}`")))
}

pub fn opt_str_field<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

pub fn opt_str_list(args: &Value, field: &str) -> Vec<String> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn u64_field(args: &Value, tool: &str, field: &str) -> ToolResult<u64> {
    args.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| ToolError::invalid(tool, format!("missing required integer field `{field}`")))
}

pub fn opt_u64_field(args: &Value, field: &str, default: u64) -> u64 {
    args.get(field).and_then(Value::as_u64).unwrap_or(default)
}

pub fn opt_u8_field(args: &Value, field: &str) -> Option<u8> {
    args.get(field).and_then(Value::as_u64).map(|n| n.min(255) as u8)
}

pub fn id_field<T: std::str::FromStr>(args: &Value, tool: &str, field: &str) -> ToolResult<T> {
    let raw = str_field(args, tool, field)?;
    raw.parse::<T>().map_err(|_| ToolError::invalid(tool, format!("`{field}` is not a valid id: {raw}")))
}
