/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a strictly positive integer (e.g. a number of seconds) from a string value.
///
/// Returns `Err` with a human-readable reason if the value is present but unusable, so that callers can log it and
/// fall back to their default. A missing value yields `Ok(None)`.
pub fn parse_positive_int(value: Option<String>) -> Result<Option<u64>, String> {
    let value = match value {
        Some(v) => v,
        None => return Ok(None),
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(format!("{value} must be greater than zero")),
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(format!("{value} is not a valid positive integer. {e}")),
    }
}
