// src/config/duration.rs

use std::time::Duration;

/// Shortest interval accepted for `every`.
pub const MIN_INTERVAL: Duration = Duration::from_secs(30);

/// Parse a simple duration string like `"30s"`, `"250ms"`, `"5m"`, `"2h"`.
///
/// Units may be chained (`"1h30m"`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        // Find the boundary between digits and suffix.
        let idx = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("duration '{s}' missing unit suffix"))?;
        if idx == 0 {
            return Err(format!("invalid duration '{s}': expected a number"));
        }

        let (num_part, tail) = rest.split_at(idx);
        // Byte offset, so a multibyte unit never splits a char.
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit_part, tail) = tail.split_at(unit_len);

        let value: u64 = num_part
            .parse()
            .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
        let unit = unit_part.trim().to_lowercase();

        let too_large = || format!("duration '{s}' is too large");
        let part = match unit.as_str() {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(too_large)?),
            "h" => Duration::from_secs(value.checked_mul(60 * 60).ok_or_else(too_large)?),
            _ => {
                return Err(format!(
                    "unsupported duration unit '{unit}'; expected ms, s, m, or h"
                ));
            }
        };
        total = total.checked_add(part).ok_or_else(too_large)?;
        rest = tail;
    }

    Ok(total)
}

/// Parse an `every` value: empty means "not periodic", anything else must be
/// zero or at least [`MIN_INTERVAL`].
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    if s.trim().is_empty() {
        return Ok(Duration::ZERO);
    }
    let d = parse_duration(s)?;
    if !d.is_zero() && d < MIN_INTERVAL {
        return Err(format!(
            "every = \"{s}\": time interval can't be shorter than 30 seconds"
        ));
    }
    Ok(d)
}
