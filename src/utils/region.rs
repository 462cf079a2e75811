use crate::error::{BridgeError, Result};

/// Region names that do not follow the `AREA_DIRECTION_N` spelling.
const IRREGULAR_REGIONS: &[(&str, &str)] = &[
    ("GovCloud", "us-gov-west-1"),
    ("USGovWest1", "us-gov-west-1"),
];

/// Resolves a region identifier such as `Regions.US_EAST_1`, `US_EAST_1` or
/// `us-east-1` to its region code. Any dotted namespace prefix is dropped.
///
/// Enum-style names are converted to codes (`AP_NORTHEAST_3` becomes
/// `ap-northeast-3`); the result must look like a region code.
pub fn parse_region(identifier: &str) -> Result<String> {
    let name = identifier.trim();
    let name = name.rsplit('.').next().unwrap_or(name);

    if let Some((_, code)) = IRREGULAR_REGIONS.iter().find(|(n, _)| *n == name) {
        return Ok(code.to_string());
    }

    let code = name.to_ascii_lowercase().replace('_', "-");
    if is_region_code(&code) {
        Ok(code)
    } else {
        Err(BridgeError::InvalidRegion(identifier.to_string()))
    }
}

/// `xx-name[-name...]-N`: two-letter area, one or more lowercase words, a number.
fn is_region_code(code: &str) -> bool {
    let segments: Vec<&str> = code.split('-').collect();
    if segments.len() < 3 {
        return false;
    }

    let (area, rest) = (segments[0], &segments[1..]);
    let (number, words) = match rest.split_last() {
        Some(split) => split,
        None => return false,
    };

    area.len() == 2
        && area.chars().all(|c| c.is_ascii_lowercase())
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}
