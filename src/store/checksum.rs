//! CRC32 framing for record log lines
//!
//! Each line is `<crc32 as 8 hex digits> <json>`; the checksum covers the
//! JSON bytes only. Uses CRC32 (IEEE polynomial).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Prefixes a JSON body with its checksum.
pub(crate) fn seal(json: &str) -> String {
    format!("{:08x} {}", compute_checksum(json.as_bytes()), json)
}

/// Splits a sealed line and verifies its checksum, returning the JSON body.
pub(crate) fn unseal(line: &str) -> Result<&str, String> {
    let (prefix, body) = line
        .split_once(' ')
        .ok_or_else(|| "missing checksum separator".to_string())?;
    let expected =
        u32::from_str_radix(prefix, 16).map_err(|_| format!("invalid checksum '{}'", prefix))?;
    let actual = compute_checksum(body.as_bytes());
    if actual != expected {
        return Err(format!(
            "checksum mismatch: expected {:08x}, computed {:08x}",
            expected, actual
        ));
    }
    Ok(body)
}
