//! Parsing of recorded keyboard response traces.
//!
//! A trace is hex bytes separated by whitespace or commas, one reply to each
//! Inquiry/Instant command in order. `#` starts a comment.

use anyhow::{bail, Context, Result};

/// Parse a whole trace file.
pub fn parse_trace(text: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let data = line.split('#').next().unwrap_or_default();
        for token in data
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            bytes.push(parse_byte(token).with_context(|| format!("line {}", n + 1))?);
        }
    }
    Ok(bytes)
}

/// Parse one hex byte, with or without `0x`.
pub fn parse_byte(token: &str) -> Result<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 2 {
        bail!("expected a hex byte, got {:?}", token);
    }
    u8::from_str_radix(digits, 16).with_context(|| format!("invalid hex byte {:?}", token))
}
