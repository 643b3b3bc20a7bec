// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermostat register map
//!
//! The thermostat exposes its state as holding registers. Both the HTTP API
//! and the occupancy monitor address it through the constants below.
//!
//! ## Register Map
//!
//! - Registers 1-12: status block, read as a whole by `GET /read`
//! - Register 3: setpoint (read/write)
//! - Register 4: fan state (read/write)
//!
//! Every register is an unsigned 16-bit value carried big-endian on the wire.

use crate::error::{GatewayError, Result};

/// First register of the status block
pub const STATUS_BLOCK_START: u16 = 1;

/// Number of registers in the status block
pub const STATUS_BLOCK_LEN: u16 = 12;

/// Setpoint register
pub const SETPOINT_REGISTER: u16 = 3;

/// Fan state register, immediately after the setpoint
pub const FAN_STATE_REGISTER: u16 = 4;

/// Decode `count` big-endian registers from a raw response payload.
///
/// The payload must hold at least `count * 2` bytes; anything shorter is a
/// malformed response and is rejected instead of being partially decoded.
pub fn decode_registers(bytes: &[u8], count: u16) -> Result<Vec<u16>> {
    let expected = usize::from(count) * 2;
    if bytes.len() < expected {
        return Err(GatewayError::ShortResponse {
            expected,
            actual: bytes.len(),
        });
    }

    Ok(bytes[..expected]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Keep the first `count` decoded registers of a response.
///
/// A response carrying fewer registers than requested is rejected, sizes in
/// the error are in bytes as for [`decode_registers`].
pub fn check_response_len(mut values: Vec<u16>, count: u16) -> Result<Vec<u16>> {
    let expected = usize::from(count);
    if values.len() < expected {
        return Err(GatewayError::ShortResponse {
            expected: expected * 2,
            actual: values.len() * 2,
        });
    }
    values.truncate(expected);
    Ok(values)
}

/// Encode registers into their big-endian wire representation
pub fn encode_registers(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_be_bytes()).collect()
}

/// Parse a register address received as text (e.g. a URL segment)
pub fn parse_address(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| GatewayError::Validation(format!("invalid register address {raw:?}: {e}")))
}

/// Narrow an integer received from a client to a register value
pub fn register_value(field: &str, value: i64) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        GatewayError::Validation(format!(
            "{field} must be between 0 and {}, got {value}",
            u16::MAX
        ))
    })
}

/// Check that a `count`-register span starting at `start` fits the address space
pub fn check_span(start: u16, count: u16) -> Result<()> {
    if count == 0 {
        return Err(GatewayError::Validation(
            "register count must be at least 1".to_string(),
        ));
    }
    match start.checked_add(count - 1) {
        Some(_) => Ok(()),
        None => Err(GatewayError::Validation(format!(
            "registers {start}..{start}+{count} exceed the 16-bit address space"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status_block() {
        let bytes: Vec<u8> = (0u8..24).collect();
        let values = decode_registers(&bytes, STATUS_BLOCK_LEN).unwrap();

        assert_eq!(values.len(), 12);
        assert_eq!(values[0], 0x0001);
        assert_eq!(values[1], 0x0203);
        assert_eq!(values[11], 0x1617);
    }

    #[test]
    fn test_decode_is_big_endian_unsigned() {
        let values = decode_registers(&[0xFF, 0xFE, 0x00, 0x15], 2).unwrap();
        assert_eq!(values, vec![65534, 21]);
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let err = decode_registers(&[0u8; 22], STATUS_BLOCK_LEN).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ShortResponse {
                expected: 24,
                actual: 22
            }
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let values = decode_registers(&[0x00, 0x17, 0x00, 0x01, 0xAA], 2).unwrap();
        assert_eq!(values, vec![23, 1]);
    }

    #[test]
    fn test_response_len_rejects_missing_registers() {
        let err = check_response_len(vec![21, 1, 0], 4).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ShortResponse {
                expected: 8,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_response_len_truncates_extra_registers() {
        assert_eq!(check_response_len(vec![21, 1, 9], 2).unwrap(), vec![21, 1]);
        assert_eq!(check_response_len(vec![21, 1], 2).unwrap(), vec![21, 1]);
    }

    #[test]
    fn test_encode_matches_decode() {
        let bytes = encode_registers(&[21, 2]);
        assert_eq!(bytes, vec![0x00, 0x15, 0x00, 0x02]);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("3").unwrap(), 3);
        assert_eq!(parse_address("65535").unwrap(), 65535);
        assert!(parse_address("abc").is_err());
        assert!(parse_address("-1").is_err());
        assert!(parse_address("65536").is_err());
    }

    #[test]
    fn test_register_value_range() {
        assert_eq!(register_value("value", 0).unwrap(), 0);
        assert_eq!(register_value("value", 65535).unwrap(), 65535);
        assert!(register_value("value", -1).is_err());
        assert!(register_value("value", 70000).is_err());
    }

    #[test]
    fn test_check_span() {
        assert!(check_span(STATUS_BLOCK_START, STATUS_BLOCK_LEN).is_ok());
        assert!(check_span(65535, 1).is_ok());
        assert!(check_span(65535, 2).is_err());
        assert!(check_span(65530, STATUS_BLOCK_LEN).is_err());
        assert!(check_span(0, 0).is_err());
    }
}
