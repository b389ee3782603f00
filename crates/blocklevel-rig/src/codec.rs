//! Sensor frame decoding
//!
//! Tilt packet (12 bytes, dual-axis mode):
//!
//! ```text
//! byte  0..3   header
//! byte  3..6   Y axis, 24-bit big-endian two's complement
//! byte  6..9   X axis, 24-bit big-endian two's complement
//! byte  9..12  trailer
//! ```
//!
//! Axis value = raw / 1000 [deg].
//!
//! Ranging block (12 bytes): distance [mm] in the last two bytes, MSB first.
//! 0 and 65535 mean the sensor has no valid reading.

use thiserror::Error;

/// Length of a tilt packet and of a ranging block [bytes]
pub const FRAME_LEN: usize = 12;

/// Dual-axis scaling of the tilt sensor
const TILT_SCALE: f64 = 1000.0;

const NO_RANGE_LOW: u16 = 0;
const NO_RANGE_HIGH: u16 = u16::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Invalid frame length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Decoded tilt sensor reading [deg]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltReading {
    pub x_deg: f64,
    pub y_deg: f64,
}

impl TiltReading {
    /// `(tilt_x, tilt_y)` [rad]
    pub fn to_radians(self) -> (f64, f64) {
        (self.x_deg.to_radians(), self.y_deg.to_radians())
    }
}

fn check_len(frame: &[u8]) -> Result<(), CodecError> {
    if frame.len() != FRAME_LEN {
        return Err(CodecError::InvalidLength {
            expected: FRAME_LEN,
            got: frame.len(),
        });
    }
    Ok(())
}

/// Sign-extend a 24-bit big-endian two's complement value
fn decode_i24(b: [u8; 3]) -> i32 {
    i32::from_be_bytes([b[0], b[1], b[2], 0]) >> 8
}

/// Decode a 12-byte tilt packet
pub fn decode_tilt_packet(packet: &[u8]) -> Result<TiltReading, CodecError> {
    check_len(packet)?;
    let y_raw = decode_i24([packet[3], packet[4], packet[5]]);
    let x_raw = decode_i24([packet[6], packet[7], packet[8]]);

    Ok(TiltReading {
        x_deg: f64::from(x_raw) / TILT_SCALE,
        y_deg: f64::from(y_raw) / TILT_SCALE,
    })
}

/// Distance [mm] from a 12-byte ranging block, `None` without a valid reading
pub fn parse_ranging_block(block: &[u8]) -> Result<Option<u16>, CodecError> {
    check_len(block)?;
    let distance = u16::from_be_bytes([block[FRAME_LEN - 2], block[FRAME_LEN - 1]]);

    Ok(match distance {
        NO_RANGE_LOW | NO_RANGE_HIGH => None,
        d => Some(d),
    })
}

/// Parse hex text such as `"01 00 00 C8"` into bytes
///
/// Whitespace is ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CodecError> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(CodecError::InvalidHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let s: String = pair.iter().collect();
            if !s.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CodecError::InvalidHex(format!("'{s}'")));
            }
            u8::from_str_radix(&s, 16).map_err(|_| CodecError::InvalidHex(format!("'{s}'")))
        })
        .collect()
}
