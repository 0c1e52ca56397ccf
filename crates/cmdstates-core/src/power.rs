//! Power-Command Decoder
//!
//! ACIS power commands (`WSPOWxxxxx`) carry a five hex digit payload. The low
//! six bits select front-end processors; the ten bits starting at bit 8 select
//! CCDs, I0-I3 followed by S0-S5.

use crate::errors::{Result, StatesError};

const PAYLOAD_LEN: usize = 5;
const FEP_BITS: u32 = 6;
const CCD_BITS: u32 = 10;
const CCD_SHIFT: u32 = 8;
const N_IMAGING_CCDS: u32 = 4;

/// Decoded power command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerInfo {
    pub fep_count: u32,
    pub ccd_count: u32,
    /// Space-joined FEP indices, e.g. `"0 1 2"`
    pub feps: String,
    /// Space-joined CCD labels, e.g. `"I0 I1 S3"`
    pub ccds: String,
}

/// Decode the FEP and CCD selection of a power command mnemonic.
///
/// # Errors
///
/// `InvalidPowerCommand` unless the mnemonic ends in exactly five hex digits
/// after its five character prefix.
pub fn decode_power(mnemonic: &str) -> Result<PowerInfo> {
    let invalid = || StatesError::InvalidPowerCommand {
        mnemonic: mnemonic.to_string(),
    };

    let payload = mnemonic.get(PAYLOAD_LEN..).ok_or_else(invalid)?;
    if payload.len() != PAYLOAD_LEN {
        return Err(invalid());
    }
    let value = u32::from_str_radix(payload, 16).map_err(|_| invalid())?;

    let fep_bits = value & ((1 << FEP_BITS) - 1);
    let ccd_bits = (value >> CCD_SHIFT) & ((1 << CCD_BITS) - 1);

    let feps: Vec<String> = (0..FEP_BITS)
        .filter(|i| fep_bits & (1 << i) != 0)
        .map(|i| i.to_string())
        .collect();
    let ccds: Vec<String> = (0..CCD_BITS)
        .filter(|i| ccd_bits & (1 << i) != 0)
        .map(|i| {
            if i < N_IMAGING_CCDS {
                format!("I{}", i)
            } else {
                format!("S{}", i - N_IMAGING_CCDS)
            }
        })
        .collect();

    Ok(PowerInfo {
        fep_count: feps.len() as u32,
        ccd_count: ccds.len() as u32,
        feps: feps.join(" "),
        ccds: ccds.join(" "),
    })
}
