//! Arithmetic over the 122 free bits of a v4/variant-1 UUID.
//!
//! A UUID's 128 bits are not all available for arithmetic: 4 bits (at
//! positions 48-51, numbered from the least-significant bit of the 128-bit
//! integer) encode the version nibble, and 2 bits (at positions 64-65) encode
//! the RFC 4122 variant. Adding `k` to a [`StableId`] means adding `k` to the
//! remaining 122 bits, packed back-to-back with the fixed bits removed, and
//! then re-inserting the fixed bits at their original positions.
//!
//! Layout (bit 0 = least significant bit of `Uuid::as_u128()`):
//!
//! ```text
//! [ segment C: 62 bits ][ variant: 2 ][ segment B: 12 bits ][ version: 4 ][ segment A: 48 bits ]
//!  bits 127..66           65..64        63..52                51..48        47..0
//! ```

use crate::error::{Error, Result};
use crate::types::StableId;

const SEG_A_BITS: u32 = 48;
const SEG_B_BITS: u32 = 12;
const PAYLOAD_BITS: u32 = 122;

const SEG_A_MASK: u128 = (1u128 << SEG_A_BITS) - 1;
const SEG_B_MASK: u128 = (1u128 << SEG_B_BITS) - 1;

const VERSION_SHIFT: u32 = 48;
const VERSION_NIBBLE: u128 = 0x4;
const VARIANT_SHIFT: u32 = 64;
const VARIANT_BITS: u128 = 0b10;
const SEG_B_SHIFT_IN_RAW: u32 = 52;
const SEG_C_SHIFT_IN_RAW: u32 = 66;

const SEG_B_SHIFT_IN_PAYLOAD: u32 = SEG_A_BITS;
const SEG_C_SHIFT_IN_PAYLOAD: u32 = SEG_A_BITS + SEG_B_BITS;

/// Largest value a 122-bit payload may hold.
pub const MAX_PAYLOAD: u128 = (1u128 << PAYLOAD_BITS) - 1;

fn payload_of(raw: u128) -> u128 {
    let seg_a = raw & SEG_A_MASK;
    let seg_b = (raw >> SEG_B_SHIFT_IN_RAW) & SEG_B_MASK;
    let seg_c = raw >> SEG_C_SHIFT_IN_RAW;
    (seg_c << SEG_C_SHIFT_IN_PAYLOAD) | (seg_b << SEG_B_SHIFT_IN_PAYLOAD) | seg_a
}

fn raw_of(payload: u128) -> u128 {
    let seg_a = payload & SEG_A_MASK;
    let seg_b = (payload >> SEG_B_SHIFT_IN_PAYLOAD) & SEG_B_MASK;
    let seg_c = payload >> SEG_C_SHIFT_IN_PAYLOAD;
    seg_a
        | (VERSION_NIBBLE << VERSION_SHIFT)
        | (seg_b << SEG_B_SHIFT_IN_RAW)
        | (VARIANT_BITS << VARIANT_SHIFT)
        | (seg_c << SEG_C_SHIFT_IN_RAW)
}

/// Adds `k` to `u`'s 122-bit payload, preserving the version/variant bits.
///
/// Fails with [`Error::Overflow`] if the result would not fit in 122 bits.
pub fn add(u: StableId, k: u64) -> Result<StableId> {
    let payload = payload_of(u.as_u128());
    let new_payload = payload
        .checked_add(k as u128)
        .filter(|p| *p <= MAX_PAYLOAD)
        .ok_or_else(|| Error::overflow("uuid arithmetic would exceed the 122-bit payload"))?;
    Ok(StableId::from_u128(raw_of(new_payload)))
}

/// Returns `u1`'s payload minus `u2`'s payload, as a signed offset.
///
/// The result is negative when `u1` sorts before `u2` in payload order.
pub fn subtract(u1: StableId, u2: StableId) -> i128 {
    payload_of(u1.as_u128()) as i128 - payload_of(u2.as_u128()) as i128
}
