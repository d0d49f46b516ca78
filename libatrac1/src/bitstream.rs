//! Bit-exact sound-unit serialization.
//!
//! A sound unit is 212 bytes: a 16-bit header (block-mode codes, BFU-amount
//! index, zero padding), the per-BFU word-length and scale-factor index
//! arrays, the two's-complement coefficient fields, and zero fill to the end
//! of the unit. All fields are packed MSB-first.

use crate::core::constants::{
    BFU_AMOUNTS, BFU_SIZES, FRAME_BITS, SOUND_UNIT_SIZE, WORD_LENGTH_BITS,
};
use crate::core::types::{BlockModes, EncodedFrame};
use crate::error::{AtracError, AtracResult};

/// Write the low `bits` bits of `value` into `buf` starting at `bit_offset`,
/// MSB first. Target bits must currently be zero.
pub fn pack_bits(buf: &mut [u8], bit_offset: usize, value: u32, bits: u32) {
    debug_assert!(bits <= 32);
    debug_assert!(bit_offset + bits as usize <= buf.len() * 8);

    let mut remaining = bits;
    let mut pos = bit_offset;
    while remaining > 0 {
        let byte = pos / 8;
        let used = pos % 8;
        let chunk = remaining.min(8 - used as u32);
        let shift = remaining - chunk;
        let piece = ((value >> shift) & ((1u32 << chunk) - 1)) as u8;
        buf[byte] |= piece << (8 - used as u32 - chunk);
        pos += chunk as usize;
        remaining -= chunk;
    }
}

/// Read `bits` bits from `buf` starting at `bit_offset`, MSB first.
pub fn unpack_bits(buf: &[u8], bit_offset: usize, bits: u32) -> u32 {
    debug_assert!(bits <= 32);
    debug_assert!(bit_offset + bits as usize <= buf.len() * 8);

    let mut value = 0u32;
    let mut remaining = bits;
    let mut pos = bit_offset;
    while remaining > 0 {
        let byte = pos / 8;
        let used = pos % 8;
        let chunk = remaining.min(8 - used as u32);
        let piece = (buf[byte] >> (8 - used as u32 - chunk)) & ((1u16 << chunk) - 1) as u8;
        value = (value << chunk) | piece as u32;
        pos += chunk as usize;
        remaining -= chunk;
    }
    value
}

fn sign_extend(raw: u32, bits: u32) -> i32 {
    if bits < 32 && (raw >> (bits - 1)) & 1 == 1 {
        (raw | (u32::MAX << bits)) as i32
    } else {
        raw as i32
    }
}

/// Pack one frame into a 212-byte sound unit.
///
/// The frame must respect the bit budget (`16 + 10*nBfu + data <= 1696`),
/// which the allocator guarantees; `n_bfu` must be one of the eight
/// selectable counts.
pub fn serialize_frame(frame: &EncodedFrame) -> [u8; SOUND_UNIT_SIZE] {
    let n_bfu = frame.n_bfu();
    let n_bfu_index = BFU_AMOUNTS
        .iter()
        .position(|&n| n == n_bfu)
        .expect("BFU count must be one of the selectable amounts");
    assert_eq!(frame.scale_factors.len(), n_bfu);
    assert_eq!(frame.coefficients.len(), n_bfu);

    let total_bits = 16 + 10 * n_bfu + frame.data_bits();
    assert!(total_bits <= FRAME_BITS, "frame exceeds the bit budget");

    let mut buf = [0u8; SOUND_UNIT_SIZE];
    let mut pos = 0;

    let mut put = |buf: &mut [u8], value: u32, bits: u32| {
        pack_bits(buf, pos, value, bits);
        pos += bits as usize;
    };

    put(&mut buf, frame.block_modes.wire_code(0), 2);
    put(&mut buf, frame.block_modes.wire_code(1), 2);
    put(&mut buf, frame.block_modes.wire_code(2), 2);
    put(&mut buf, n_bfu_index as u32, 3);
    put(&mut buf, 0, 7); // header padding to 16 bits

    for &wl in &frame.word_lengths {
        put(&mut buf, wl as u32, 4);
    }
    for &sf in &frame.scale_factors {
        put(&mut buf, sf as u32, 6);
    }
    for (i, coeffs) in frame.coefficients.iter().enumerate() {
        let bits = WORD_LENGTH_BITS[frame.word_lengths[i] as usize];
        if bits == 0 {
            continue;
        }
        debug_assert_eq!(coeffs.len(), BFU_SIZES[i]);
        let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
        for &q in coeffs {
            put(&mut buf, q as u32 & mask, bits);
        }
    }

    buf
}

/// Unpack a 212-byte sound unit. Fails with `InvalidFrameSize` when the
/// buffer length is not exactly 212.
pub fn deserialize_frame(data: &[u8]) -> AtracResult<EncodedFrame> {
    if data.len() != SOUND_UNIT_SIZE {
        return Err(AtracError::InvalidFrameSize {
            expected: SOUND_UNIT_SIZE,
            actual: data.len(),
        });
    }

    fn take(data: &[u8], pos: &mut usize, bits: u32) -> u32 {
        let v = unpack_bits(data, *pos, bits);
        *pos += bits as usize;
        v
    }

    let mut pos = 0;
    let low = take(data, &mut pos, 2);
    let mid = take(data, &mut pos, 2);
    let high = take(data, &mut pos, 2);
    let block_modes = BlockModes::from_wire_codes(low, mid, high);
    let n_bfu = BFU_AMOUNTS[take(data, &mut pos, 3) as usize];
    take(data, &mut pos, 7); // header padding

    let word_lengths: Vec<u8> = (0..n_bfu).map(|_| take(data, &mut pos, 4) as u8).collect();
    let scale_factors: Vec<u8> = (0..n_bfu).map(|_| take(data, &mut pos, 6) as u8).collect();

    let mut coefficients = Vec::with_capacity(n_bfu);
    for (i, &wl) in word_lengths.iter().enumerate() {
        let bits = WORD_LENGTH_BITS[wl as usize];
        let mut group = vec![0i32; BFU_SIZES[i]];
        // A malformed unit can claim more coefficient bits than it holds;
        // everything past the end of the unit reads as zeros.
        if bits > 0 && pos + bits as usize * group.len() <= FRAME_BITS {
            for q in group.iter_mut() {
                *q = sign_extend(take(data, &mut pos, bits), bits);
            }
        }
        coefficients.push(group);
    }

    Ok(EncodedFrame {
        block_modes,
        word_lengths,
        scale_factors,
        coefficients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_straddles_byte_boundaries() {
        let mut buf = [0u8; 4];
        pack_bits(&mut buf, 4, 0b1111_0000, 8);
        assert_eq!(buf[0], 0b0000_1111);
        assert_eq!(buf[1], 0b0000_0000);
        assert_eq!(unpack_bits(&buf, 4, 8), 0b1111_0000);
    }

    #[test]
    fn pack_unpack_various_widths() {
        let mut buf = [0u8; 8];
        let mut pos = 0;
        for (value, bits) in [(0b101u32, 3), (0xffffu32, 16), (1u32, 1), (0x155u32, 9)] {
            pack_bits(&mut buf, pos, value, bits);
            pos += bits as usize;
        }
        let mut pos = 0;
        for (value, bits) in [(0b101u32, 3), (0xffffu32, 16), (1u32, 1), (0x155u32, 9)] {
            assert_eq!(unpack_bits(&buf, pos, bits), value);
            pos += bits as usize;
        }
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0b11, 2), -1);
        assert_eq!(sign_extend(0b10, 2), -2);
        assert_eq!(sign_extend(0b01, 2), 1);
        assert_eq!(sign_extend(0x1ff, 9), -1);
        assert_eq!(sign_extend(0x0ff, 9), 255);
    }
}
