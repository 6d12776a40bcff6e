//! Process-data codec.
//!
//! Translates between raw frame bytes and typed channel values, driven
//! entirely by the resolved channel layout: declared bit width, bit offset,
//! data kind, array length and byte order. Channel bit offsets are counted
//! from the start of the frame in natural bit order (bit 0 = LSB of byte 0).
//! Multi-byte integer channels interpret their bytes high-byte-first, the
//! register wire order; `byte_swap` reverses each element first.

use crate::channel::{Channel, frame_byte_length};
use crate::descriptor::DataKind;
use crate::hal::FieldbusError;
use alloc::vec;
use alloc::vec::Vec;

/// A typed process-data value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessValue {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    /// Opaque byte sequence (e.g. an IO-Link payload).
    Bytes(Vec<u8>),
    BoolArray(Vec<bool>),
    Int8Array(Vec<i8>),
    UInt8Array(Vec<u8>),
    Int16Array(Vec<i16>),
    UInt16Array(Vec<u16>),
}

impl ProcessValue {
    /// The data kind this value is an instance of.
    pub fn data_kind(&self) -> DataKind {
        match self {
            ProcessValue::Bool(_) | ProcessValue::BoolArray(_) => DataKind::Bool,
            ProcessValue::Int8(_) | ProcessValue::Int8Array(_) => DataKind::Int8,
            ProcessValue::UInt8(_) | ProcessValue::UInt8Array(_) => DataKind::UInt8,
            ProcessValue::Int16(_) | ProcessValue::Int16Array(_) => DataKind::Int16,
            ProcessValue::UInt16(_) | ProcessValue::UInt16Array(_) => DataKind::UInt16,
            ProcessValue::Bytes(_) => DataKind::Bytes,
        }
    }
}

// --- Bit-granular frame access ---

/// Extracts `bit_count` bits starting at `bit_offset` into an LSB-aligned
/// byte buffer.
fn extract_bits(frame: &[u8], bit_offset: u32, bit_count: u32) -> Result<Vec<u8>, FieldbusError> {
    let end = bit_offset
        .checked_add(bit_count)
        .ok_or(FieldbusError::BufferTooShort)?;
    if end as usize > frame.len() * 8 {
        return Err(FieldbusError::BufferTooShort);
    }
    let mut out = vec![0u8; (bit_count as usize).div_ceil(8)];
    for i in 0..bit_count {
        let src = (bit_offset + i) as usize;
        if frame[src / 8] & (1 << (src % 8)) != 0 {
            out[(i / 8) as usize] |= 1 << (i % 8);
        }
    }
    Ok(out)
}

/// Writes `bit_count` LSB-aligned bits into `frame` at `bit_offset`,
/// clearing the target range first.
fn insert_bits(
    frame: &mut [u8],
    bit_offset: u32,
    bit_count: u32,
    bits: &[u8],
) -> Result<(), FieldbusError> {
    let end = bit_offset
        .checked_add(bit_count)
        .ok_or(FieldbusError::BufferTooShort)?;
    if end as usize > frame.len() * 8 {
        return Err(FieldbusError::BufferTooShort);
    }
    for i in 0..bit_count {
        let dst = (bit_offset + i) as usize;
        let set = bits[(i / 8) as usize] & (1 << (i % 8)) != 0;
        if set {
            frame[dst / 8] |= 1 << (dst % 8);
        } else {
            frame[dst / 8] &= !(1 << (dst % 8));
        }
    }
    Ok(())
}

/// Reverses the byte order of each `element_bytes`-wide element in place.
fn swap_elements(buf: &mut [u8], element_bytes: usize) {
    if element_bytes < 2 {
        return;
    }
    for chunk in buf.chunks_exact_mut(element_bytes) {
        chunk.reverse();
    }
}

fn element_bytes(channel: &Channel) -> usize {
    (channel.bit_width as usize).div_ceil(8)
}

/// Whether byte-order reversal applies: multi-byte widths only.
fn swaps(channel: &Channel) -> bool {
    channel.byte_swap && channel.bit_width >= 16 && channel.bit_width % 8 == 0
}

// --- Decode ---

/// Decodes one channel out of a raw frame.
pub fn decode_channel(frame: &[u8], channel: &Channel) -> Result<ProcessValue, FieldbusError> {
    let mut raw = extract_bits(frame, channel.bit_offset, channel.total_bits())?;
    if swaps(channel) {
        swap_elements(&mut raw, element_bytes(channel));
    }
    interpret(&raw, channel)
}

fn interpret(raw: &[u8], channel: &Channel) -> Result<ProcessValue, FieldbusError> {
    let n = channel.array_length.max(1) as usize;
    let kind = channel.data_kind;

    if kind == DataKind::Bytes {
        // Left opaque; length is the element count in bytes.
        let mut bytes = raw.to_vec();
        bytes.truncate(n * element_bytes(channel));
        return Ok(ProcessValue::Bytes(bytes));
    }

    if n == 1 {
        return Ok(scalar(raw, 0, channel)?);
    }

    // Arrays of numeric kinds decode element-by-element over contiguous
    // sub-slices; BOOL arrays are LSB-first within the extracted slice.
    Ok(match kind {
        DataKind::Bool => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(raw[i / 8] & (1 << (i % 8)) != 0);
            }
            ProcessValue::BoolArray(v)
        }
        DataKind::Int8 => ProcessValue::Int8Array(raw[..n].iter().map(|&b| b as i8).collect()),
        DataKind::UInt8 => ProcessValue::UInt8Array(raw[..n].to_vec()),
        DataKind::Int16 => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(i16::from_be_bytes([raw[i * 2], raw[i * 2 + 1]]));
            }
            ProcessValue::Int16Array(v)
        }
        DataKind::UInt16 => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(u16::from_be_bytes([raw[i * 2], raw[i * 2 + 1]]));
            }
            ProcessValue::UInt16Array(v)
        }
        DataKind::Bytes => unreachable!(),
    })
}

fn scalar(raw: &[u8], elem: usize, channel: &Channel) -> Result<ProcessValue, FieldbusError> {
    Ok(match channel.data_kind {
        DataKind::Bool => ProcessValue::Bool(raw[elem / 8] & (1 << (elem % 8)) != 0),
        DataKind::Int8 => ProcessValue::Int8(raw[elem] as i8),
        DataKind::UInt8 => ProcessValue::UInt8(raw[elem]),
        DataKind::Int16 => {
            ProcessValue::Int16(i16::from_be_bytes([raw[elem * 2], raw[elem * 2 + 1]]))
        }
        DataKind::UInt16 => {
            ProcessValue::UInt16(u16::from_be_bytes([raw[elem * 2], raw[elem * 2 + 1]]))
        }
        DataKind::Bytes => ProcessValue::Bytes(raw.to_vec()),
    })
}

/// Decodes a full frame into one typed value per channel, in layout order.
///
/// Homogeneous layouts (all single BOOL bits, or all scalar 16-bit integers
/// of one kind without byte swap) take a bulk path; mixed-type layouts
/// decode channel-by-channel.
pub fn decode_frame(frame: &[u8], channels: &[Channel]) -> Result<Vec<ProcessValue>, FieldbusError> {
    if let Some(values) = decode_bulk(frame, channels)? {
        return Ok(values);
    }
    channels.iter().map(|c| decode_channel(frame, c)).collect()
}

/// Bulk fast path; `Ok(None)` means the layout is not homogeneous.
fn decode_bulk(
    frame: &[u8],
    channels: &[Channel],
) -> Result<Option<Vec<ProcessValue>>, FieldbusError> {
    if channels.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let all_bits = channels
        .iter()
        .all(|c| c.data_kind == DataKind::Bool && c.bit_width == 1 && c.array_length <= 1);
    if all_bits {
        let needed = channels
            .iter()
            .map(|c| c.bit_offset + 1)
            .max()
            .unwrap_or(0) as usize;
        if needed > frame.len() * 8 {
            return Err(FieldbusError::BufferTooShort);
        }
        let values = channels
            .iter()
            .map(|c| {
                let b = c.bit_offset as usize;
                ProcessValue::Bool(frame[b / 8] & (1 << (b % 8)) != 0)
            })
            .collect();
        return Ok(Some(values));
    }

    let kind = channels[0].data_kind;
    let all_words = matches!(kind, DataKind::Int16 | DataKind::UInt16)
        && channels.iter().all(|c| {
            c.data_kind == kind && c.bit_width == 16 && c.array_length <= 1 && !c.byte_swap
        });
    if all_words {
        let mut values = Vec::with_capacity(channels.len());
        for c in channels {
            if c.bit_offset % 8 != 0 {
                return Ok(None); // oddly aligned word; take the general path
            }
            let at = (c.bit_offset / 8) as usize;
            if at + 2 > frame.len() {
                return Err(FieldbusError::BufferTooShort);
            }
            values.push(match kind {
                DataKind::Int16 => {
                    ProcessValue::Int16(i16::from_be_bytes([frame[at], frame[at + 1]]))
                }
                _ => ProcessValue::UInt16(u16::from_be_bytes([frame[at], frame[at + 1]])),
            });
        }
        return Ok(Some(values));
    }
    Ok(None)
}

// --- Encode ---

fn raw_from_value(value: &ProcessValue, channel: &Channel) -> Result<Vec<u8>, FieldbusError> {
    if value.data_kind() != channel.data_kind {
        return Err(FieldbusError::TypeMismatch {
            expected: channel.data_kind,
            found: value.data_kind(),
        });
    }
    let n = channel.array_length.max(1) as usize;
    let raw = match value {
        ProcessValue::Bool(b) => vec![u8::from(*b)],
        ProcessValue::Int8(v) => vec![*v as u8],
        ProcessValue::UInt8(v) => vec![*v],
        ProcessValue::Int16(v) => v.to_be_bytes().to_vec(),
        ProcessValue::UInt16(v) => v.to_be_bytes().to_vec(),
        ProcessValue::Bytes(bytes) => {
            if bytes.len() != n * element_bytes(channel) {
                return Err(FieldbusError::BufferTooShort);
            }
            bytes.clone()
        }
        ProcessValue::BoolArray(bits) => {
            if bits.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            let mut out = vec![0u8; n.div_ceil(8)];
            for (i, &b) in bits.iter().enumerate() {
                if b {
                    out[i / 8] |= 1 << (i % 8);
                }
            }
            out
        }
        ProcessValue::Int8Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().map(|&x| x as u8).collect()
        }
        ProcessValue::UInt8Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.clone()
        }
        ProcessValue::Int16Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().flat_map(|x| x.to_be_bytes()).collect()
        }
        ProcessValue::UInt16Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().flat_map(|x| x.to_be_bytes()).collect()
        }
    };
    Ok(raw)
}

/// Encodes one channel value into an existing frame, clearing and rewriting
/// only the channel's bit range. This is the read-modify-write primitive
/// behind single-channel writes; it is not atomic with respect to concurrent
/// writers of other channels in the same frame.
pub fn encode_channel(
    frame: &mut [u8],
    channel: &Channel,
    value: &ProcessValue,
) -> Result<(), FieldbusError> {
    let mut raw = raw_from_value(value, channel)?;
    if swaps(channel) {
        swap_elements(&mut raw, element_bytes(channel));
    }
    insert_bits(frame, channel.bit_offset, channel.total_bits(), &raw)
}

/// Encodes a full value list over a previous frame, returning the new frame.
///
/// The previous frame supplies the don't-care padding bits outside any
/// declared channel; pass a zeroed buffer when no read-back is available.
pub fn encode_frame(
    values: &[ProcessValue],
    channels: &[Channel],
    previous: &[u8],
) -> Result<Vec<u8>, FieldbusError> {
    if values.len() != channels.len() {
        return Err(FieldbusError::ChannelIndexOutOfRange {
            index: values.len(),
            len: channels.len(),
        });
    }
    let len = frame_byte_length(channels).max(previous.len());
    let mut frame = vec![0u8; len];
    frame[..previous.len()].copy_from_slice(previous);
    for (value, channel) in values.iter().zip(channels) {
        encode_channel(&mut frame, channel, value)?;
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Direction;
    use alloc::string::ToString;

    fn channel(kind: DataKind, bits: u16, len: u16, offset: u32, swap: bool) -> Channel {
        Channel {
            type_id: "CT".to_string(),
            group_id: "CG".to_string(),
            data_kind: kind,
            bit_width: bits,
            array_length: len,
            bit_offset: offset,
            direction: Direction::In,
            byte_swap: swap,
        }
    }

    #[test]
    fn bool_array_decodes_lsb_first() {
        let c = channel(DataKind::Bool, 1, 8, 0, false);
        let v = decode_channel(&[0xB3], &c).unwrap();
        assert_eq!(
            v,
            ProcessValue::BoolArray(alloc::vec![
                true, true, false, false, true, true, false, true
            ])
        );
    }

    #[test]
    fn swapped_signed_word_fixture() {
        // Raw register pair 0xAA 0xBB 0xCC 0xDD: the first 16-bit channel
        // byte-swaps to 0xBBAA = -17494 as i16.
        let c = channel(DataKind::Int16, 16, 1, 0, true);
        let v = decode_channel(&[0xAA, 0xBB, 0xCC, 0xDD], &c).unwrap();
        assert_eq!(v, ProcessValue::Int16(-17494));
    }

    #[test]
    fn unswapped_word_is_high_byte_first() {
        let c = channel(DataKind::UInt16, 16, 1, 16, false);
        let v = decode_channel(&[0x00, 0x00, 0x12, 0x34], &c).unwrap();
        assert_eq!(v, ProcessValue::UInt16(0x1234));
    }

    #[test]
    fn unaligned_bit_offset() {
        // A 8-bit unsigned channel straddling a byte boundary at bit 4.
        let c = channel(DataKind::UInt8, 8, 1, 4, false);
        let v = decode_channel(&[0xF0, 0x0A], &c).unwrap();
        assert_eq!(v, ProcessValue::UInt8(0xAF));
    }

    #[test]
    fn bytes_kind_stays_opaque() {
        let c = channel(DataKind::Bytes, 8, 3, 8, false);
        let v = decode_channel(&[0x00, 0xDE, 0xAD, 0xBE], &c).unwrap();
        assert_eq!(v, ProcessValue::Bytes(alloc::vec![0xDE, 0xAD, 0xBE]));
    }

    #[test]
    fn int16_array_decodes_per_element() {
        let c = channel(DataKind::Int16, 16, 2, 0, true);
        let v = decode_channel(&[0xAA, 0xBB, 0xFF, 0x7F], &c).unwrap();
        assert_eq!(v, ProcessValue::Int16Array(alloc::vec![-17494, 32767]));
    }

    #[test]
    fn decode_past_frame_end_fails() {
        let c = channel(DataKind::UInt16, 16, 1, 8, false);
        assert_eq!(
            decode_channel(&[0x00, 0x00], &c).err().unwrap(),
            FieldbusError::BufferTooShort
        );
    }

    #[test]
    fn round_trip_reproduces_frame() {
        let channels = alloc::vec![
            channel(DataKind::Bool, 1, 4, 0, false),
            channel(DataKind::Int16, 16, 1, 4, true),
            channel(DataKind::UInt8, 8, 2, 20, false),
        ];
        let frame = alloc::vec![0x5A, 0xC3, 0x99, 0x42, 0x17];
        let values = decode_frame(&frame, &channels).unwrap();
        let rebuilt = encode_frame(&values, &channels, &frame).unwrap();
        assert_eq!(rebuilt, frame);
    }

    #[test]
    fn encode_preserves_neighbouring_bits() {
        let target = channel(DataKind::Bool, 1, 1, 3, false);
        let mut frame = alloc::vec![0b1111_0111];
        encode_channel(&mut frame, &target, &ProcessValue::Bool(true)).unwrap();
        assert_eq!(frame[0], 0xFF);
        encode_channel(&mut frame, &target, &ProcessValue::Bool(false)).unwrap();
        assert_eq!(frame[0], 0b1111_0111);
    }

    #[test]
    fn encode_rejects_wrong_kind() {
        let c = channel(DataKind::Int16, 16, 1, 0, false);
        let err = encode_channel(&mut [0u8; 2], &c, &ProcessValue::UInt16(1)).unwrap_err();
        assert_eq!(
            err,
            FieldbusError::TypeMismatch {
                expected: DataKind::Int16,
                found: DataKind::UInt16,
            }
        );
    }

    #[test]
    fn bulk_bool_path_matches_general_path() {
        let channels: Vec<Channel> = (0..16)
            .map(|i| channel(DataKind::Bool, 1, 1, i, false))
            .collect();
        let frame = [0x3C, 0xA5];
        let bulk = decode_frame(&frame, &channels).unwrap();
        let general: Vec<ProcessValue> = channels
            .iter()
            .map(|c| decode_channel(&frame, c).unwrap())
            .collect();
        assert_eq!(bulk, general);
    }

    #[test]
    fn bulk_word_path_matches_general_path() {
        let channels: Vec<Channel> = (0..4)
            .map(|i| channel(DataKind::UInt16, 16, 1, i * 16, false))
            .collect();
        let frame = [0x01, 0x00, 0xFF, 0xFF, 0x34, 0x12, 0x00, 0x80];
        let bulk = decode_frame(&frame, &channels).unwrap();
        let general: Vec<ProcessValue> = channels
            .iter()
            .map(|c| decode_channel(&frame, c).unwrap())
            .collect();
        assert_eq!(bulk, general);
    }
}
