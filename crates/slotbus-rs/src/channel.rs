//! Channel layout builder.
//!
//! Expands the channel groups referenced by a variant into a flat, ordered
//! list of channel instances with resolved bit widths and bit offsets.
//! Declaration order is semantically significant: it fixes the channel
//! numbering exposed to callers.

use crate::descriptor::{DataKind, DeviceDescriptor, Direction, Variant};
use alloc::string::String;
use alloc::vec::Vec;

/// One resolved channel instance within a module's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Id of the channel type template this instance was expanded from.
    pub type_id: String,
    /// Id of the channel group that declared it.
    pub group_id: String,
    pub data_kind: DataKind,
    pub bit_width: u16,
    /// Number of elements; `1` for scalars.
    pub array_length: u16,
    /// Offset of the first bit, counted from the start of the
    /// direction-specific frame.
    pub bit_offset: u32,
    pub direction: Direction,
    pub byte_swap: bool,
}

impl Channel {
    /// Total bit span of this channel, including all array elements.
    pub fn total_bits(&self) -> u32 {
        u32::from(self.bit_width) * u32::from(self.array_length.max(1))
    }
}

/// Total bit length of a layout (offset past the last declared channel).
pub fn frame_bit_length(channels: &[Channel]) -> u32 {
    channels
        .iter()
        .map(|c| c.bit_offset + c.total_bits())
        .max()
        .unwrap_or(0)
}

/// Byte size of the direction-specific frame covering a layout.
pub fn frame_byte_length(channels: &[Channel]) -> usize {
    frame_bit_length(channels).div_ceil(8) as usize
}

/// Builds the ordered channel list of `variant` for one direction view.
///
/// Channel groups are walked in the order the variant lists them, each
/// group's entries in declaration order, each entry repeated `repeat_count`
/// times. Bit offsets are assigned from cumulative per-direction cursors;
/// `In`, `Out` and `InOut` run on independent cursors, and `InOut` channels
/// appear in both the input and the output view (same physical bits).
///
/// Entries whose channel type lookup fails are skipped with a diagnostic,
/// tolerating sparse or legacy descriptors.
pub fn build_channels(
    descriptor: &DeviceDescriptor,
    variant: &Variant,
    view: Direction,
) -> Vec<Channel> {
    let mut channels = Vec::new();
    // Cursors per declared direction, not per view: an InOut channel sits at
    // the same offset in both views.
    let mut cursor_in: u32 = 0;
    let mut cursor_out: u32 = 0;
    let mut cursor_inout: u32 = 0;

    for group_id in &variant.channel_group_ids {
        let Some(group) = descriptor.channel_group(group_id) else {
            log::warn!("Variant '{}' references unknown channel group '{}'", variant.name, group_id);
            continue;
        };
        for entry in &group.entries {
            let Some(template) = descriptor.channel_type(&entry.channel_type_id) else {
                log::warn!(
                    "Channel group '{}' references unknown channel type '{}'; skipping",
                    group.id,
                    entry.channel_type_id
                );
                continue;
            };
            let cursor = match template.direction {
                Direction::In => &mut cursor_in,
                Direction::Out => &mut cursor_out,
                Direction::InOut => &mut cursor_inout,
            };
            for _ in 0..entry.repeat_count {
                let bit_offset = *cursor;
                *cursor += u32::from(template.bit_width) * u32::from(template.array_length.max(1));
                if !template.direction.applies_to(view) {
                    continue;
                }
                channels.push(Channel {
                    type_id: template.id.clone(),
                    group_id: group.id.clone(),
                    data_kind: template.data_kind,
                    bit_width: template.bit_width,
                    array_length: template.array_length.max(1),
                    bit_offset,
                    direction: template.direction,
                    byte_swap: template.byte_swap,
                });
            }
        }
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ChannelGroup, ChannelGroupEntry, ChannelTemplate};
    use alloc::string::ToString;
    use alloc::vec;

    fn template(id: &str, kind: DataKind, bits: u16, len: u16, dir: Direction) -> ChannelTemplate {
        ChannelTemplate {
            id: id.to_string(),
            data_kind: kind,
            bit_width: bits,
            array_length: len,
            direction: dir,
            byte_swap: false,
        }
    }

    fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor {
            channel_types: vec![
                template("CT_DI", DataKind::Bool, 1, 1, Direction::In),
                template("CT_AI", DataKind::Int16, 16, 1, Direction::In),
                template("CT_DO", DataKind::Bool, 1, 1, Direction::Out),
                template("CT_IOL", DataKind::Bytes, 8, 4, Direction::InOut),
            ],
            channel_groups: vec![
                ChannelGroup {
                    id: "CG_MIXED".to_string(),
                    entries: vec![
                        ChannelGroupEntry {
                            channel_type_id: "CT_DI".to_string(),
                            repeat_count: 4,
                        },
                        ChannelGroupEntry {
                            channel_type_id: "CT_AI".to_string(),
                            repeat_count: 2,
                        },
                        ChannelGroupEntry {
                            channel_type_id: "CT_DO".to_string(),
                            repeat_count: 2,
                        },
                        ChannelGroupEntry {
                            channel_type_id: "CT_IOL".to_string(),
                            repeat_count: 1,
                        },
                    ],
                    parameter_group_ids: vec![],
                },
            ],
            ..Default::default()
        }
    }

    fn variant() -> Variant {
        Variant {
            name: "MIXED".to_string(),
            class: "COM".to_string(),
            module_code: 1,
            order_number: "0".to_string(),
            channel_group_ids: vec!["CG_MIXED".to_string()],
            parameter_group_ids: vec![],
            input_register_override: None,
            legacy_protocol: false,
        }
    }

    #[test]
    fn input_view_offsets_run_on_the_input_cursor() {
        let d = descriptor();
        let input = build_channels(&d, &variant(), Direction::In);
        // 4 DI bits, 2 AI words, 1 InOut byte stream.
        assert_eq!(input.len(), 7);
        assert_eq!(input[0].bit_offset, 0);
        assert_eq!(input[3].bit_offset, 3);
        assert_eq!(input[4].bit_offset, 4); // first AI directly after the DI bits
        assert_eq!(input[5].bit_offset, 20);
        // The InOut stream runs on its own cursor.
        assert_eq!(input[6].bit_offset, 0);
        assert_eq!(input[6].total_bits(), 32);
    }

    #[test]
    fn inout_channels_appear_in_both_views() {
        let d = descriptor();
        let input = build_channels(&d, &variant(), Direction::In);
        let output = build_channels(&d, &variant(), Direction::Out);
        assert!(input.iter().any(|c| c.type_id == "CT_IOL"));
        assert!(output.iter().any(|c| c.type_id == "CT_IOL"));
        // 2 DO bits + the InOut stream.
        assert_eq!(output.len(), 3);
        assert_eq!(output[0].bit_offset, 0);
        assert_eq!(output[1].bit_offset, 1);
    }

    #[test]
    fn unknown_channel_type_is_skipped() {
        let mut d = descriptor();
        d.channel_groups[0].entries.push(ChannelGroupEntry {
            channel_type_id: "CT_MISSING".to_string(),
            repeat_count: 3,
        });
        let input = build_channels(&d, &variant(), Direction::In);
        assert_eq!(input.len(), 7);
    }

    #[test]
    fn frame_byte_length_rounds_up() {
        let d = descriptor();
        let input = build_channels(&d, &variant(), Direction::In);
        // 4 bits + 32 bits of analog data = 36 bits -> 5 bytes.
        assert_eq!(frame_bit_length(&input), 36);
        assert_eq!(frame_byte_length(&input), 5);
    }
}
