// crates/slotbus-rs-apdd/src/resolver.rs

//! Resolves the raw document model into the `slotbus-rs` descriptor types:
//! parses numeric attributes, decodes hex payloads and checks id references.

use crate::error::ApddError;
use crate::model;
use crate::parser::{parse_hex_payload, parse_u16, parse_u32};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use slotbus_rs::descriptor::{
    ChannelGroup, ChannelGroupEntry, ChannelTemplate, DataKind, DeviceDescriptor, Direction,
    EnumType, ParameterDescriptor, ParameterGroup, Variant,
};

fn data_kind(value: &str, attribute: &'static str) -> Result<DataKind, ApddError> {
    Ok(match value {
        "BOOL" => DataKind::Bool,
        "INT8" => DataKind::Int8,
        "UINT8" => DataKind::UInt8,
        "INT16" => DataKind::Int16,
        "UINT16" => DataKind::UInt16,
        "BYTES" => DataKind::Bytes,
        other => {
            return Err(ApddError::InvalidAttributeValue {
                attribute,
                value: other.to_string(),
            });
        }
    })
}

fn direction(value: &str) -> Result<Direction, ApddError> {
    Ok(match value {
        "IN" => Direction::In,
        "OUT" => Direction::Out,
        "INOUT" => Direction::InOut,
        other => {
            return Err(ApddError::InvalidAttributeValue {
                attribute: "direction",
                value: other.to_string(),
            });
        }
    })
}

fn writable(access: &str) -> Result<bool, ApddError> {
    match access {
        "readWrite" | "writeOnly" => Ok(true),
        "readOnly" => Ok(false),
        other => Err(ApddError::InvalidAttributeValue {
            attribute: "access",
            value: other.to_string(),
        }),
    }
}

fn resolve_channel_type(model: &model::ChannelType) -> Result<ChannelTemplate, ApddError> {
    let kind = data_kind(&model.data_type, "dataType")?;
    Ok(ChannelTemplate {
        id: model.id.clone(),
        data_kind: kind,
        bit_width: model.bit_width.unwrap_or_else(|| kind.bit_width()),
        array_length: model.count.max(1),
        direction: direction(&model.direction)?,
        byte_swap: model.byte_swap,
    })
}

fn resolve_parameter(
    model: &model::Parameter,
    enum_types: &[EnumType],
) -> Result<ParameterDescriptor, ApddError> {
    let enum_type = match &model.enum_ref {
        None => None,
        Some(id) => Some(
            enum_types
                .iter()
                .find(|e| &e.id == id)
                .cloned()
                .ok_or_else(|| ApddError::UnknownReference {
                    kind: "EnumType",
                    id: id.clone(),
                })?,
        ),
    };
    let default_value = model
        .default_value
        .as_deref()
        .map(parse_hex_payload)
        .transpose()?;
    let instance_min = model.instance_min;
    Ok(ParameterDescriptor {
        id: parse_u16(&model.id)?,
        instance_range: (instance_min, model.instance_max.unwrap_or(instance_min)),
        writable: writable(&model.access)?,
        array_size: model.count.max(1),
        data_kind: data_kind(&model.data_type, "dataType")?,
        default_value,
        enum_type,
    })
}

fn ids(refs: &[model::IdRef]) -> Vec<String> {
    refs.iter().map(|r| r.id.clone()).collect()
}

/// Resolves a deserialized document into a [`DeviceDescriptor`].
pub(crate) fn resolve(document: &model::ApddDocument) -> Result<DeviceDescriptor, ApddError> {
    let enum_types: Vec<EnumType> = document
        .enum_type_list
        .as_ref()
        .map(|list| {
            list.enum_type
                .iter()
                .map(|e| EnumType {
                    id: e.id.clone(),
                    items: e.item.iter().map(|i| (i.label.clone(), i.value)).collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    let channel_types: Vec<ChannelTemplate> = document
        .channel_type_list
        .as_ref()
        .map(|list| {
            list.channel_type
                .iter()
                .map(resolve_channel_type)
                .collect::<Result<_, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let channel_groups: Vec<ChannelGroup> = document
        .channel_group_list
        .as_ref()
        .map(|list| {
            list.channel_group
                .iter()
                .map(|g| {
                    // Dangling typeRefs are tolerated here; the layout
                    // builder skips them with a diagnostic.
                    for entry in &g.channel {
                        if !channel_types.iter().any(|t| t.id == entry.type_ref) {
                            log::warn!(
                                "Channel group '{}' references undeclared channel type '{}'",
                                g.id,
                                entry.type_ref
                            );
                        }
                    }
                    ChannelGroup {
                        id: g.id.clone(),
                        entries: g
                            .channel
                            .iter()
                            .map(|c| ChannelGroupEntry {
                                channel_type_id: c.type_ref.clone(),
                                repeat_count: c.repeat.max(1),
                            })
                            .collect(),
                        parameter_group_ids: ids(&g.parameter_group_ref),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let parameters: Vec<ParameterDescriptor> = document
        .parameter_list
        .as_ref()
        .map(|list| {
            list.parameter
                .iter()
                .map(|p| resolve_parameter(p, &enum_types))
                .collect::<Result<_, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let parameter_groups: Vec<ParameterGroup> = document
        .parameter_group_list
        .as_ref()
        .map(|list| {
            list.parameter_group
                .iter()
                .map(|g| {
                    Ok(ParameterGroup {
                        id: g.id.clone(),
                        parameter_ids: g
                            .parameter_ref
                            .iter()
                            .map(|r| parse_u16(&r.id).map_err(ApddError::from))
                            .collect::<Result<_, ApddError>>()?,
                    })
                })
                .collect::<Result<_, ApddError>>()
        })
        .transpose()?
        .unwrap_or_default();

    let variant_list = document
        .variant_list
        .as_ref()
        .ok_or(ApddError::MissingElement {
            element: "VariantList",
        })?;
    let variants: Vec<Variant> = variant_list
        .variant
        .iter()
        .map(|v| {
            Ok(Variant {
                name: v.name.clone(),
                class: v.class.clone(),
                module_code: parse_u32(&v.module_code)?,
                order_number: v.order_number.clone(),
                channel_group_ids: ids(&v.channel_group_ref),
                parameter_group_ids: ids(&v.parameter_group_ref),
                input_register_override: v.input_registers,
                legacy_protocol: v.legacy_protocol,
            })
        })
        .collect::<Result<_, ApddError>>()?;

    Ok(DeviceDescriptor {
        channel_types,
        channel_groups,
        parameters,
        parameter_groups,
        enum_types,
        variants,
    })
}
