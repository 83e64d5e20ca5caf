//! XML API registry front-end (the `vk.xml` layout).
//!
//! Reads enum groups from `<enums>` blocks, merges enumerants that features
//! and extensions add via `<enum extends="...">`, and collects struct
//! definitions for initializer templates.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::lexer::parse_int_literal;
use super::{
    EnumKind, RawGroup, RawMember, RawStruct, RawValue, Schema, SchemaError, StructField,
};

/// Base of the value range reserved for extension enumerants.
const EXT_BASE: i128 = 1_000_000_000;
/// Size of the value block each extension owns.
const EXT_BLOCK: i128 = 1000;

pub fn parse_registry(text: &str) -> Result<Schema, SchemaError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut schema = Schema::new();
    let mut state = RegistryState::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            SchemaError::Registry(format!(
                "malformed XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(e) => state.open(&e, false, &mut schema)?,
            Event::Empty(e) => state.open(&e, true, &mut schema)?,
            Event::End(e) => state.close(e.name().as_ref(), &mut schema),
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| SchemaError::Registry(format!("bad text: {e}")))?;
                state.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if state.depth != 0 {
        return Err(SchemaError::Registry("unexpected end of document".into()));
    }

    for mut ext in state.extensions {
        match schema.group_mut(&ext.extends) {
            Some(group) => {
                if let Some(pos) = ext.bitpos {
                    ext.member.value = bit_value(pos, group.bit_width);
                }
                group.members.push(ext.member);
            }
            None => tracing::debug!(
                group = %ext.extends,
                member = %ext.member.name,
                "extension extends unknown group"
            ),
        }
    }

    Ok(schema)
}

struct ExtensionEnum {
    extends: String,
    member: RawMember,
    /// Set for `bitpos` entries, whose literal spelling depends on the
    /// target group's width.
    bitpos: Option<u32>,
}

#[derive(Default)]
struct MemberBuilder {
    field: StructField,
    /// Which child element's text is being read: `type` or `name`.
    capture: Option<&'static str>,
    /// Nested elements we ignore the text of (e.g. `<comment>`, `<enum>`).
    ignored_depth: usize,
}

#[derive(Default)]
struct RegistryState {
    depth: usize,
    group: Option<RawGroup>,
    extension_number: Option<i128>,
    extensions: Vec<ExtensionEnum>,
    struct_def: Option<RawStruct>,
    member: Option<MemberBuilder>,
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, SchemaError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SchemaError::Registry(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SchemaError::Registry(format!("bad attribute value: {e}")))?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

impl RegistryState {
    fn open(
        &mut self,
        e: &BytesStart<'_>,
        is_empty: bool,
        schema: &mut Schema,
    ) -> Result<(), SchemaError> {
        if !is_empty {
            self.depth += 1;
        }
        let name = e.name();
        let tag = name.as_ref();

        if let Some(member) = self.member.as_mut() {
            if !is_empty {
                match (tag, member.ignored_depth) {
                    (b"type", 0) => member.capture = Some("type"),
                    (b"name", 0) => member.capture = Some("name"),
                    _ => member.ignored_depth += 1,
                }
            }
            return Ok(());
        }

        match tag {
            b"enums" => {
                let attrs = attributes(e)?;
                let kind = match attrs.get("type").map(String::as_str) {
                    Some("bitmask") => EnumKind::Bitmask,
                    Some("enum") => EnumKind::Plain,
                    // `API Constants` and similar untyped blocks
                    _ => return Ok(()),
                };
                let Some(group_name) = attrs.get("name") else {
                    return Ok(());
                };
                let mut group = RawGroup::new(group_name.clone(), kind);
                if let Some(width) = attrs.get("bitwidth") {
                    group.bit_width = width.parse().map_err(|_| {
                        SchemaError::Registry(format!("{group_name}: bad bitwidth `{width}`"))
                    })?;
                }
                if is_empty {
                    schema.add_group(group);
                } else {
                    self.group = Some(group);
                }
            }
            b"enum" => {
                let attrs = attributes(e)?;
                if let Some(group) = self.group.as_mut() {
                    let member = enum_member(&attrs, group.bit_width, None)?;
                    group.members.extend(member);
                } else if let Some(extends) = attrs.get("extends") {
                    if let Some(member) = enum_member(&attrs, 32, self.extension_number)? {
                        self.extensions.push(ExtensionEnum {
                            extends: extends.clone(),
                            member,
                            bitpos: attrs.get("bitpos").and_then(|p| p.parse().ok()),
                        });
                    }
                }
            }
            b"extension" => {
                let attrs = attributes(e)?;
                self.extension_number = attrs.get("number").and_then(|n| n.parse().ok());
            }
            b"feature" => self.extension_number = None,
            b"type" if !is_empty => {
                let attrs = attributes(e)?;
                if attrs.get("category").map(String::as_str) == Some("struct")
                    && !attrs.contains_key("alias")
                {
                    if let Some(name) = attrs.get("name") {
                        self.struct_def = Some(RawStruct {
                            name: name.clone(),
                            fields: Vec::new(),
                        });
                    }
                }
            }
            b"member" if self.struct_def.is_some() && !is_empty => {
                let attrs = attributes(e)?;
                let field = StructField {
                    optional: attrs
                        .get("optional")
                        .is_some_and(|o| o.split(',').next() == Some("true")),
                    values: attrs.get("values").cloned(),
                    ..StructField::default()
                };
                self.member = Some(MemberBuilder {
                    field,
                    ..MemberBuilder::default()
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, tag: &[u8], schema: &mut Schema) {
        self.depth = self.depth.saturating_sub(1);

        if let Some(member) = self.member.as_mut() {
            if member.ignored_depth > 0 {
                member.ignored_depth -= 1;
                return;
            }
            match tag {
                b"type" | b"name" => {
                    member.capture = None;
                    return;
                }
                b"member" => {}
                _ => return,
            }
            if let (Some(member), Some(def)) = (self.member.take(), self.struct_def.as_mut()) {
                def.fields.push(member.field);
            }
            return;
        }

        match tag {
            b"enums" => {
                if let Some(group) = self.group.take() {
                    schema.add_group(group);
                }
            }
            b"type" => {
                if let Some(def) = self.struct_def.take() {
                    schema.add_struct(def);
                }
            }
            b"extension" => self.extension_number = None,
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let Some(member) = self.member.as_mut() else {
            return;
        };
        if member.ignored_depth > 0 {
            return;
        }
        match member.capture {
            Some("type") => member.field.type_name.push_str(text),
            Some("name") => member.field.name.push_str(text),
            _ => {
                if text.contains('*') {
                    member.field.is_pointer = true;
                }
            }
        }
    }
}

/// Build a member from `<enum>` attributes. Returns `None` for entries that
/// carry no value at all (bare `<enum name="..."/>` references).
fn enum_member(
    attrs: &HashMap<String, String>,
    bit_width: u32,
    extension_number: Option<i128>,
) -> Result<Option<RawMember>, SchemaError> {
    let Some(name) = attrs.get("name") else {
        return Ok(None);
    };

    let value = if let Some(alias) = attrs.get("alias") {
        RawValue::Reference(alias.clone())
    } else if let Some(text) = attrs.get("value") {
        literal_from_text(text)
    } else if let Some(bitpos) = attrs.get("bitpos") {
        let pos: u32 = bitpos
            .parse()
            .ok()
            .filter(|pos| *pos < 64)
            .ok_or_else(|| SchemaError::Registry(format!("{name}: bad bitpos `{bitpos}`")))?;
        bit_value(pos, bit_width)
    } else if let Some(offset) = attrs.get("offset") {
        let offset: i128 = offset
            .parse()
            .map_err(|_| SchemaError::Registry(format!("{name}: bad offset `{offset}`")))?;
        let ext_number = attrs
            .get("extnumber")
            .and_then(|n| n.parse().ok())
            .or(extension_number)
            .ok_or_else(|| {
                SchemaError::Registry(format!("{name}: offset without an extension number"))
            })?;
        let mut value = EXT_BASE + (ext_number - 1) * EXT_BLOCK + offset;
        if attrs.get("dir").map(String::as_str) == Some("-") {
            value = -value;
        }
        RawValue::literal(value)
    } else {
        return Ok(None);
    };

    let mut member = RawMember::new(name.clone(), value);
    member.comment = attrs.get("comment").cloned();
    Ok(Some(member))
}

fn literal_from_text(text: &str) -> RawValue {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    match parse_int_literal(digits) {
        Some(v) => RawValue::Literal {
            value: if negative { -v } else { v },
            text: trimmed.to_string(),
        },
        None => RawValue::Opaque(trimmed.to_string()),
    }
}

/// Literal for a single flag bit, written the way 32- and 64-bit flag
/// constants are conventionally spelled.
pub fn bit_value(pos: u32, bit_width: u32) -> RawValue {
    let value = 1i128 << pos;
    let text = if bit_width > 32 || pos >= 32 {
        format!("0x{value:016x}ULL")
    } else {
        format!("0x{value:08x}")
    };
    RawValue::Literal { value, text }
}
