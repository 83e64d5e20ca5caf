pub mod legacy;
pub mod scoped;
pub mod structs;

use std::fmt::Write;

use crate::config::GenConfig;
use crate::resolve::{self, LookupError, ResolvedGroup};
use crate::schema::Schema;

/// Which flavour of enum to emit for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// `enum class` with titled-camel-case members.
    #[default]
    Scoped,
    /// Plain C `enum` with tag-prefixed upper-snake-case members.
    Legacy,
}

/// One unit of generation work, consumed by [`render_request`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderRequest {
    /// Source group name (`VkFormat`), or its short form (`Format`).
    pub group: String,
    pub emit_string_table: bool,
    pub style: Style,
    /// Underlying type from a region marker, replacing `uint<N>_t`.
    pub underlying_type: Option<String>,
}

impl RenderRequest {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            ..Self::default()
        }
    }
}

pub trait Renderer {
    /// Render the declaration (and helpers the request asks for) of one
    /// resolved group. The result ends with a newline.
    fn render(&self, group: &ResolvedGroup, request: &RenderRequest, config: &GenConfig) -> String;
}

pub fn create_renderer(style: Style) -> Box<dyn Renderer> {
    match style {
        Style::Scoped => Box::new(scoped::ScopedRenderer),
        Style::Legacy => Box::new(legacy::LegacyRenderer),
    }
}

/// Resolve and render one request.
pub fn render_request(
    schema: &Schema,
    request: &RenderRequest,
    config: &GenConfig,
) -> Result<String, LookupError> {
    let group = resolve::resolve_group(schema, &request.group, config)?;
    tracing::debug!(
        group = %group.source_name,
        style = ?request.style,
        string_table = request.emit_string_table,
        "rendering"
    );
    Ok(create_renderer(request.style).render(&group, request, config))
}

/// Stand-in emitted for a group that is missing from the source.
pub fn not_found_stub(name: &str) -> String {
    format!("// Not found: {name}\n")
}

/// Whether a rendered block uses `std::string` and so needs `<string>`.
pub fn needs_string_header(rendered: &str) -> bool {
    rendered.contains("std::string")
}

/// Names of the set bits of `value`, lowest bit first, joined with `" | "`.
///
/// Mirrors the generated `to_string_*` helper: a bit without a member name
/// contributes the unknown sentinel, and zero yields an empty string.
pub fn describe_flags(group: &ResolvedGroup, value: u128, config: &GenConfig) -> String {
    let mut names: Vec<&str> = Vec::new();
    let mut flags = value;
    let mut bit_pos = 0u32;
    while flags != 0 {
        if flags & 1 == 1 {
            let bit = 1i128.checked_shl(bit_pos).unwrap_or(0);
            let name = group
                .distinct_values()
                .find(|m| m.value == bit)
                .map_or(config.unknown_name.as_str(), |m| m.friendly_name.as_str());
            names.push(name);
        }
        flags >>= 1;
        bit_pos += 1;
    }
    names.join(" | ")
}

/// The name a plain value maps to in the generated lookup table.
pub fn describe_value<'a>(group: &'a ResolvedGroup, value: i128, config: &'a GenConfig) -> &'a str {
    group
        .distinct_values()
        .find(|m| m.value == value)
        .map_or(config.unknown_name.as_str(), |m| m.friendly_name.as_str())
}

/// Append a trailing `// comment` if the member carries one.
pub(crate) fn push_comment(out: &mut String, comment: Option<&str>) {
    if let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        let _ = write!(out, " // {comment}");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::GenConfig;
    use crate::resolve::{self, ResolvedGroup};
    use crate::schema::{EnumKind, RawGroup, RawMember, RawValue};

    pub fn format_group() -> ResolvedGroup {
        let mut group = RawGroup::new("Format", EnumKind::Plain);
        group.members = vec![
            RawMember::new("Format_Undefined", RawValue::literal(0)),
            RawMember::new("Format_R8Unorm", RawValue::literal(9)),
            RawMember::new(
                "Format_R8UnormAlias",
                RawValue::Reference("Format_R8Unorm".into()),
            ),
        ];
        resolve::resolve(&group, &GenConfig::default())
    }

    /// Bits 0 and 2 only.
    pub fn cull_mode_group() -> ResolvedGroup {
        let mut group = RawGroup::new("VkCullModeFlagBits", EnumKind::Bitmask);
        let mut front = RawMember::new(
            "VK_CULL_MODE_FRONT_BIT",
            RawValue::Literal {
                value: 1,
                text: "0x00000001".into(),
            },
        );
        front.comment = Some("front faces".into());
        group.members = vec![
            RawMember::new("VK_CULL_MODE_NONE", RawValue::literal(0)),
            front,
            RawMember::new(
                "VK_CULL_MODE_BACK_BIT",
                RawValue::Literal {
                    value: 4,
                    text: "0x00000004".into(),
                },
            ),
            RawMember::new(
                "VK_CULL_MODE_FLAG_BITS_MAX_ENUM",
                RawValue::literal(0x7fff_ffff),
            ),
        ];
        resolve::resolve(&group, &GenConfig::default())
    }
}
