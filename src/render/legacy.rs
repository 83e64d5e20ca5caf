//! Plain C `enum` output for call sites that rely on implicit integer
//! conversion.

use std::fmt::Write;

use crate::config::GenConfig;
use crate::naming;
use crate::render::{push_comment, RenderRequest, Renderer};
use crate::resolve::ResolvedGroup;

pub struct LegacyRenderer;

impl LegacyRenderer {
    fn member_name(source_name: &str, config: &GenConfig) -> String {
        naming::legacy_member_name(source_name, &config.api_prefix, &config.project_tag)
    }
}

impl Renderer for LegacyRenderer {
    fn render(&self, group: &ResolvedGroup, request: &RenderRequest, config: &GenConfig) -> String {
        let type_name = naming::legacy_type_name(&group.type_name, "", &config.project_tag);
        let storage = request
            .underlying_type
            .clone()
            .unwrap_or_else(|| group.underlying_type());
        let indent = &config.indent;
        let mut out = String::new();

        let _ = writeln!(out, "enum {type_name} : {storage} {{");
        for member in &group.members {
            let value = match &member.alias_source {
                Some(target) => Self::member_name(target, config),
                None => member.literal.clone(),
            };
            let _ = write!(
                out,
                "{indent}{} = {value},",
                Self::member_name(&member.source_name, config)
            );
            push_comment(&mut out, member.comment.as_deref());
            out.push('\n');
        }
        out.push_str("};\n");

        if request.emit_string_table {
            out.push('\n');
            let _ = writeln!(
                out,
                "static constexpr char const* to_str(const {type_name}& tp) {{"
            );
            let _ = writeln!(out, "{indent}switch (tp) {{");
            out.push_str("// clang-format off\n");
            for member in group.distinct_values() {
                let _ = writeln!(
                    out,
                    "{indent}{indent}case {}: return \"{}\";",
                    Self::member_name(&member.source_name, config),
                    member.friendly_name
                );
            }
            let _ = writeln!(
                out,
                "{indent}{indent}default: return \"{}\";",
                config.unknown_name
            );
            let _ = writeln!(out, "{indent}{indent}// clang-format on");
            let _ = writeln!(out, "{indent}}}");
            out.push_str("}\n");
        }
        out
    }
}
