//! `enum class` output with bitmask operators and string helpers.

use std::fmt::Write;

use crate::config::GenConfig;
use crate::naming;
use crate::render::{push_comment, RenderRequest, Renderer};
use crate::resolve::ResolvedGroup;

pub struct ScopedRenderer;

impl Renderer for ScopedRenderer {
    fn render(&self, group: &ResolvedGroup, request: &RenderRequest, config: &GenConfig) -> String {
        let storage = request
            .underlying_type
            .clone()
            .unwrap_or_else(|| group.underlying_type());
        let mut out = String::new();

        if group.is_bitmask() {
            let _ = writeln!(out, "using {} = {storage};", group.flags_type_name);
            let _ = writeln!(
                out,
                "enum class {} : {} {{",
                group.type_name, group.flags_type_name
            );
        } else {
            let _ = writeln!(out, "enum class {} : {storage} {{", group.type_name);
        }
        for member in &group.members {
            let value = match &member.alias_of {
                Some(target) => format!("{}{target}", config.member_prefix),
                None => member.literal.clone(),
            };
            let _ = write!(
                out,
                "{}{}{} = {value},",
                config.indent, config.member_prefix, member.friendly_name
            );
            push_comment(&mut out, member.comment.as_deref());
            out.push('\n');
        }
        out.push_str("};\n");

        if group.is_bitmask() {
            out.push('\n');
            render_operators(&mut out, group, config);
        }
        if request.emit_string_table {
            out.push('\n');
            render_to_str(&mut out, group, &storage, config);
            if group.is_bitmask() {
                out.push('\n');
                render_to_string(&mut out, group, config);
            }
        }
        out
    }
}

fn render_operators(out: &mut String, group: &ResolvedGroup, config: &GenConfig) {
    let bits = &group.type_name;
    let flags = &group.flags_type_name;
    let indent = &config.indent;
    let operators = [
        ("|", bits.as_str(), format!("static_cast<{flags}>(lhs)")),
        ("|", flags.as_str(), "lhs".to_string()),
        ("&", bits.as_str(), format!("static_cast<{flags}>(lhs)")),
    ];
    for (i, (op, lhs_type, lhs)) in operators.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "constexpr {flags} operator{op}({lhs_type} const& lhs, {bits} const& rhs) noexcept {{"
        );
        let _ = writeln!(
            out,
            "{indent}return static_cast<const {flags}>({lhs} {op} static_cast<{flags}>(rhs));"
        );
        out.push_str("}\n");
    }
}

fn render_to_str(out: &mut String, group: &ResolvedGroup, storage: &str, config: &GenConfig) {
    let indent = &config.indent;
    let _ = writeln!(
        out,
        "static constexpr char const* to_str(const {}& tp) {{",
        group.type_name
    );
    let _ = writeln!(out, "{indent}switch (static_cast<{storage}>(tp)) {{");
    out.push_str("// clang-format off\n");
    for member in group.distinct_values() {
        let _ = writeln!(
            out,
            "{indent}{indent}case {:>10}: return \"{}\";",
            member.literal, member.friendly_name
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

fn render_to_string(out: &mut String, group: &ResolvedGroup, config: &GenConfig) {
    let i1 = config.indent.as_str();
    let i2 = i1.repeat(2);
    let i3 = i1.repeat(3);
    let i4 = i1.repeat(4);
    let flags = &group.flags_type_name;
    let _ = writeln!(
        out,
        "static std::string to_string_{}(const {flags}& tp) {{",
        naming::to_snake_case(flags)
    );
    let _ = writeln!(out, "{i1}uint64_t flags = tp;");
    let _ = writeln!(out, "{i1}std::string result;");
    let _ = writeln!(out, "{i1}int bit_pos = 0;");
    let _ = writeln!(out, "{i1}while (flags) {{");
    let _ = writeln!(out, "{i2}if (flags & 1) {{");
    let _ = writeln!(out, "{i3}if (false == result.empty()) {{");
    let _ = writeln!(out, "{i4}result.append(\" | \");");
    let _ = writeln!(out, "{i3}}}");
    let _ = writeln!(
        out,
        "{i3}result.append(to_str({}(1ULL << bit_pos)));",
        group.type_name
    );
    let _ = writeln!(out, "{i2}}}");
    let _ = writeln!(out, "{i2}flags >>= 1;");
    let _ = writeln!(out, "{i2}bit_pos++;");
    let _ = writeln!(out, "{i1}}}");
    let _ = writeln!(out, "{i1}return result;");
    out.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support::{cull_mode_group, format_group};

    fn render(group: &ResolvedGroup, emit_string_table: bool) -> String {
        let request = RenderRequest {
            emit_string_table,
            ..RenderRequest::new(group.source_name.clone())
        };
        ScopedRenderer.render(group, &request, &GenConfig::default())
    }

    #[test]
    fn plain_enum_declaration() {
        let out = render(&format_group(), false);
        assert_eq!(
            out,
            "enum class Format : uint32_t {\n\
             \teUndefined = 0,\n\
             \teR8Unorm = 9,\n\
             \teR8UnormAlias = eR8Unorm,\n\
             };\n"
        );
    }

    #[test]
    fn alias_names_target_and_is_not_a_case() {
        let out = render(&format_group(), true);
        let cases: Vec<_> = out.lines().filter(|l| l.trim_start().starts_with("case ")).collect();
        assert_eq!(cases.len(), 2, "{out}");
        assert!(out.contains("eR8UnormAlias = eR8Unorm,"));
        assert!(!out.contains("eR8UnormAlias = 9"));
        assert!(!out.contains("\"R8UnormAlias\""));
        assert!(out.contains("\t\tcase          9: return \"R8Unorm\";\n"));
        assert!(out.contains("\t\tdefault: return \"Unknown\";\n"));
        assert!(!out.contains("to_string_"));
    }

    #[test]
    fn bitmask_declaration_and_operators() {
        let out = render(&cull_mode_group(), false);
        assert!(out.starts_with(
            "using CullModeFlags = uint32_t;\nenum class CullModeFlagBits : CullModeFlags {\n"
        ));
        assert!(out.contains("\teFront = 0x00000001, // front faces\n"));
        assert!(out.contains("\teBack = 0x00000004,\n"));
        assert!(!out.contains("MaxEnum"));
        assert_eq!(out.matches("constexpr CullModeFlags operator").count(), 3);
        assert!(out.contains(
            "constexpr CullModeFlags operator|(CullModeFlags const& lhs, CullModeFlagBits const& rhs) noexcept {\n\
             \treturn static_cast<const CullModeFlags>(lhs | static_cast<CullModeFlags>(rhs));\n}\n"
        ));
        assert!(out.contains("operator&(CullModeFlagBits const& lhs, CullModeFlagBits const& rhs)"));
    }

    #[test]
    fn bitmask_string_helpers() {
        let out = render(&cull_mode_group(), true);
        assert!(out.contains("static constexpr char const* to_str(const CullModeFlagBits& tp) {\n"));
        assert!(out.contains("\tswitch (static_cast<uint32_t>(tp)) {\n"));
        assert!(out.contains("static std::string to_string_cull_mode_flags(const CullModeFlags& tp) {\n"));
        assert!(out.contains("\t\t\tresult.append(to_str(CullModeFlagBits(1ULL << bit_pos)));\n"));
        assert!(out.contains("\t\t\t\tresult.append(\" | \");\n"));
    }

    #[test]
    fn plain_groups_get_no_operators() {
        let out = render(&format_group(), true);
        assert!(!out.contains("operator"));
        assert!(!out.contains("using "));
    }

    #[test]
    fn underlying_type_override() {
        let request = RenderRequest {
            underlying_type: Some("uint8_t".into()),
            ..RenderRequest::new("Format")
        };
        let out = ScopedRenderer.render(&format_group(), &request, &GenConfig::default());
        assert!(out.starts_with("enum class Format : uint8_t {\n"));
    }

    #[test]
    fn config_controls_prefix_indent_and_sentinel() {
        let config = crate::config::parse_config(
            "MemberPrefix: k\nIndent: '  '\nUnknownName: '?'\n",
        )
        .unwrap();
        let request = RenderRequest {
            emit_string_table: true,
            ..RenderRequest::new("Format")
        };
        let out = ScopedRenderer.render(&format_group(), &request, &config);
        assert!(out.contains("  kR8UnormAlias = kR8Unorm,\n"));
        assert!(out.contains("    default: return \"?\";\n"));
    }
}
