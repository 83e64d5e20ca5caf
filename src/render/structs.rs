//! Designated-initializer skeletons for registry structs.

use std::fmt::Write;

use crate::config::GenConfig;
use crate::schema::RawStruct;

/// `VkImageCreateInfo = { .sType = ..., .pNext = nullptr, ... };`, one field
/// per line with the names padded to a common column.
pub fn render_struct(def: &RawStruct, config: &GenConfig) -> String {
    let width = def
        .fields
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        + 2;

    let mut out = format!("{} = {{\n", def.name);
    for field in &def.fields {
        let value = if field.type_name == "void" {
            "nullptr"
        } else {
            field.values.as_deref().unwrap_or("0")
        };
        let _ = write!(out, "{}.{:<width$} = {value},", config.indent, field.name);
        if field.optional {
            out.push_str(" // optional");
        }
        out.push('\n');
    }
    out.push_str("};\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructField;

    fn field(name: &str, type_name: &str) -> StructField {
        StructField {
            name: name.into(),
            type_name: type_name.into(),
            ..StructField::default()
        }
    }

    #[test]
    fn fields_aligned_with_values() {
        let def = RawStruct {
            name: "VkFenceCreateInfo".into(),
            fields: vec![
                StructField {
                    values: Some("VK_STRUCTURE_TYPE_FENCE_CREATE_INFO".into()),
                    ..field("sType", "VkStructureType")
                },
                StructField {
                    is_pointer: true,
                    optional: true,
                    ..field("pNext", "void")
                },
                StructField {
                    optional: true,
                    ..field("flags", "VkFenceCreateFlags")
                },
            ],
        };
        assert_eq!(
            render_struct(&def, &GenConfig::default()),
            "VkFenceCreateInfo = {\n\
             \t.sType   = VK_STRUCTURE_TYPE_FENCE_CREATE_INFO,\n\
             \t.pNext   = nullptr, // optional\n\
             \t.flags   = 0, // optional\n\
             };\n"
        );
    }

    #[test]
    fn empty_struct() {
        let def = RawStruct {
            name: "VkEmpty".into(),
            fields: Vec::new(),
        };
        assert_eq!(render_struct(&def, &GenConfig::default()), "VkEmpty = {\n};\n");
    }
}
