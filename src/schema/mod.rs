//! Front-end output: the declaration tree every other stage consumes.
//!
//! Both front-ends (`header` for C headers, `registry` for XML API registries)
//! reduce their input to the same small closed set of node kinds: groups,
//! members, and member values that are either implicit, literal, or a
//! reference to a sibling.

pub mod header;
pub mod lexer;
pub mod registry;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Fatal front-end failure. No generation is attempted after one of these.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("line {line}: {message}")]
    Header { line: usize, message: String },
    #[error("registry: {0}")]
    Registry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumKind {
    Plain,
    Bitmask,
}

/// How a member's value was written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// No initializer: previous value + 1.
    Implicit,
    /// Integer constant, with the text to reproduce in generated code.
    Literal { value: i128, text: String },
    /// Another member's source name.
    Reference(String),
    /// An initializer the front-end could not reduce to one of the above.
    Opaque(String),
}

impl RawValue {
    pub fn literal(value: i128) -> Self {
        RawValue::Literal {
            value,
            text: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMember {
    pub name: String,
    pub value: RawValue,
    pub comment: Option<String>,
}

impl RawMember {
    pub fn new(name: impl Into<String>, value: RawValue) -> Self {
        Self {
            name: name.into(),
            value,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGroup {
    pub name: String,
    /// 8, 16, 32 or 64.
    pub bit_width: u32,
    pub kind: EnumKind,
    pub members: Vec<RawMember>,
}

impl RawGroup {
    pub fn new(name: impl Into<String>, kind: EnumKind) -> Self {
        Self {
            name: name.into(),
            bit_width: 32,
            kind,
            members: Vec::new(),
        }
    }

    pub fn is_bitmask(&self) -> bool {
        self.kind == EnumKind::Bitmask
    }
}

/// One field of a registry struct, used for initializer templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub type_name: String,
    pub is_pointer: bool,
    pub optional: bool,
    /// Fixed value from the registry (e.g. the `sType` constant).
    pub values: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStruct {
    pub name: String,
    pub fields: Vec<StructField>,
}

/// All declarations read from one source file, in source order.
#[derive(Debug, Default)]
pub struct Schema {
    groups: Vec<RawGroup>,
    structs: Vec<RawStruct>,
    group_index: HashMap<String, usize>,
    struct_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, merging members into an existing group of the same name.
    pub fn add_group(&mut self, group: RawGroup) {
        match self.group_index.get(&group.name) {
            Some(&idx) => self.groups[idx].members.extend(group.members),
            None => {
                self.group_index.insert(group.name.clone(), self.groups.len());
                self.groups.push(group);
            }
        }
    }

    pub fn add_struct(&mut self, def: RawStruct) {
        if self.struct_index.contains_key(&def.name) {
            return;
        }
        self.struct_index.insert(def.name.clone(), self.structs.len());
        self.structs.push(def);
    }

    pub fn group(&self, name: &str) -> Option<&RawGroup> {
        self.group_index.get(name).map(|&i| &self.groups[i])
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut RawGroup> {
        self.group_index.get(name).map(|&i| &mut self.groups[i])
    }

    pub fn struct_def(&self, name: &str) -> Option<&RawStruct> {
        self.struct_index.get(name).map(|&i| &self.structs[i])
    }

    pub fn groups(&self) -> &[RawGroup] {
        &self.groups
    }

    pub fn structs(&self) -> &[RawStruct] {
        &self.structs
    }
}

/// Load a schema from disk, choosing the front-end by file extension:
/// `.xml` is read as an API registry, anything else as a C header.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_registry = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    let schema = if is_registry {
        registry::parse_registry(&text)
    } else {
        header::parse_header(&text)
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        groups = schema.groups().len(),
        structs = schema.structs().len(),
        "schema loaded"
    );
    Ok(schema)
}
