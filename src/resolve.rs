//! Value resolution: turn a raw group into the ordered, de-duplicated member
//! list the renderer consumes.
//!
//! Aliases are keyed after every literal, by chain depth, so a member is
//! always emitted after the member it names.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::GenConfig;
use crate::naming;
use crate::schema::{EnumKind, RawGroup, RawValue, Schema};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("group `{0}` not found")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMember {
    pub source_name: String,
    pub friendly_name: String,
    pub value: i128,
    /// Value as it should appear in generated code (`0x00000004`, `-1`).
    pub literal: String,
    /// Friendly name of the aliased member.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    /// Source name of the aliased member, for the legacy style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub sort_key: String,
}

impl ResolvedMember {
    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGroup {
    pub source_name: String,
    pub type_name: String,
    pub flags_type_name: String,
    pub bit_width: u32,
    pub kind: EnumKind,
    /// Plain groups holding negative values get a signed underlying type.
    pub signed: bool,
    /// In sort order.
    pub members: Vec<ResolvedMember>,
}

impl ResolvedGroup {
    pub fn is_bitmask(&self) -> bool {
        self.kind == EnumKind::Bitmask
    }

    /// `uint32_t`, or `int32_t` for signed groups.
    pub fn underlying_type(&self) -> String {
        if self.signed {
            format!("int{}_t", self.bit_width)
        } else {
            format!("uint{}_t", self.bit_width)
        }
    }

    /// Members that get their own case in a string table: no aliases and one
    /// member per numeric value.
    pub fn distinct_values(&self) -> impl Iterator<Item = &ResolvedMember> {
        let mut seen = HashSet::new();
        self.members
            .iter()
            .filter(move |m| !m.is_alias() && seen.insert(m.value))
    }
}

/// Look up `name` in the schema, trying the API-prefixed spelling too, and
/// resolve it.
pub fn resolve_group(
    schema: &Schema,
    name: &str,
    config: &GenConfig,
) -> Result<ResolvedGroup, LookupError> {
    let group = schema
        .group(name)
        .or_else(|| schema.group(&format!("{}{name}", config.api_prefix)))
        .ok_or_else(|| LookupError::NotFound(name.to_string()))?;
    Ok(resolve(group, config))
}

/// Number of hex digits needed for the largest magnitude among `values`.
pub fn key_width(values: impl IntoIterator<Item = i128>) -> usize {
    let max = values
        .into_iter()
        .map(i128::unsigned_abs)
        .max()
        .unwrap_or(0);
    format!("{max:x}").len()
}

/// Sort key for a literal value, zero-padded to `width` hex digits.
///
/// Negative values sort before non-negative ones and stay in numeric order.
pub fn literal_sort_key(value: i128, width: usize) -> String {
    if value < 0 {
        let magnitude = value.unsigned_abs();
        let complement = u32::try_from(width)
            .ok()
            .and_then(|w| 16u128.checked_pow(w))
            .map_or_else(|| 0u128.wrapping_sub(magnitude), |m| m - magnitude);
        format!("00{complement:0width$x}")
    } else {
        format!("01{value:0width$x}")
    }
}

/// Sort key for an alias `depth` references away from a literal.
pub fn alias_sort_key(depth: usize, source_name: &str) -> String {
    format!("1{depth:04}{source_name}")
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Pending,
    Literal(i128),
    Alias { value: i128, target: usize, depth: usize },
    Dropped,
}

impl Slot {
    fn value(self) -> Option<(i128, usize)> {
        match self {
            Slot::Literal(v) => Some((v, 0)),
            Slot::Alias { value, depth, .. } => Some((value, depth)),
            Slot::Pending | Slot::Dropped => None,
        }
    }
}

/// Resolve values, drop range markers and unresolvable members, normalize
/// names and sort.
pub fn resolve(group: &RawGroup, config: &GenConfig) -> ResolvedGroup {
    let group_config = config.group_config(&group.name);

    let mut seen = HashSet::new();
    let members: Vec<_> = group
        .members
        .iter()
        .filter(|m| !group_config.exclude.contains(&m.name))
        .filter(|m| {
            let first = seen.insert(m.name.as_str());
            if !first {
                tracing::debug!(group = %group.name, member = %m.name, "duplicate member skipped");
            }
            first
        })
        .collect();

    let index: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name.as_str(), i))
        .collect();

    let mut slots: Vec<Slot> = members
        .iter()
        .map(|m| match &m.value {
            RawValue::Literal { value, .. } => Slot::Literal(*value),
            RawValue::Opaque(text) => {
                tracing::warn!(group = %group.name, member = %m.name, value = %text,
                    "cannot evaluate initializer, member dropped");
                Slot::Dropped
            }
            RawValue::Implicit | RawValue::Reference(_) => Slot::Pending,
        })
        .collect();

    // References and implicit successors settle in as many passes as the
    // longest chain.
    loop {
        let mut progress = false;
        for i in 0..slots.len() {
            if !matches!(slots[i], Slot::Pending) {
                continue;
            }
            let resolved = match &members[i].value {
                RawValue::Implicit if i == 0 => Some(Slot::Literal(0)),
                RawValue::Implicit => slots[i - 1].value().map(|(v, _)| Slot::Literal(v + 1)),
                RawValue::Reference(target) => match index.get(target.as_str()) {
                    Some(&t) => match slots[t] {
                        Slot::Pending => None,
                        Slot::Dropped => Some(Slot::Dropped),
                        slot => slot.value().map(|(value, depth)| Slot::Alias {
                            value,
                            target: t,
                            depth: depth + 1,
                        }),
                    },
                    None => Some(Slot::Dropped),
                },
                RawValue::Literal { .. } | RawValue::Opaque(_) => None,
            };
            if let Some(slot) = resolved {
                slots[i] = slot;
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }

    let width = key_width(slots.iter().filter_map(|s| s.value().map(|(v, _)| v)));

    let mut resolved = Vec::with_capacity(members.len());
    let mut friendly_by_index = HashMap::new();
    for (i, (member, slot)) in members.iter().zip(&slots).enumerate() {
        if naming::is_range_marker(&member.name) {
            continue;
        }
        match slot {
            Slot::Pending | Slot::Dropped => {
                if matches!(member.value, RawValue::Reference(_) | RawValue::Implicit) {
                    tracing::warn!(group = %group.name, member = %member.name,
                        "value does not resolve, member dropped");
                }
                continue;
            }
            Slot::Literal(_) | Slot::Alias { .. } => {}
        }
        let friendly = friendly_name(&group.name, &member.name, config);
        friendly_by_index.insert(i, friendly.clone());
        let (value, literal, sort_key) = match (*slot, &member.value) {
            (Slot::Alias { value, depth, .. }, _) => (
                value,
                value.to_string(),
                alias_sort_key(depth, &member.name),
            ),
            (Slot::Literal(value), RawValue::Literal { text, .. }) => {
                (value, text.clone(), literal_sort_key(value, width))
            }
            (Slot::Literal(value), _) => {
                (value, value.to_string(), literal_sort_key(value, width))
            }
            (Slot::Pending | Slot::Dropped, _) => continue,
        };
        resolved.push((i, member, value, literal, sort_key, friendly));
    }

    let mut out: Vec<ResolvedMember> = resolved
        .into_iter()
        .filter_map(|(i, member, value, literal, sort_key, friendly)| {
            let (alias_of, alias_source) = match slots[i] {
                Slot::Alias { target, .. } => match friendly_by_index.get(&target) {
                    Some(name) => (Some(name.clone()), Some(members[target].name.clone())),
                    None => {
                        tracing::warn!(group = %group.name, member = %member.name,
                            "alias target was dropped, alias dropped");
                        return None;
                    }
                },
                _ => (None, None),
            };
            Some(ResolvedMember {
                source_name: member.name.clone(),
                friendly_name: friendly,
                value,
                literal,
                alias_of,
                alias_source,
                comment: member.comment.clone(),
                sort_key,
            })
        })
        .collect();

    out.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

    let mut names = HashSet::new();
    out.retain(|m| {
        let keep = names.insert(m.friendly_name.clone())
            && m.alias_of.as_deref() != Some(m.friendly_name.as_str());
        if !keep {
            tracing::warn!(group = %group.name, member = %m.source_name,
                friendly = %m.friendly_name, "duplicate friendly name, member dropped");
        }
        keep
    });

    let type_name = group_config
        .type_name
        .clone()
        .unwrap_or_else(|| naming::type_name(&group.name, &config.api_prefix));
    let signed = group.kind == EnumKind::Plain && out.iter().any(|m| m.value < 0);

    tracing::debug!(group = %group.name, members = out.len(), "group resolved");

    ResolvedGroup {
        source_name: group.name.clone(),
        flags_type_name: naming::flags_type_name(&type_name),
        type_name,
        bit_width: group.bit_width,
        kind: group.kind,
        signed,
        members: out,
    }
}

fn friendly_name(group_name: &str, member: &str, config: &GenConfig) -> String {
    let name = naming::member_friendly_name(group_name, member, &config.bit_suffix);
    if name.is_empty() {
        naming::to_titled_camel_case(member)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawMember;

    fn lit(name: &str, value: i128) -> RawMember {
        RawMember::new(name, RawValue::literal(value))
    }

    fn reference(name: &str, target: &str) -> RawMember {
        RawMember::new(name, RawValue::Reference(target.to_string()))
    }

    fn group(name: &str, kind: EnumKind, members: Vec<RawMember>) -> RawGroup {
        let mut g = RawGroup::new(name, kind);
        g.members = members;
        g
    }

    fn names(group: &ResolvedGroup) -> Vec<&str> {
        group
            .members
            .iter()
            .map(|m| m.friendly_name.as_str())
            .collect()
    }

    #[test]
    fn sort_key_orders_numerically() {
        let width = key_width([0x3, 0x10]);
        assert_eq!(width, 2);
        assert!(literal_sort_key(0x3, width) < literal_sort_key(0x10, width));
        assert!(literal_sort_key(-1, width) < literal_sort_key(0, width));
        assert!(literal_sort_key(-16, width) < literal_sort_key(-1, width));
        assert!(literal_sort_key(0xff, width) < alias_sort_key(1, "A"));
        assert!(alias_sort_key(1, "Z") < alias_sort_key(2, "A"));
    }

    #[test]
    fn key_width_of_empty_group() {
        assert_eq!(key_width([]), 1);
        assert_eq!(key_width([i128::from(u64::MAX)]), 16);
    }

    #[test]
    fn implicit_values_follow_previous() {
        let g = group(
            "Color",
            EnumKind::Plain,
            vec![
                RawMember::new("COLOR_RED", RawValue::Implicit),
                RawMember::new("COLOR_GREEN", RawValue::Implicit),
                lit("COLOR_BLUE", 10),
                RawMember::new("COLOR_ALPHA", RawValue::Implicit),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        let values: Vec<_> = resolved.members.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![0, 1, 10, 11]);
        assert_eq!(names(&resolved), vec!["Red", "Green", "Blue", "Alpha"]);
        assert_eq!(resolved.members[3].literal, "11");
    }

    #[test]
    fn members_sorted_by_value_not_declaration() {
        let g = group(
            "VkSampleCountFlagBits",
            EnumKind::Bitmask,
            vec![
                lit("VK_SAMPLE_COUNT_16_BIT", 0x10),
                lit("VK_SAMPLE_COUNT_2_BIT", 0x2),
                lit("VK_SAMPLE_COUNT_1_BIT", 0x1),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(names(&resolved), vec!["1", "2", "16"]);
        assert_eq!(resolved.type_name, "SampleCountFlagBits");
        assert_eq!(resolved.flags_type_name, "SampleCountFlags");
    }

    #[test]
    fn format_example_alias() {
        let g = group(
            "Format",
            EnumKind::Plain,
            vec![
                lit("Format_Undefined", 0),
                reference("Format_R8UnormAlias", "Format_R8Unorm"),
                lit("Format_R8Unorm", 9),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(names(&resolved), vec!["Undefined", "R8Unorm", "R8UnormAlias"]);
        let alias = &resolved.members[2];
        assert_eq!(alias.alias_of.as_deref(), Some("R8Unorm"));
        assert_eq!(alias.alias_source.as_deref(), Some("Format_R8Unorm"));
        assert_eq!(alias.value, 9);
        assert_eq!(resolved.distinct_values().count(), 2);
    }

    #[test]
    fn alias_of_alias_follows_its_target() {
        let g = group(
            "VkThing",
            EnumKind::Plain,
            vec![
                reference("VK_THING_A_ALIAS_ALIAS", "VK_THING_A_ALIAS"),
                reference("VK_THING_A_ALIAS", "VK_THING_A"),
                lit("VK_THING_A", 1),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(names(&resolved), vec!["A", "AAlias", "AAliasAlias"]);
        assert_eq!(resolved.members[2].alias_of.as_deref(), Some("AAlias"));
    }

    #[test]
    fn range_markers_and_opaque_members_dropped() {
        let g = group(
            "VkFormat",
            EnumKind::Plain,
            vec![
                lit("VK_FORMAT_UNDEFINED", 0),
                RawMember::new("VK_FORMAT_R4G4", RawValue::Opaque("A + B".into())),
                reference("VK_FORMAT_BEGIN_RANGE", "VK_FORMAT_UNDEFINED"),
                lit("VK_FORMAT_MAX_ENUM", 0x7fff_ffff),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(names(&resolved), vec!["Undefined"]);
    }

    #[test]
    fn implicit_after_range_marker_counts_from_marker() {
        let g = group(
            "Stage",
            EnumKind::Plain,
            vec![
                RawMember::new("STAGE_A", RawValue::Implicit),
                reference("STAGE_BEGIN_RANGE", "STAGE_A"),
                RawMember::new("STAGE_B", RawValue::Implicit),
                RawMember::new("STAGE_END_RANGE", RawValue::Implicit),
                RawMember::new("STAGE_C", RawValue::Implicit),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        let values: Vec<_> = resolved
            .members
            .iter()
            .map(|m| (m.friendly_name.as_str(), m.value))
            .collect();
        assert_eq!(values, vec![("A", 0), ("B", 1), ("C", 3)]);
    }

    #[test]
    fn dangling_aliases_dropped() {
        let g = group(
            "VkFormat",
            EnumKind::Plain,
            vec![
                lit("VK_FORMAT_UNDEFINED", 0),
                reference("VK_FORMAT_GONE", "VK_FORMAT_NOWHERE"),
                reference("VK_FORMAT_LIMIT", "VK_FORMAT_MAX_ENUM"),
                lit("VK_FORMAT_MAX_ENUM", 0x7fff_ffff),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(names(&resolved), vec!["Undefined"]);
    }

    #[test]
    fn implicit_after_opaque_is_dropped() {
        let g = group(
            "Color",
            EnumKind::Plain,
            vec![
                RawMember::new("COLOR_A", RawValue::Opaque("X * 2".into())),
                RawMember::new("COLOR_B", RawValue::Implicit),
            ],
        );
        assert!(resolve(&g, &GenConfig::default()).members.is_empty());
    }

    #[test]
    fn duplicate_source_names_keep_first() {
        let g = group(
            "Color",
            EnumKind::Plain,
            vec![lit("COLOR_RED", 1), lit("COLOR_RED", 2)],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(resolved.members.len(), 1);
        assert_eq!(resolved.members[0].value, 1);
    }

    #[test]
    fn duplicate_friendly_names_keep_first_in_sort_order() {
        let g = group(
            "Color",
            EnumKind::Plain,
            vec![lit("COLOR_RED", 2), lit("Color_Red", 1)],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert_eq!(resolved.members.len(), 1);
        assert_eq!(resolved.members[0].source_name, "Color_Red");
    }

    #[test]
    fn negative_values_make_plain_groups_signed() {
        let g = group(
            "VkResult",
            EnumKind::Plain,
            vec![
                lit("VK_SUCCESS", 0),
                lit("VK_ERROR_OUT_OF_HOST_MEMORY", -1),
                lit("VK_ERROR_DEVICE_LOST", -4),
            ],
        );
        let resolved = resolve(&g, &GenConfig::default());
        assert!(resolved.signed);
        assert_eq!(resolved.underlying_type(), "int32_t");
        assert_eq!(
            names(&resolved),
            vec!["ErrorDeviceLost", "ErrorOutOfHostMemory", "Success"]
        );
    }

    #[test]
    fn group_config_overrides() {
        let config = crate::config::parse_config(
            "Groups:\n  VkFormat:\n    Name: PixelFormat\n    Exclude: [VK_FORMAT_UNDEFINED]\n",
        )
        .unwrap();
        let g = group(
            "VkFormat",
            EnumKind::Plain,
            vec![lit("VK_FORMAT_UNDEFINED", 0), lit("VK_FORMAT_R8_UNORM", 9)],
        );
        let resolved = resolve(&g, &config);
        assert_eq!(resolved.type_name, "PixelFormat");
        assert_eq!(names(&resolved), vec!["R8Unorm"]);
    }

    #[test]
    fn lookup_by_source_or_short_name() {
        let mut schema = Schema::new();
        schema.add_group(group("VkFormat", EnumKind::Plain, vec![lit("VK_FORMAT_UNDEFINED", 0)]));
        let config = GenConfig::default();
        assert!(resolve_group(&schema, "VkFormat", &config).is_ok());
        assert!(resolve_group(&schema, "Format", &config).is_ok());
        assert_eq!(
            resolve_group(&schema, "VkNothing", &config),
            Err(LookupError::NotFound("VkNothing".into()))
        );
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn larger_literal_has_larger_key(a in any::<i64>(), b in any::<i64>()) {
                let (a, b) = (i128::from(a), i128::from(b));
                let width = key_width([a, b]);
                let (ka, kb) = (literal_sort_key(a, width), literal_sort_key(b, width));
                prop_assert_eq!(a.cmp(&b), ka.cmp(&kb), "{} vs {}: {} vs {}", a, b, ka, kb);
            }

            #[test]
            fn alias_always_after_target(
                values in prop::collection::vec(0i128..0x1_0000, 1..8),
                picks in prop::collection::vec((any::<prop::sample::Index>(), any::<bool>()), 0..8),
            ) {
                let mut members: Vec<RawMember> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| lit(&format!("THING_V{i}"), *v))
                    .collect();
                for (j, (pick, chain)) in picks.iter().enumerate() {
                    let target = if *chain && j > 0 {
                        format!("THING_ALIAS{}", pick.index(j))
                    } else {
                        format!("THING_V{}", pick.index(values.len()))
                    };
                    members.insert(0, reference(&format!("THING_ALIAS{j}"), &target));
                }
                let resolved = resolve(&group("Thing", EnumKind::Plain, members), &GenConfig::default());
                let position: HashMap<&str, usize> = resolved
                    .members
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (m.friendly_name.as_str(), i))
                    .collect();
                for (i, m) in resolved.members.iter().enumerate() {
                    if let Some(target) = &m.alias_of {
                        prop_assert!(position[target.as_str()] < i,
                            "{} rendered before its target {}", m.friendly_name, target);
                    }
                }
            }
        }
    }
}
