//! Name normalization: derive short, friendly identifiers from fully
//! qualified source names.
//!
//! Every function here is pure so that regenerated files diff cleanly.

use std::sync::LazyLock;

use regex::Regex;

/// `2X2`, `10X6`: a stylised multiplication sign between numbers, as in
/// image format names. The `X` is lower-cased.
static DIMENSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+X[0-9]+").unwrap());

static WORD_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^_])([A-Z][a-z]+)").unwrap());

static LOWER_UPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

static LETTER_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-Z])([0-9])").unwrap());

/// Tokens marking sentinel members that only bound the numeric range.
const RANGE_MARKERS: &[&str] = &["MAX_ENUM", "BEGIN_RANGE", "END_RANGE", "RANGE_SIZE"];

/// Title-case one word: a letter following a non-letter is upper-cased,
/// any other letter lower-cased. `2D` stays `2D`, `UNORM` becomes `Unorm`.
fn title_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_cased = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(ch);
            prev_cased = false;
        }
    }
    out
}

/// Upper-case only the first character; used for components that are
/// already mixed-case and would lose information under title-casing.
fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `VK_FORMAT_ASTC_4X4_UNORM_BLOCK` → `VkFormatAstc4x4UnormBlock`.
pub fn to_titled_camel_case(snake: &str) -> String {
    let joined: String = snake
        .split('_')
        .map(|component| {
            if component.chars().any(|c| c.is_lowercase()) {
                capitalize_first(component)
            } else {
                title_word(component)
            }
        })
        .collect();
    DIMENSION_RE
        .replace_all(&joined, |caps: &regex::Captures<'_>| caps[0].to_lowercase())
        .into_owned()
}

fn split_camel(name: &str) -> String {
    let s1 = WORD_START_RE.replace_all(name, "${1}_${2}");
    LOWER_UPPER_RE.replace_all(&s1, "${1}_${2}").into_owned()
}

/// `VkAttachmentLoadOp` → `VK_ATTACHMENT_LOAD_OP`.
pub fn to_upper_snake_case(name: &str) -> String {
    split_camel(name).to_uppercase()
}

/// `VkCullModeFlags` → `vk_cull_mode_flags`.
pub fn to_snake_case(name: &str) -> String {
    split_camel(name).to_lowercase()
}

/// The longest common prefix of `a` and `b`, compared character by character.
pub fn longest_common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

/// Titled camel case of `source`, with `strip_prefix` removed from the front
/// (repeatedly, so the result never starts with it) and `strip_suffix`
/// removed once from the end.
pub fn to_friendly_name(source: &str, strip_prefix: &str, strip_suffix: &str) -> String {
    let camel = to_titled_camel_case(source);
    let mut name = camel.as_str();
    if !strip_prefix.is_empty() {
        while let Some(rest) = name.strip_prefix(strip_prefix) {
            name = rest;
        }
    }
    if !strip_suffix.is_empty() {
        if let Some(rest) = name.strip_suffix(strip_suffix) {
            if !rest.is_empty() {
                name = rest;
            }
        }
    }
    name.to_string()
}

/// The part of a group name that its members repeat: everything before
/// `FlagBits`, plus `2` for the second generation of flag groups.
pub fn value_prefix(group_name: &str) -> String {
    let mut prefix = group_name
        .split("FlagBits")
        .next()
        .unwrap_or(group_name)
        .to_string();
    if group_name.contains("FlagBits2") {
        prefix.push('2');
    }
    prefix
}

/// How many leading bytes of `member` repeat the group name, cut back to a
/// word (`_`) boundary.
///
/// The group's value prefix is compared in upper snake case, both as-is
/// (`VK_VIDEO_H264_`) and with a word break before trailing digits
/// (`VK_ACCESS_2_`), and the longer match wins.
pub fn redundant_prefix_len(group_name: &str, member: &str) -> usize {
    let snake = to_upper_snake_case(&value_prefix(group_name));
    let split_digits = LETTER_DIGIT_RE.replace_all(&snake, "${1}_${2}").into_owned();
    let upper_member = member.to_uppercase();

    [snake, split_digits]
        .iter()
        .map(|candidate| {
            let candidate = format!("{candidate}_");
            let common = longest_common_prefix(&candidate, &upper_member);
            if common.len() == candidate.len() {
                common.len()
            } else {
                common.rfind('_').map_or(0, |i| i + 1)
            }
        })
        .max()
        .unwrap_or(0)
}

/// The friendly name of `member` inside `group_name`, e.g.
/// (`VkCullModeFlagBits`, `VK_CULL_MODE_FRONT_BIT`, `Bit`) → `Front`.
pub fn member_friendly_name(group_name: &str, member: &str, bit_suffix: &str) -> String {
    let len = redundant_prefix_len(group_name, member);
    let prefix = to_titled_camel_case(member.get(..len).unwrap_or(""));
    to_friendly_name(member, &prefix, bit_suffix)
}

/// Whether a member only marks the numeric range of its enum.
pub fn is_range_marker(source_name: &str) -> bool {
    let upper = to_upper_snake_case(source_name);
    RANGE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Generated type name: the group name without the API prefix.
pub fn type_name(group_name: &str, api_prefix: &str) -> String {
    group_name
        .strip_prefix(api_prefix)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(group_name)
        .to_string()
}

/// The integer alias that holds combinations of a bitmask group's bits.
pub fn flags_type_name(type_name: &str) -> String {
    if type_name.contains("FlagBits") {
        type_name.replace("FlagBits", "Flags")
    } else {
        format!("{type_name}Flags")
    }
}

/// Legacy C enum type name: `VkFormat` with tag `LE` → `LeFormat`.
pub fn legacy_type_name(group_name: &str, api_prefix: &str, project_tag: &str) -> String {
    format!(
        "{}{}",
        title_word(project_tag),
        type_name(group_name, api_prefix)
    )
}

/// Legacy C enumerator name: `VK_FORMAT_R8_UNORM` with tag `LE` →
/// `LE_FORMAT_R8_UNORM`.
pub fn legacy_member_name(source_name: &str, api_prefix: &str, project_tag: &str) -> String {
    let upper = to_upper_snake_case(source_name);
    let api = api_prefix.to_uppercase();
    let rest = if api.is_empty() {
        upper.as_str()
    } else {
        upper
            .strip_prefix(&format!("{api}_"))
            .unwrap_or(upper.as_str())
    };
    let tag = project_tag.to_uppercase();
    if tag.is_empty() {
        rest.to_string()
    } else {
        format!("{tag}_{}", rest.trim_start_matches('_'))
    }
}
