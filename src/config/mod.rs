use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yml::Value;

/// Name of the config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".enumgen.yml";

/// Per-group overrides from the `Groups:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupConfig {
    /// Replaces the derived type name (e.g. `Format` for `VkFormat`).
    pub type_name: Option<String>,
    /// Source member names to leave out of the generated enum.
    pub exclude: Vec<String>,
}

/// Resolved configuration from `.enumgen.yml`.
///
/// Every key is optional; a missing file yields the defaults, which match the
/// conventions of the Vulkan registry and the `le` namespace.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Source file (header or registry) used when `--source` is not given.
    pub source: Option<PathBuf>,
    /// API prefix dropped from type names (`Vk` in `VkFormat`).
    pub api_prefix: String,
    /// Tag prepended to legacy C-style names (`LE` → `LE_FORMAT_R8_UNORM`).
    pub project_tag: String,
    /// Prepended to every scoped-enum member (`e` → `eR8Unorm`).
    pub member_prefix: String,
    /// Trailing marker removed from single-bit flag names.
    pub bit_suffix: String,
    /// Namespace wrapping batch output; empty for none.
    pub namespace: String,
    /// Returned by the generated lookup for values without a name.
    pub unknown_name: String,
    pub indent: String,
    /// Number of `-` in the banner between generated groups.
    pub banner_width: usize,
    group_configs: HashMap<String, GroupConfig>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            source: None,
            api_prefix: "Vk".to_string(),
            project_tag: "LE".to_string(),
            member_prefix: "e".to_string(),
            bit_suffix: "Bit".to_string(),
            namespace: "le".to_string(),
            unknown_name: "Unknown".to_string(),
            indent: "\t".to_string(),
            banner_width: 70,
            group_configs: HashMap::new(),
        }
    }
}

impl GenConfig {
    /// Overrides for a group; defaults when the group is not configured.
    pub fn group_config(&self, name: &str) -> GroupConfig {
        self.group_configs.get(name).cloned().unwrap_or_default()
    }

    /// The banner line that separates generated blocks.
    pub fn banner(&self) -> String {
        format!("// {}", "-".repeat(self.banner_width))
    }
}

/// Load config from the given path, or look for `.enumgen.yml` in the
/// current directory. Returns the defaults if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<GenConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => Path::new(DEFAULT_CONFIG_FILE).to_path_buf(),
    };

    if !config_path.exists() {
        if path.is_some() {
            anyhow::bail!("config file not found: {}", config_path.display());
        }
        return Ok(GenConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<GenConfig> {
    let mut config = GenConfig::default();
    if contents.trim().is_empty() {
        return Ok(config);
    }

    let raw: Value = serde_yml::from_str(contents)?;
    let map = match &raw {
        Value::Mapping(map) => map,
        Value::Null => return Ok(config),
        _ => anyhow::bail!("top level must be a mapping"),
    };

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            continue;
        };
        match key {
            "Source" => config.source = Some(PathBuf::from(expect_str(key, value)?)),
            "ApiPrefix" => config.api_prefix = expect_str(key, value)?,
            "ProjectTag" => config.project_tag = expect_str(key, value)?,
            "MemberPrefix" => config.member_prefix = expect_str(key, value)?,
            "BitSuffix" => config.bit_suffix = expect_str(key, value)?,
            "Namespace" => config.namespace = expect_str(key, value)?,
            "UnknownName" => config.unknown_name = expect_str(key, value)?,
            "Indent" => config.indent = expect_str(key, value)?,
            "BannerWidth" => {
                config.banner_width = value
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .with_context(|| format!("{key} must be a positive integer"))?;
            }
            "Groups" => {
                let Value::Mapping(groups) = value else {
                    anyhow::bail!("Groups must be a mapping of group name to options");
                };
                for (name, options) in groups {
                    let Some(name) = name.as_str() else {
                        continue;
                    };
                    let options = parse_group_config(name, options)?;
                    config.group_configs.insert(name.to_string(), options);
                }
            }
            other => tracing::warn!(key = other, "unknown config key ignored"),
        }
    }

    Ok(config)
}

fn expect_str(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(String::from)
        .with_context(|| format!("{key} must be a string"))
}

fn parse_group_config(group: &str, value: &Value) -> Result<GroupConfig> {
    let mut config = GroupConfig::default();
    let map = match value {
        Value::Mapping(map) => map,
        Value::Null => return Ok(config),
        _ => anyhow::bail!("Groups.{group} must be a mapping"),
    };

    for (k, v) in map {
        let Some(key) = k.as_str() else {
            continue;
        };
        match key {
            "Name" => {
                config.type_name = Some(expect_str(&format!("Groups.{group}.Name"), v)?);
            }
            "Exclude" => {
                config.exclude = expect_str_list(&format!("Groups.{group}.Exclude"), v)?;
            }
            other => tracing::warn!(group, key = other, "unknown group option ignored"),
        }
    }

    Ok(config)
}

fn expect_str_list(key: &str, value: &Value) -> Result<Vec<String>> {
    let Value::Sequence(seq) = value else {
        anyhow::bail!("{key} must be a list of member names");
    };
    seq.iter().map(|v| expect_str(key, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_default_config_returns_defaults() {
        let config = load_config(None).unwrap_or_default();
        assert_eq!(config.banner_width, 70);
    }

    #[test]
    fn missing_explicit_config_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/.enumgen.yml"))).is_err());
    }

    #[test]
    fn defaults() {
        let config = GenConfig::default();
        assert_eq!(config.api_prefix, "Vk");
        assert_eq!(config.project_tag, "LE");
        assert_eq!(config.member_prefix, "e");
        assert_eq!(config.bit_suffix, "Bit");
        assert_eq!(config.namespace, "le");
        assert_eq!(config.unknown_name, "Unknown");
        assert_eq!(config.indent, "\t");
        assert_eq!(config.banner(), format!("// {}", "-".repeat(70)));
        assert_eq!(config.group_config("VkFormat"), GroupConfig::default());
    }

    #[test]
    fn empty_file_is_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.api_prefix, "Vk");
        let config = parse_config("# only a comment\n").unwrap();
        assert_eq!(config.api_prefix, "Vk");
    }

    #[test]
    fn top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "Source: vk.xml\nApiPrefix: Xr\nProjectTag: APP\nMemberPrefix: k\nNamespace: ''\nIndent: '    '\nBannerWidth: 10\nUnknownName: ''\n",
        );
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.source, Some(PathBuf::from("vk.xml")));
        assert_eq!(config.api_prefix, "Xr");
        assert_eq!(config.project_tag, "APP");
        assert_eq!(config.member_prefix, "k");
        assert_eq!(config.namespace, "");
        assert_eq!(config.indent, "    ");
        assert_eq!(config.banner_width, 10);
        assert_eq!(config.unknown_name, "");
    }

    #[test]
    fn group_overrides() {
        let config = parse_config(
            "Groups:\n  VkFormat:\n    Name: PixelFormat\n    Exclude:\n      - VK_FORMAT_UNDEFINED\n",
        )
        .unwrap();
        let group = config.group_config("VkFormat");
        assert_eq!(group.type_name.as_deref(), Some("PixelFormat"));
        assert_eq!(group.exclude, vec!["VK_FORMAT_UNDEFINED".to_string()]);
        assert_eq!(config.group_config("VkResult"), GroupConfig::default());
    }

    #[test]
    fn wrong_types_are_errors() {
        assert!(parse_config("ApiPrefix: [a, b]\n").is_err());
        assert!(parse_config("BannerWidth: wide\n").is_err());
        assert!(parse_config("Groups: 3\n").is_err());
        assert!(parse_config("- a\n- b\n").is_err());
    }

    #[test]
    fn group_options_are_type_checked() {
        assert!(parse_config("Groups:\n  VkFormat:\n    Exclude: VK_FORMAT_UNDEFINED\n").is_err());
        assert!(parse_config("Groups:\n  VkFormat:\n    Exclude: [1, 2]\n").is_err());
        assert!(parse_config("Groups:\n  VkFormat:\n    Name: [a]\n").is_err());
        assert!(parse_config("Groups:\n  VkFormat: PixelFormat\n").is_err());
    }

    #[test]
    fn empty_or_unknown_group_options_keep_defaults() {
        let config =
            parse_config("Groups:\n  VkFormat:\n  VkResult:\n    Rename: Status\n").unwrap();
        assert_eq!(config.group_config("VkFormat"), GroupConfig::default());
        assert_eq!(config.group_config("VkResult"), GroupConfig::default());
    }

    #[test]
    fn unknown_keys_ignored() {
        let config = parse_config("Colour: blue\n").unwrap();
        assert_eq!(config.api_prefix, "Vk");
    }
}
