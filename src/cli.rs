use std::path::PathBuf;

use clap::Parser;

/// What a run does, derived from the mode flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Render every request line into one header (the default).
    Batch,
    /// `-p FILE`: regenerate the marked regions of FILE.
    Patch(PathBuf),
    /// `-i`: prompt for names until `q`.
    Interactive,
    /// `--list-groups`
    ListGroups,
    /// `--dump-json GROUP`
    DumpJson(String),
    /// `--describe GROUP VALUE`
    Describe { group: String, value: String },
}

#[derive(Parser, Debug)]
#[command(
    name = "enumgen",
    version,
    about = "Mirror C header or XML registry enums into C++ enum classes"
)]
pub struct Args {
    /// Request file for batch mode, one `Group[, string_table][, c]` per line
    /// (default: stdin)
    pub requests: Option<PathBuf>,

    /// Enum source: an XML API registry (.xml) or a C header
    #[arg(short, long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Path to configuration file (default: ./.enumgen.yml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Regenerate the `// Codegen <Group>` regions of FILE
    #[arg(short, long, value_name = "FILE")]
    pub patch: Option<PathBuf>,

    /// Where patched output goes (default: stdout). An existing file is
    /// backed up to FILE.backup first
    #[arg(short, long, value_name = "FILE", requires = "patch")]
    pub output: Option<PathBuf>,

    /// Prompt for struct or enum names, one at a time
    #[arg(short, long)]
    pub interactive: bool,

    /// List the groups found in the source, then exit
    #[arg(long)]
    pub list_groups: bool,

    /// Print the resolved members of GROUP as JSON, then exit
    #[arg(long, value_name = "GROUP")]
    pub dump_json: Option<String>,

    /// Print the name(s) VALUE maps to in GROUP, as the generated helpers would
    #[arg(long, num_args = 2, value_names = ["GROUP", "VALUE"])]
    pub describe: Vec<String>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Resolve the run mode. Listing and inspection flags win over `--patch`,
    /// which wins over `--interactive`.
    pub fn mode(&self) -> Mode {
        if self.list_groups {
            Mode::ListGroups
        } else if let Some(group) = &self.dump_json {
            Mode::DumpJson(group.clone())
        } else if let [group, value] = self.describe.as_slice() {
            Mode::Describe {
                group: group.clone(),
                value: value.clone(),
            }
        } else if let Some(path) = &self.patch {
            Mode::Patch(path.clone())
        } else if self.interactive {
            Mode::Interactive
        } else {
            Mode::Batch
        }
    }
}
