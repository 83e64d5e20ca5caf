pub mod cli;
pub mod config;
pub mod driver;
pub mod logging;
pub mod naming;
pub mod patch;
pub mod render;
pub mod resolve;
pub mod schema;

use std::fs::File;
use std::io::{self, BufReader, Write};

use anyhow::{Context, Result};

use cli::{Args, Mode};
use config::{load_config, GenConfig};
use schema::{load_schema, Schema};

/// Run the generator. Returns the exit code: 0 on success; fatal problems
/// are returned as errors.
pub fn run(args: Args) -> Result<i32> {
    logging::init_tracing(args.debug);

    let config = load_config(args.config.as_deref())?;
    let source = args
        .source
        .clone()
        .or_else(|| config.source.clone())
        .context("no enum source given: pass --source or set Source in .enumgen.yml")?;
    let schema = load_schema(&source)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.mode() {
        Mode::ListGroups => {
            for group in schema.groups() {
                writeln!(out, "{}", group.name)?;
            }
        }
        Mode::DumpJson(name) => {
            let group = resolve::resolve_group(&schema, &name, &config)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&group)?)?;
        }
        Mode::Describe { group, value } => {
            writeln!(out, "{}", describe(&schema, &group, &value, &config)?)?;
        }
        Mode::Patch(input) => {
            let output = args.output.as_deref();
            let outcome = patch::patch_file(&input, output, &schema, &config, &mut out)?;
            if let Some(path) = output {
                if outcome.backup.is_some() {
                    eprintln!("Created backup for `{}`.", path.display());
                }
                eprintln!(
                    "Generated {} enums in output file: `{}`",
                    outcome.regions,
                    path.display()
                );
            }
        }
        Mode::Interactive => {
            let stdin = io::stdin();
            driver::run_interactive(&schema, stdin.lock(), &mut out, &config)?;
        }
        Mode::Batch => {
            let summary = match &args.requests {
                Some(path) => {
                    let file = File::open(path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    driver::run_batch(&schema, BufReader::new(file), &mut out, &config)?
                }
                None => driver::run_batch(&schema, io::stdin().lock(), &mut out, &config)?,
            };
            eprintln!(
                "Generated {} enums ({} not found, {} requests skipped)",
                summary.generated, summary.not_found, summary.skipped
            );
        }
    }

    out.flush()?;
    Ok(0)
}

/// `--describe`: the name a value maps to, or the ` | `-joined bit names for
/// bitmask groups.
fn describe(schema: &Schema, group: &str, value: &str, config: &GenConfig) -> Result<String> {
    let resolved = resolve::resolve_group(schema, group, config)?;
    let number = schema::lexer::parse_int_literal(value.trim())
        .with_context(|| format!("`{value}` is not an integer"))?;
    if resolved.is_bitmask() {
        let bits = u128::try_from(number)
            .with_context(|| format!("flag value `{value}` is negative"))?;
        Ok(render::describe_flags(&resolved, bits, config))
    } else {
        Ok(render::describe_value(&resolved, number, config).to_string())
    }
}
