use ::console::Term;
use anyhow::{Context, Result};
use clap::CommandFactory;
use clap::FromArgMatches;
#[cfg(panic = "unwind")]
use human_panic::setup_panic;
use libdiffmatch::cli::{self, Args, CleanupMode};
use libdiffmatch::config::{Config, ReadError, ScriptFormat};
use libdiffmatch::console_utils::{self, patch_status};
use libdiffmatch::diff::cleanup::{cleanup_efficiency, cleanup_semantic};
use libdiffmatch::diff::diff_main;
use libdiffmatch::{delta, match_locate, patch};
use log::{LevelFilter, debug, error, info, warn};
use serde_json as json;
use std::{fs, io, path::Path};

#[cfg(feature = "jemallocator")]
use jemallocator::Jemalloc;

#[cfg(feature = "jemallocator")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Return an instance of [Config] from a config file path (or the inferred default path)
///
/// If a config path isn't provided or there is some other failure, fall back to the default
/// config. This will error out if a config is found but is found to be an invalid config.
fn derive_config(args: &Args) -> Result<Config> {
    if args.no_config {
        info!("`no_config` specified, falling back to default config");
        return Ok(Config::default());
    }
    match Config::try_from_file(args.config.as_ref()) {
        Ok(config) => Ok(config),
        Err(e) => match e {
            // A missing config file isn't a hard error, the defaults are fine
            ReadError::ReadFileFailure(_) | ReadError::NoDefault => {
                warn!("{e} - falling back to default config");
                Ok(Config::default())
            }
            // A config file that exists but doesn't parse is almost certainly a mistake the user
            // wants to hear about
            ReadError::DeserializationFailure(e) => {
                error!("Failed to deserialize config file: {e}");
                Err(anyhow::anyhow!(e))
            }
        },
    }
}

/// Read a whole file into a string, attaching the path to any error.
fn read_file(path: &Path) -> Result<String> {
    debug!("Reading {} to string", path.display());
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Print the edit script between two files
fn run_diff(
    config: &Config,
    old: &Path,
    new: &Path,
    checklines: bool,
    cleanup: CleanupMode,
    format: Option<ScriptFormat>,
) -> Result<()> {
    let old_text = read_file(old)?;
    let new_text = read_file(new)?;
    let mut edits = diff_main(&old_text, &new_text, checklines, &config.engine.diff);
    match cleanup {
        CleanupMode::None => {}
        CleanupMode::Semantic => cleanup_semantic(&mut edits),
        CleanupMode::Efficiency => cleanup_efficiency(&mut edits, config.engine.diff.edit_cost),
    }
    info!("Computed {} edits with {cleanup} cleanup", edits.len());

    let rendered = match format.unwrap_or(config.script_format) {
        ScriptFormat::Delta => delta::to_delta(&edits),
        ScriptFormat::Json => json::to_string_pretty(&edits)?,
    };
    // Buffer the output so printing a large script doesn't flush on every line
    let term = Term::buffered_stdout();
    term.write_line(&rendered)?;
    term.flush()?;
    Ok(())
}

/// Print the patch text that turns one file into another
fn run_make_patch(config: &Config, old: &Path, new: &Path) -> Result<()> {
    let old_text = read_file(old)?;
    let new_text = read_file(new)?;
    let patches = patch::make(&old_text, new_text.as_str().into(), &config.engine);
    let term = Term::buffered_stdout();
    term.write_str(&patch::to_text(&patches))?;
    term.flush()?;
    Ok(())
}

/// Apply a patch file, reporting the status of each patch on stderr
fn run_apply(config: &Config, patch_path: &Path, target: &Path, output: Option<&Path>) -> Result<()> {
    let patches = patch::from_text(&read_file(patch_path)?)
        .with_context(|| format!("Invalid patch file {}", patch_path.display()))?;
    let text = read_file(target)?;
    let (patched, results) = patch::apply(&patches, &text, &config.engine);

    let status = Term::buffered_stderr();
    for (idx, applied) in results.iter().enumerate() {
        status.write_line(&format!("patch {}: {}", idx + 1, patch_status(*applied)))?;
    }
    status.flush()?;

    match output {
        Some(path) => fs::write(path, &patched)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let term = Term::buffered_stdout();
            term.write_str(&patched)?;
            term.flush()?;
        }
    }

    let failed = results.iter().filter(|&&applied| !applied).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} patches failed to apply", results.len());
    }
    Ok(())
}

/// Print the location of the best match for a pattern
fn run_locate(config: &Config, text: &Path, pattern: &str, loc: usize) -> Result<()> {
    let text = read_file(text)?;
    match match_locate(&text, pattern, loc, &config.engine.matching)? {
        Some(found) => println!("{found}"),
        None => println!("none"),
    }
    Ok(())
}

/// Serialize the default options struct to a json file and print that to stdout
fn dump_default_config() -> Result<()> {
    let config = Config::default();
    println!("{}", json::to_string_pretty(&config)?);
    Ok(())
}

/// Print shell completion scripts to `stdout`.
///
/// This is a basic wrapper for the subcommand.
fn print_shell_completion(shell: clap_complete::Shell) {
    let mut app = cli::Args::command();
    clap_complete::generate(shell, &mut app, "diffmatch", &mut io::stdout());
}

fn main() -> Result<()> {
    // Set up a panic handler that will yield more human-readable errors.
    #[cfg(panic = "unwind")]
    setup_panic!();

    use cli::Command;

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;

    let log_level = if args.debug {
        LevelFilter::Trace
    } else {
        LevelFilter::Off
    };
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log_level)
        .init();
    console_utils::set_term_colors(args.color_output);

    // We parse the config as early as possible so users can get quick feedback if anything is off
    // with their config.
    let config = derive_config(&args)?;

    match &args.cmd {
        Command::Diff {
            old,
            new,
            no_checklines,
            cleanup,
            format,
        } => run_diff(&config, old, new, !no_checklines, *cleanup, *format)?,
        Command::MakePatch { old, new } => run_make_patch(&config, old, new)?,
        Command::Apply {
            patch,
            target,
            output,
        } => run_apply(&config, patch, target, output.as_deref())?,
        Command::Locate { text, pattern, loc } => run_locate(&config, text, pattern, *loc)?,
        Command::DumpDefaultConfig => dump_default_config()?,
        Command::GenCompletion { shell } => print_shell_completion(*shell),
    }
    Ok(())
}
