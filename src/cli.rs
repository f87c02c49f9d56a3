//! Code related to the CLI

use crate::config::ScriptFormat;
use crate::console_utils::ColorOutputPolicy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use strum_macros::{Display, EnumString};

/// Compute diffs, fuzzy matches and patches between plain text files
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,

    /// Print debug output
    ///
    /// This will print debug logs at the trace level. This is useful for debugging and bug
    /// reports should contain debug logging info.
    #[clap(short, long, global = true)]
    pub debug: bool,

    /// Specify a path to a config file. If this isn't set, the default config location is used.
    #[clap(short, long, env = "DIFFMATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Ignore any config files and use the default config
    #[clap(short, long, global = true)]
    pub no_config: bool,

    /// Set the color output policy. Valid values are: "auto", "on", "off".
    ///
    /// "auto" will automatically detect whether colors should be applied by trying to determine
    /// whether the process is outputting to a TTY. "on" will enable output and "off" will
    /// disable color output regardless of whether the process detects a TTY.
    #[clap(long = "color", default_value_t, global = true)]
    pub color_output: ColorOutputPolicy,
}

/// Which cleanup pass to run over a computed edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CleanupMode {
    /// Leave the raw, minimal edit script as is
    None,
    /// Favor edits that are easy for a person to read
    #[default]
    Semantic,
    /// Favor edits that are cheap for a machine to apply
    Efficiency,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute the edit script between two files
    Diff {
        /// The original file
        old: PathBuf,

        /// The new file
        new: PathBuf,

        /// Diff character by character, skipping the line level speedup for large inputs
        #[clap(long)]
        no_checklines: bool,

        /// The cleanup pass applied to the edit script
        #[clap(long, value_enum, default_value_t)]
        cleanup: CleanupMode,

        /// The output format. Overrides the format set in the config.
        #[clap(short, long)]
        format: Option<ScriptFormat>,
    },

    /// Create a patch that turns one file into another
    MakePatch {
        /// The original file
        old: PathBuf,

        /// The new file
        new: PathBuf,
    },

    /// Apply a patch to a file
    ///
    /// Patches are located with a fuzzy search, so the file doesn't need to be exactly the one
    /// the patch was made from. The process exits with an error if any patch fails to apply.
    Apply {
        /// The patch file, as written by `make-patch`
        patch: PathBuf,

        /// The file to apply the patch to
        target: PathBuf,

        /// Write the patched text to this file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the best fuzzy match of a pattern in a file
    Locate {
        /// The file to search
        text: PathBuf,

        /// The pattern to search for
        pattern: String,

        /// The character offset the pattern is expected to be found at
        #[clap(short, long, default_value_t = 0)]
        loc: usize,
    },

    /// Dump the default config to stdout
    DumpDefaultConfig,

    /// Generate shell completion scripts for diffmatch
    GenCompletion {
        /// The shell to generate completion scripts for.
        ///
        /// This will print the shell completion script to stdout. bash, zsh, fish, elvish, and
        /// powershell are supported.
        #[clap(value_enum)]
        shell: clap_complete::Shell,
    },
}
