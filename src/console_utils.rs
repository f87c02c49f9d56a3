//! Helper functions for dealing with the terminal

use console::{set_colors_enabled, set_colors_enabled_stderr, style, StyledObject};
use strum::{Display, EnumString};

/// Whether the output to the terminal should be colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColorOutputPolicy {
    /// Automatically enable color if printing to a TTY, otherwise disable color
    #[default]
    Auto,
    /// Force plaintext output
    Off,
    /// Force color output
    On,
}

/// Set terminal color settings based on the output policy.
pub fn set_term_colors(setting: ColorOutputPolicy) {
    let colors_enabled = match setting {
        ColorOutputPolicy::Auto => return,
        ColorOutputPolicy::On => true,
        ColorOutputPolicy::Off => false,
    };
    set_colors_enabled(colors_enabled);
    set_colors_enabled_stderr(colors_enabled);
}

/// A short status label for a patch that was or wasn't applied.
///
/// Colors are only emitted when they're enabled for stderr, which is where the status summary
/// gets written.
pub fn patch_status(applied: bool) -> StyledObject<&'static str> {
    if applied {
        style("applied").green().for_stderr()
    } else {
        style("failed").red().bold().for_stderr()
    }
}
