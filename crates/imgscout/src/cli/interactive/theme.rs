//! Prompt styling and status lines for interactive mode. Everything goes to
//! stderr.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

const TAGLINE: &str = "find, pick and host product images";

/// Theme for the menus, the candidate checklist and the path prompts.
///
/// Picked candidates show as `[x]`, the cursor as `>`.
pub fn scout_theme() -> ColorfulTheme {
    let accent = Style::new().for_stderr().blue();
    let faint = Style::new().for_stderr().dim();

    ColorfulTheme {
        prompt_prefix: accent.apply_to(">>".to_string()),
        prompt_suffix: faint.apply_to(":".to_string()),
        active_item_prefix: accent.apply_to(">".to_string()),
        active_item_style: Style::new().for_stderr().bold(),
        inactive_item_prefix: style(" ".to_string()).for_stderr(),
        checked_item_prefix: style("[x]".to_string()).for_stderr().green(),
        unchecked_item_prefix: faint.apply_to("[ ]".to_string()),
        values_style: accent,
        ..ColorfulTheme::default()
    }
}

fn banner_lines() -> [String; 2] {
    let title = format!("imgscout {} | {TAGLINE}", imgscout_core::VERSION);
    let rule = "-".repeat(title.chars().count());
    [title, rule]
}

pub fn print_banner() {
    let [title, rule] = banner_lines();
    let bold = Style::new().for_stderr().bold();
    let faint = Style::new().for_stderr().dim();
    eprintln!();
    eprintln!("  {}", bold.apply_to(title));
    eprintln!("  {}", faint.apply_to(rule));
    eprintln!();
}

/// Yellow warning line.
pub fn warn(message: impl std::fmt::Display) {
    let warn = Style::new().for_stderr().yellow();
    eprintln!("  {}", warn.apply_to(message));
}

pub fn note(message: impl std::fmt::Display) {
    let dim = Style::new().for_stderr().dim();
    eprintln!("  {}", dim.apply_to(message));
}
