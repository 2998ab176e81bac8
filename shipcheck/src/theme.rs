//! Color theme system for shipcheck.
//!
//! Two built-in themes:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions without truecolor.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB and needs a
//!   truecolor terminal.

use ratatui::style::Color;

/// All color values used across the UI.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Text
    pub text: Color,
    /// Placeholders, hints and timestamps.
    pub muted: Color,
    /// Field labels and headings.
    pub accent: Color,
    /// Highlight for the selected repository.
    pub selection: Color,

    // Phase rows
    pub phase_pending: Color,
    pub phase_running: Color,
    pub phase_complete: Color,
    pub phase_failed: Color,

    // Verdict banner
    pub verdict_yes: Color,
    pub verdict_no: Color,
    pub verdict_unknown: Color,

    // Notices
    /// Validation, credential and protocol notices.
    pub notice_error: Color,
    pub notice_info: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator color when navigating.
    pub status_mode_normal: Color,
    /// Mode indicator color while a field is being edited.
    pub status_mode_edit: Color,
}

impl Theme {
    /// The built-in dark theme using ANSI 16 colors. Works on all terminals.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            text: Color::Reset,
            muted: Color::DarkGray,
            accent: Color::Cyan,
            selection: Color::Yellow,

            phase_pending: Color::DarkGray,
            phase_running: Color::Yellow,
            phase_complete: Color::Green,
            phase_failed: Color::Red,

            verdict_yes: Color::Green,
            verdict_no: Color::Red,
            verdict_unknown: Color::Yellow,

            notice_error: Color::Red,
            notice_info: Color::Cyan,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_edit: Color::Green,
        }
    }

    /// The Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            text,
            muted: overlay1,
            accent: blue,
            selection: peach,

            phase_pending: overlay1,
            phase_running: yellow,
            phase_complete: green,
            phase_failed: red,

            verdict_yes: green,
            verdict_no: red,
            verdict_unknown: yellow,

            notice_error: red,
            notice_info: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_edit: green,
        }
    }

    /// Resolves a theme name to a built-in theme.
    ///
    /// Unknown names fall back to `dark()` with a warning in the log, so a typo in
    /// config never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
