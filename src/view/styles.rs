//! Card and column styling.

use ratatui::style::{Color, Modifier, Style};

// ===== ColorConfig =====

/// Whether colors are enabled.
///
/// Disabled by the `--no-color` flag or any `NO_COLOR` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    enabled: bool,
}

impl ColorConfig {
    /// Resolve from the `--no-color` flag and `NO_COLOR`.
    pub fn from_env_and_args(no_color_flag: bool) -> Self {
        let enabled = !no_color_flag && std::env::var("NO_COLOR").is_err();
        Self { enabled }
    }

    /// Whether styles may use colors.
    pub fn colors_enabled(self) -> bool {
        self.enabled
    }
}

// ===== FeedStyles =====

/// Styles of the parts of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStyles {
    /// Border of an unfocused column.
    pub border: Style,
    /// Border of the focused column.
    pub focused_border: Style,
    /// Title of a read card.
    pub title: Style,
    /// Title of an unread card.
    pub unread_title: Style,
    /// Repository line.
    pub subtitle: Style,
    /// Labels and the unread dot.
    pub labels: Style,
    /// Actor, time and header rows.
    pub meta: Style,
    /// Patch applied to the selected card.
    pub selected: Style,
    /// Footer text.
    pub footer: Style,
    /// Override title.
    pub warning: Style,
}

impl FeedStyles {
    /// Styles for the given color setting.
    pub fn with_color_config(config: ColorConfig) -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        if !config.colors_enabled() {
            return Self {
                border: Style::default(),
                focused_border: bold,
                title: Style::default(),
                unread_title: bold,
                subtitle: Style::default(),
                labels: Style::default(),
                meta: Style::default(),
                selected: Style::default().add_modifier(Modifier::REVERSED),
                footer: Style::default(),
                warning: bold,
            };
        }

        Self {
            border: Style::default().fg(Color::DarkGray),
            focused_border: Style::default().fg(Color::Cyan),
            title: Style::default().fg(Color::White),
            unread_title: bold.fg(Color::White),
            subtitle: Style::default().fg(Color::Gray),
            labels: Style::default().fg(Color::Yellow),
            meta: Style::default().fg(Color::DarkGray),
            selected: Style::default().bg(Color::DarkGray),
            footer: Style::default().fg(Color::DarkGray),
            warning: bold.fg(Color::Red),
        }
    }
}

impl Default for FeedStyles {
    fn default() -> Self {
        Self::with_color_config(ColorConfig::from_env_and_args(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(no_color)]
    fn no_color_flag_disables_colors() {
        assert!(!ColorConfig::from_env_and_args(true).colors_enabled());
    }

    #[test]
    #[serial(no_color)]
    fn no_color_env_disables_colors() {
        std::env::set_var("NO_COLOR", "1");
        let config = ColorConfig::from_env_and_args(false);
        std::env::remove_var("NO_COLOR");

        assert!(!config.colors_enabled());
    }

    #[test]
    fn monochrome_styles_carry_no_colors() {
        let styles = FeedStyles::with_color_config(ColorConfig { enabled: false });

        assert_eq!(styles.border.fg, None);
        assert_eq!(styles.labels.fg, None);
        assert!(styles.unread_title.add_modifier.contains(Modifier::BOLD));
    }
}
