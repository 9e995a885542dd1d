use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the human-facing summary
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
}

impl Theme {
    /// Colored only when stdout is a terminal and colors aren't disabled (`NO_COLOR`, `CLICOLOR=0`)
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
