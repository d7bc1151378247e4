use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;

/// Decides whether, and how, REPL output is coloured.
#[derive(Clone, Debug)]
pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    /// Colours output only when stdout is a terminal and `plain` is false.
    pub fn new(plain: bool) -> Self {
        let paint = !plain && std::io::stdout().is_terminal();

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        Self {
            palette: Palette::dark(),
            paint,
        }
    }

    /// Never colours output.
    pub fn plain() -> Self {
        Self {
            palette: Palette::dark(),
            paint: false,
        }
    }

    /// The prompt shown before each line is read.
    pub fn prompt(&self, app: &str) -> String {
        self.style(self.palette.prompt, format!("{app} > "))
    }

    /// A statement completed.
    pub fn success(&self, message: impl Display) -> String {
        self.style(self.palette.success, message)
    }

    /// A statement or command was rejected.
    pub fn error(&self, message: impl Display) -> String {
        self.style(self.palette.error, message)
    }

    /// Diagnostic output such as the tree dump.
    pub fn detail(&self, message: impl Display) -> String {
        self.style(self.palette.detail, message)
    }

    fn style(&self, style: Style, message: impl Display) -> String {
        if self.paint {
            style.paint(message.to_string()).to_string()
        } else {
            message.to_string()
        }
    }
}

#[derive(Clone, Debug)]
struct Palette {
    prompt: Style,
    success: Style,
    error: Style,
    detail: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            prompt: Style::new().bold().fg(Color::Cyan),
            success: Style::new().fg(Color::Green),
            error: Style::new().bold().fg(Color::Red),
            detail: Style::new().dimmed(),
        }
    }
}
