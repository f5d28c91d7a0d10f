use std::io::IsTerminal;
use std::sync::OnceLock;

/// Whether stdout is an interactive terminal that can take escape sequences.
pub fn supports_styling() -> bool {
    static SUPPORTS: OnceLock<bool> = OnceLock::new();
    *SUPPORTS.get_or_init(|| {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        std::io::stdout().is_terminal()
    })
}

/// Whether to emit OSC 8 hyperlinks.
pub fn supports_hyperlinks() -> bool {
    static SUPPORTS: OnceLock<bool> = OnceLock::new();
    *SUPPORTS.get_or_init(|| {
        // Explicit override via env var
        if let Ok(val) = std::env::var("HYPERLINKS") {
            return val != "0" && val.to_lowercase() != "false";
        }
        supports_styling()
    })
}

/// Create OSC 8 hyperlink if terminal supports it, otherwise plain text
pub fn hyperlink(url: &str, text: &str) -> String {
    if supports_hyperlinks() {
        format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
    } else {
        text.to_string()
    }
}

/// Markers around highlighted search matches: bold on a terminal, brackets otherwise.
pub fn emphasis() -> (&'static str, &'static str) {
    if supports_styling() {
        ("\x1b[1;33m", "\x1b[0m")
    } else {
        ("[", "]")
    }
}
