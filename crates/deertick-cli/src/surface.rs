use async_trait::async_trait;
use deertick_core::{DeertickError, DeertickResult};
use deertick_orchestrator::ChatSurface;
use std::io::Write;

const RESET: &str = "\x1b[0m";
const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const CYAN: &str = "36";

/// Wrap `text` in an ANSI color, or leave it plain.
pub fn paint(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{color}m{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Terminal chat surface on stdin/stdout.
pub struct StdioSurface {
    color: bool,
}

impl StdioSurface {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

#[async_trait]
impl ChatSurface for StdioSurface {
    async fn prompt(&mut self, question: &str) -> DeertickResult<Option<String>> {
        print!("{}", paint(question, CYAN, self.color));
        std::io::stdout().flush()?;

        let line = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            std::io::stdin().read_line(&mut input).map(|n| (n, input))
        })
        .await
        .map_err(|e| DeertickError::Io(std::io::Error::other(e.to_string())))??;

        match line {
            (0, _) => Ok(None),
            (_, input) => Ok(Some(input.trim_end_matches(['\r', '\n']).to_string())),
        }
    }

    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    fn notice(&mut self, line: &str) {
        println!("{}", paint(line, GREEN, self.color));
    }

    fn error(&mut self, line: &str) {
        eprintln!("{}", paint(line, RED, self.color));
    }

    fn reply(&mut self, model: &str, text: &str) {
        println!("{}: {text}", paint(model, YELLOW, self.color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint() {
        assert_eq!(paint("hi", GREEN, true), "\x1b[32mhi\x1b[0m");
        assert_eq!(paint("hi", GREEN, false), "hi");
    }
}
