//! Line-oriented terminal front end: prompts, choices and blocking alerts

use log::warn;
use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, Write};

use crate::capture::Notifier;

/// Options listed per screen in [`ConsoleUi::choose`]
const PAGE_SIZE: usize = 20;

pub struct ConsoleUi {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleUi {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Console bound to the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }

    pub fn print(&self, text: &str) {
        let mut output = self.output.lock();
        if let Err(e) = writeln!(output, "{}", text).and_then(|_| output.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }

    /// Show `prompt` and read one trimmed line. `None` once input is exhausted.
    pub fn read_line(&self, prompt: &str) -> Option<String> {
        {
            let mut output = self.output.lock();
            if let Err(e) = write!(output, "{}", prompt).and_then(|_| output.flush()) {
                warn!("Failed to write to console: {}", e);
            }
        }

        let mut line = String::new();
        match self.input.lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                warn!("Failed to read from console: {}", e);
                None
            }
        }
    }

    /// Yes/no question, anything but an explicit yes is a no
    pub fn confirm(&self, question: &str) -> bool {
        self.read_line(&format!("{} [y/N] ", question))
            .is_some_and(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// Let the user pick one of `options` by number.
    ///
    /// Long lists are shown [`PAGE_SIZE`] at a time; `n` and `p` move between
    /// pages and numbers always refer to the whole list. A blank answer (or
    /// end of input) cancels.
    pub fn choose(&self, title: &str, options: &[String]) -> Option<usize> {
        let pages = options.len().div_ceil(PAGE_SIZE).max(1);
        let prompt = if pages > 1 {
            "Number, n/p for next/previous page (blank to cancel): "
        } else {
            "Number (blank to cancel): "
        };
        let mut page = 0;

        self.print(title);
        self.show_page(options, page, pages);

        loop {
            let answer = self.read_line(prompt)?;
            if answer.is_empty() {
                return None;
            }

            match answer.to_ascii_lowercase().as_str() {
                "n" if page + 1 < pages => {
                    page += 1;
                    self.show_page(options, page, pages);
                    continue;
                }
                "p" if page > 0 => {
                    page -= 1;
                    self.show_page(options, page, pages);
                    continue;
                }
                _ => {}
            }

            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                _ => self.print(&format!("Please enter a number from 1 to {}.", options.len())),
            }
        }
    }

    fn show_page(&self, options: &[String], page: usize, pages: usize) {
        if pages > 1 {
            self.print(&format!("Page {}/{}", page + 1, pages));
        }
        let start = page * PAGE_SIZE;
        for (index, option) in options.iter().enumerate().skip(start).take(PAGE_SIZE) {
            self.print(&format!("  {:>3}. {}", index + 1, option));
        }
    }
}

impl Notifier for ConsoleUi {
    fn alert(&self, title: &str, message: &str) {
        self.print("");
        self.print(&format!("*** {} ***", title));
        self.print(message);
        // Block until acknowledged
        let _ = self.read_line("Press Enter to continue ");
    }
}
