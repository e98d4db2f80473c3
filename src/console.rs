// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator console: prompts during first-time setup and the cycle report.

use std::io::{self, BufRead, Write};

/// Where the uploader talks to the operator.
pub trait Console {
    /// Print a message on its own line.
    fn show(&mut self, message: &str);

    /// Print `question` and read one line of input (trimmed, not masked).
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Clear the screen before a new report.
    fn clear(&mut self);
}

/// The process's terminal (stdout/stdin).
#[derive(Debug, Default)]
pub struct Terminal;

impl Console for Terminal {
    fn show(&mut self, message: &str) {
        println!("{}", message);
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed",
            ));
        }
        Ok(line.trim().to_string())
    }

    fn clear(&mut self) {
        // ANSI: erase display, cursor home.
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }
}
