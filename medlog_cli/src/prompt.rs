//! Line-based prompts for interactive logging and registration.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Asks questions on `output` and reads answers from `input`
pub struct Prompter<R, W> {
    input: R,
    pub(crate) output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Trimmed answer, or `None` at end of input
    fn answer(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Free text; blank input gives `None`
    pub fn text(&mut self, prompt: &str) -> io::Result<Option<String>> {
        Ok(self.answer(prompt)?.filter(|s| !s.is_empty()))
    }

    /// Ask until `parse` accepts the answer; blank input gives `None`
    pub fn parsed<T, E, F>(&mut self, prompt: &str, help: &str, parse: F) -> io::Result<Option<T>>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        self.ask_parsed(prompt, help, parse, true)
    }

    /// Like [`Prompter::parsed`], but blank input asks again
    ///
    /// `None` only means the input ended.
    pub fn required<T, E, F>(&mut self, prompt: &str, help: &str, parse: F) -> io::Result<Option<T>>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        self.ask_parsed(prompt, help, parse, false)
    }

    fn ask_parsed<T, E, F>(
        &mut self,
        prompt: &str,
        help: &str,
        parse: F,
        allow_blank: bool,
    ) -> io::Result<Option<T>>
    where
        E: Display,
        F: Fn(&str) -> Result<T, E>,
    {
        loop {
            let Some(answer) = self.answer(prompt)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                if allow_blank {
                    return Ok(None);
                }
                writeln!(self.output, "{}", help)?;
                continue;
            }
            match parse(&answer) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    writeln!(self.output, "{}", e)?;
                    writeln!(self.output, "{}", help)?;
                }
            }
        }
    }

    /// Pick one of `options`, e.g. `Did you mean Aspirin? (yes/no/stop asking): `
    ///
    /// Answers are case-folded and may be any prefix that selects a single
    /// option, or an option in full. Ambiguous or unknown answers ask again.
    /// Blank input gives `None` when `allow_blank` is set. End of input
    /// always gives `None`.
    pub fn select(
        &mut self,
        question: &str,
        options: &[&str],
        allow_blank: bool,
    ) -> io::Result<Option<String>> {
        let prompt = format!("{} ({}): ", question, options.join("/"));
        loop {
            let Some(answer) = self.answer(&prompt)? else {
                return Ok(None);
            };
            let answer = answer.to_lowercase();
            if answer.is_empty() && allow_blank {
                return Ok(None);
            }

            let found: Vec<&str> = options
                .iter()
                .copied()
                .filter(|o| o.starts_with(answer.as_str()))
                .collect();
            match found.as_slice() {
                [only] => return Ok(Some(only.to_string())),
                many => {
                    if let Some(exact) = many.iter().find(|o| **o == answer) {
                        return Ok(Some(exact.to_string()));
                    }
                }
            }
        }
    }
}
