//! Interactive model selection on a terminal.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use deckbox_engine::ModelEntry;

/// What one line of input selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Pick(usize),
    Invalid(String),
}

/// Interpret one answer: a 1-based number, a slug, or empty for the first
/// entry.
pub fn parse_choice(entries: &[ModelEntry], line: &str) -> Choice {
    let answer = line.trim();
    if answer.is_empty() {
        return Choice::Pick(0);
    }
    if let Ok(n) = answer.parse::<usize>() {
        return if (1..=entries.len()).contains(&n) {
            Choice::Pick(n - 1)
        } else {
            Choice::Invalid(format!("pick a number from 1 to {}", entries.len()))
        };
    }
    match entries.iter().position(|e| e.slug == answer) {
        Some(i) => Choice::Pick(i),
        None => Choice::Invalid(format!("no model named '{answer}'")),
    }
}

/// Print the menu and ask until a valid answer arrives. Fails on end of
/// input.
pub fn pick<R: BufRead, W: Write>(
    entries: &[ModelEntry],
    mut input: R,
    mut out: W,
) -> Result<String> {
    if entries.is_empty() {
        bail!("the catalog has no models");
    }
    writeln!(out, "Available models:")?;
    for (i, entry) in entries.iter().enumerate() {
        writeln!(out, "  {:>2}. {:<28} {}", i + 1, entry.slug, entry.label)?;
    }
    loop {
        write!(out, "Model [1]: ")?;
        out.flush()?;
        let mut line = String::new();
        let read = input.read_line(&mut line).context("reading model choice")?;
        if read == 0 {
            bail!("no model chosen");
        }
        match parse_choice(entries, &line) {
            Choice::Pick(i) => return Ok(entries[i].slug.clone()),
            Choice::Invalid(why) => writeln!(out, "{why}")?,
        }
    }
}
