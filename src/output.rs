// src/output.rs
use std::fmt::Write;

use crate::models::{CodeOutput, EvaluationResult};

/// The auxiliary outputs the service can attach to a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// `asm-intel`: compiler assembly listing.
    Assembly,
    /// `asm-<arch>`: objdump disassembly for an architecture.
    Disassembly(String),
    /// `hexdump-binary`
    Hexdump,
    Other,
}

impl OutputKind {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("asm-intel") => OutputKind::Assembly,
            Some("hexdump-binary") => OutputKind::Hexdump,
            Some(tag) => match tag.strip_prefix("asm-") {
                Some(arch) if !arch.is_empty() => OutputKind::Disassembly(arch.to_string()),
                _ => OutputKind::Other,
            },
            None => OutputKind::Other,
        }
    }

    pub fn title(&self) -> String {
        match self {
            OutputKind::Assembly => "Assembly Output (gcc -S)".to_string(),
            OutputKind::Disassembly(arch) => format!("Disassembly ({})", arch),
            OutputKind::Hexdump => "Binary Hexdump".to_string(),
            OutputKind::Other => "Additional Output".to_string(),
        }
    }
}

impl From<&CodeOutput> for OutputKind {
    fn from(output: &CodeOutput) -> Self {
        OutputKind::from_tag(output.language.as_deref())
    }
}

/// Coarse classification of a result, used to color the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Empty,
}

impl Outcome {
    pub fn of(result: &EvaluationResult) -> Self {
        if result.return_code != 0 {
            Outcome::Failure
        } else if !result.stdout.is_empty() || !result.code_outputs.is_empty() {
            Outcome::Success
        } else {
            Outcome::Empty
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "ok"),
            Outcome::Failure => write!(f, "error"),
            Outcome::Empty => write!(f, "no output"),
        }
    }
}

/// Renders a result as plain text: code outputs first, then program output and errors.
pub fn render_plain(result: &EvaluationResult) -> String {
    let mut out = String::new();

    for output in &result.code_outputs {
        let title = OutputKind::from(output).title();
        let _ = writeln!(out, "── {} ──", title);
        push_block(&mut out, &output.content);
    }

    if !result.stdout.is_empty() {
        let _ = writeln!(out, "── Program Output ──");
        push_block(&mut out, &result.stdout);
    }

    if !result.stderr.is_empty() {
        let _ = writeln!(out, "── Program Errors ──");
        push_block(&mut out, &result.stderr);
    }

    out
}

fn push_block(out: &mut String, content: &str) {
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
}
