// src/language.rs
use std::path::Path;
use std::str::FromStr;

use crate::errors::EvalError;

/// Languages the evaluation service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    /// C compiled to an assembly listing.
    CToAsm,
    /// C compiled and disassembled with objdump.
    CToObjdump,
    Rust,
    Go,
    Ruby,
    Lua,
    Haskell,
    Prolog,
    Brainfuck,
    Assembly,
}

impl Language {
    pub const ALL: [Language; 16] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::CToAsm,
        Language::CToObjdump,
        Language::Rust,
        Language::Go,
        Language::Ruby,
        Language::Lua,
        Language::Haskell,
        Language::Prolog,
        Language::Brainfuck,
        Language::Assembly,
    ];

    /// Identifier sent to the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::CToAsm => "c_to_asm",
            Language::CToObjdump => "c_to_objdump",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Ruby => "ruby",
            Language::Lua => "lua",
            Language::Haskell => "haskell",
            Language::Prolog => "prolog",
            Language::Brainfuck => "brainfuck",
            Language::Assembly => "assembly",
        }
    }

    /// Syntax mode an editor should use for this language.
    pub fn editor_mode(&self) -> &'static str {
        match self {
            Language::CToAsm | Language::CToObjdump => "c",
            Language::Assembly => "asm",
            other => other.as_str(),
        }
    }

    /// Guesses the language from a file extension. C sources map to plain `c`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let language = match ext.as_str() {
            "py" => Language::Python,
            "js" | "mjs" => Language::JavaScript,
            "ts" => Language::TypeScript,
            "java" => Language::Java,
            "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "c" | "h" => Language::C,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "rb" => Language::Ruby,
            "lua" => Language::Lua,
            "hs" => Language::Haskell,
            "pl" | "pro" => Language::Prolog,
            "bf" => Language::Brainfuck,
            "s" | "asm" => Language::Assembly,
            _ => return None,
        };
        Some(language)
    }
}

impl FromStr for Language {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| EvalError::UnknownLanguage(s.to_string()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
