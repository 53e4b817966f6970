//! Parser for `.ffi` signature files.
//!
//! # File Format
//!
//! ```text
//! # Comment lines start with #
//!
//! # Function signature: name: (arg_types) -> return_type
//! say_hello: () -> void
//! compute: (f64, f64, cstr) -> f64
//! transform: (ptr_mut<f64>, usize) -> void
//! ```
//!
//! # Supported Types
//!
//! - `f64`, `double` - 64-bit float
//! - `f32`, `float` - 32-bit float
//! - `i32`, `int` - 32-bit signed integer
//! - `i64` - 64-bit signed integer
//! - `u32` - 32-bit unsigned integer
//! - `usize`, `size_t` - pointer-sized unsigned integer
//! - `cstr`, `char*` - NUL-terminated string
//! - `ptr<T>` - immutable pointer to T
//! - `ptr_mut<T>` - mutable pointer to T
//! - `void` - no return value

use crate::types::{FfiSignature, FfiType};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A collection of parsed function signatures for a library.
#[derive(Debug, Clone, Default)]
pub struct SignatureFile {
    /// Function signatures indexed by name
    pub signatures: BTreeMap<String, FfiSignature>,
}

impl SignatureFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.ffi` file from a path.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ParseError {
            line: 0,
            message: format!("failed to read '{}': {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Parse `.ffi` content from a string.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut signatures = BTreeMap::new();

        for (idx, line) in content.lines().enumerate() {
            let line_num = idx + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sig = parse_signature_line(line, line_num)?;
            if signatures.contains_key(&sig.name) {
                return Err(ParseError {
                    line: line_num,
                    message: format!("duplicate declaration of '{}'", sig.name),
                });
            }
            signatures.insert(sig.name.clone(), sig);
        }

        Ok(Self { signatures })
    }

    pub fn insert(&mut self, sig: FfiSignature) {
        self.signatures.insert(sig.name.clone(), sig);
    }

    /// Get a signature by function name.
    pub fn get(&self, name: &str) -> Option<&FfiSignature> {
        self.signatures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signatures.contains_key(name)
    }

    /// Iterate over all signatures in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FfiSignature> {
        self.signatures.values()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl fmt::Display for SignatureFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sig in self.iter() {
            writeln!(f, "{sig}")?;
        }
        Ok(())
    }
}

/// Error during signature file parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number, 0 for errors not tied to a line
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a single signature line: `name: (arg_types) -> return_type`
fn parse_signature_line(line: &str, line_num: usize) -> Result<FfiSignature, ParseError> {
    let err = |message: String| ParseError {
        line: line_num,
        message,
    };

    let (name, rest) = line
        .split_once(':')
        .ok_or_else(|| err("expected ':' after function name".to_string()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(err("function name cannot be empty".to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(err(format!("invalid function name '{name}'")));
    }

    let (args, ret) = parse_type_signature(rest.trim(), line_num)?;
    Ok(FfiSignature::new(name, args, ret))
}

/// Parse `(arg_types) -> return_type`
fn parse_type_signature(s: &str, line_num: usize) -> Result<(Vec<FfiType>, FfiType), ParseError> {
    let err = |message: String| ParseError {
        line: line_num,
        message,
    };

    if !s.starts_with('(') {
        return Err(err("expected '(' at start of type signature".to_string()));
    }

    let close_paren =
        find_matching_paren(s).ok_or_else(|| err("unmatched '(' in type signature".to_string()))?;

    let args_str = &s[1..close_paren];
    let ret_str = s[close_paren + 1..]
        .trim()
        .strip_prefix("->")
        .ok_or_else(|| err("expected '->' after argument list".to_string()))?
        .trim();

    let args = parse_arg_list(args_str, line_num)?;
    if args.contains(&FfiType::Void) {
        return Err(err("'void' is only valid as a return type".to_string()));
    }

    let ret = FfiType::parse(ret_str).ok_or_else(|| err(format!("unknown return type: '{ret_str}'")))?;

    Ok((args, ret))
}

/// Parse comma-separated argument list, splitting only outside `<...>`.
fn parse_arg_list(s: &str, line_num: usize) -> Result<Vec<FfiType>, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(vec![]);
    }

    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&s[start..]);

    pieces
        .into_iter()
        .map(|piece| {
            let piece = piece.trim();
            FfiType::parse(piece).ok_or_else(|| ParseError {
                line: line_num,
                message: format!("unknown argument type: '{piece}'"),
            })
        })
        .collect()
}

/// Position of the ')' closing the '(' at index 0.
fn find_matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
