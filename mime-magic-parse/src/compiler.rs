//! One-pass compiler from rule text to a [`RuleForest`].
//!
//! Parsing is total: malformed lines are discarded with a [`Diagnostic`]
//! and compilation continues. Tree assembly keeps a cursor stack indexed by
//! depth, so a continuation line attaches to the most recent rule one level
//! up regardless of how many comment lines sit in between.

use std::io::{self, BufRead};

use tracing::{debug, warn};

use mime_magic_core::{Rule, RuleForest, RuleId, RuleKind, RuleOp};

use crate::diagnostic::Diagnostic;
use crate::lines::{decode_escapes, scan_line, ScannedLine};

/// Compile a single rule document.
///
/// `source` names the document in diagnostics (a path, a resource name).
pub fn compile(source: &str, text: &str) -> (RuleForest, Vec<Diagnostic>) {
    let mut compiler = Compiler::new();
    compiler.add_document(source, text);
    compiler.finish()
}

/// Compile a single rule document from a reader.
///
/// Only I/O failures from the reader surface as errors; malformed rule
/// lines are diagnostics, as always.
pub fn compile_reader<R: BufRead>(
    source: &str,
    reader: R,
) -> io::Result<(RuleForest, Vec<Diagnostic>)> {
    let mut compiler = Compiler::new();
    compiler.add_reader(source, reader)?;
    Ok(compiler.finish())
}

/// Incremental compiler for assembling one forest out of several rule
/// documents.
///
/// Documents contribute roots in the order they are added; diagnostics
/// accumulate across all of them. Continuation grouping never crosses a
/// document boundary.
#[derive(Debug, Default)]
pub struct Compiler {
    forest: RuleForest,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    /// Create an empty compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every rule line of `text` to the forest.
    pub fn add_document(&mut self, source: &str, text: &str) {
        let before_rules = self.forest.len();
        let before_diags = self.diagnostics.len();
        let mut cursors: Vec<RuleId> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            self.process_line(source, idx as u32 + 1, line, &mut cursors);
        }

        debug!(
            "compiled {}: {} rules, {} diagnostics",
            source,
            self.forest.len() - before_rules,
            self.diagnostics.len() - before_diags,
        );
    }

    /// Add every rule line read from `reader` to the forest.
    pub fn add_reader<R: BufRead>(&mut self, source: &str, reader: R) -> io::Result<()> {
        let mut cursors: Vec<RuleId> = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            self.process_line(source, idx as u32 + 1, &line, &mut cursors);
        }
        Ok(())
    }

    /// Finish compilation, returning the forest and all diagnostics.
    pub fn finish(self) -> (RuleForest, Vec<Diagnostic>) {
        (self.forest, self.diagnostics)
    }

    fn diagnose(&mut self, source: &str, line: u32, message: String) {
        warn!("{}:{}: {}", source, line, message);
        self.diagnostics.push(Diagnostic::new(source, line, message));
    }

    fn process_line(&mut self, source: &str, line_no: u32, line: &str, cursors: &mut Vec<RuleId>) {
        let raw = match scan_line(line) {
            ScannedLine::Skip => return,
            ScannedLine::Truncated { fields } => {
                self.diagnose(
                    source,
                    line_no,
                    format!("truncated line: {fields} field(s), need at least 3"),
                );
                return;
            }
            ScannedLine::Rule(raw) => raw,
        };

        // A rule may nest at most one level below the rule above it.
        if raw.depth > cursors.len() {
            self.diagnose(
                source,
                line_no,
                format!(
                    "continuation depth {} has no parent at depth {}",
                    raw.depth,
                    raw.depth - 1
                ),
            );
            return;
        }

        let Some(offset) = parse_offset(raw.offset) else {
            self.diagnose(source, line_no, format!("invalid offset '{}'", raw.offset));
            return;
        };

        let kind = parse_kind(raw.type_tok);
        if kind == RuleKind::Unknown {
            self.diagnose(
                source,
                line_no,
                format!("unknown type '{}'; rule will never match", raw.type_tok),
            );
        }

        let (op, body) = split_operator(&kind, raw.content);

        let mut rule = Rule::new(offset, kind.clone(), op);
        if kind.is_numeric() {
            let token = body.trim();
            if token.is_empty() {
                // `x` consumes the whole field; there is no value to parse.
                rule.value = 0;
            } else {
                let Some(value) = parse_number(token) else {
                    self.diagnose(
                        source,
                        line_no,
                        format!("invalid numeric content '{token}'"),
                    );
                    return;
                };
                rule.value = value;
                rule.content = token.as_bytes().to_vec();
            }
        } else {
            rule.content = decode_escapes(body);
        }
        rule.mime_type = raw.mime_type.map(str::to_owned);
        rule.mime_encoding = raw.mime_encoding.map(str::to_owned);

        let parent = raw.depth.checked_sub(1).map(|d| cursors[d]);
        let id = self.forest.attach(rule, parent);

        // This rule becomes the cursor at its depth; deeper cursors are
        // stale now.
        cursors.truncate(raw.depth);
        cursors.push(id);
    }
}

/// Parse the offset field: decimal, or hexadecimal with a `0x` prefix.
fn parse_offset(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Map a type token to a rule kind.
///
/// `string`, `belong`, `lelong`, `beshort`, `leshort` match by prefix;
/// `short` and `byte` match exactly. The `string>N` suffix selects the
/// bounded-contains form. Anything else is [`RuleKind::Unknown`].
fn parse_kind(token: &str) -> RuleKind {
    if let Some(rest) = token.strip_prefix("string") {
        if rest.is_empty() {
            return RuleKind::string();
        }
        if let Some(n) = rest.strip_prefix('>').and_then(|n| n.parse().ok()) {
            return RuleKind::Str { contains: Some(n) };
        }
        return RuleKind::Unknown;
    }
    if token.starts_with("belong") {
        RuleKind::BeLong
    } else if token.starts_with("lelong") {
        RuleKind::LeLong
    } else if token.starts_with("beshort") {
        RuleKind::BeShort
    } else if token.starts_with("leshort") {
        RuleKind::LeShort
    } else if token == "short" {
        RuleKind::Short
    } else if token == "byte" {
        RuleKind::Byte
    } else {
        RuleKind::Unknown
    }
}

/// Extract the leading operator sigil from the content field, if any.
///
/// Returns the operator and the rest of the field. Numeric kinds accept the
/// full sigil set; string (and unknown) kinds only the comparison four.
fn split_operator<'a>(kind: &RuleKind, content: &'a str) -> (RuleOp, &'a str) {
    let mut chars = content.chars();
    let op = match chars.next() {
        Some('=') => RuleOp::Equals,
        Some('!') => RuleOp::NotEquals,
        Some('>') => RuleOp::GreaterThan,
        Some('<') => RuleOp::LessThan,
        Some('&') if kind.is_numeric() => RuleOp::BitwiseAnd,
        Some('^') if kind.is_numeric() => RuleOp::BitwiseClear,
        Some('x') if kind.is_numeric() => RuleOp::Any,
        Some('~') if kind.is_numeric() => RuleOp::Negated,
        _ => return (RuleOp::Equals, content),
    };
    (op, chars.as_str())
}

/// Parse numeric content in C form: `0x…` hexadecimal, `0…` octal, else
/// decimal. Returns `None` on malformed digits or overflow.
fn parse_number(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if token.len() > 1 && token.starts_with('0') {
        u64::from_str_radix(token, 8).ok()
    } else {
        token.parse().ok()
    }
}
