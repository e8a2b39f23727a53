//! Per-rule evaluation: window reads, kind dispatch, and candidate
//! collection over one root tree.
//!
//! Everything here works against [`RandomAccess`]; the stream entry point
//! buffers its marked prefix and rejoins this path as an in-memory slice.

use tracing::trace;

use mime_magic_core::{RandomAccess, Result, Rule, RuleForest, RuleId, RuleKind, RuleOp};

/// Read a rule's test window from the source.
///
/// The returned buffer has the rule's full test width, zero-padded past the
/// bytes actually available. Returns `None` when the source cannot supply
/// the bytes the test needs: the full integer for numeric kinds, the
/// compared content length for string kinds. Unknown kinds read nothing and
/// never match.
fn read_window<S: RandomAccess + ?Sized>(src: &S, rule: &Rule) -> Result<Option<Vec<u8>>> {
    let width = rule.test_width() as usize;
    if width == 0 {
        return Ok(None);
    }
    let mut buf = vec![0u8; width];
    let got = src.read_at(rule.offset, &mut buf)?;

    let needed = match &rule.kind {
        RuleKind::Str { .. } => rule.content.len(),
        _ => width,
    };
    if got < needed {
        return Ok(None);
    }
    Ok(Some(buf))
}

/// Apply a single rule's test to its (zero-padded) window.
pub(crate) fn match_one(rule: &Rule, window: &[u8]) -> bool {
    match &rule.kind {
        RuleKind::Unknown => false,
        RuleKind::Str { contains: Some(_) } => contains_needle(window, &rule.content),
        RuleKind::Str { contains: None } => match_string(rule, window),
        numeric => match_numeric(rule, numeric, window),
    }
}

fn match_string(rule: &Rule, window: &[u8]) -> bool {
    let len = rule.content.len();
    match rule.op {
        RuleOp::Equals => window[..len] == rule.content[..],
        RuleOp::NotEquals => window[..len] != rule.content[..],
        // Lexicographic compare of the whole window, trailing slack byte
        // included — the window is one byte wider than the content, so an
        // exact prefix match ranks the window above the content.
        RuleOp::GreaterThan => *window > rule.content[..],
        RuleOp::LessThan => *window < rule.content[..],
        // The remaining operators are numeric-only; a hand-built rule that
        // pairs them with a string kind matches nothing.
        _ => false,
    }
}

fn match_numeric(rule: &Rule, kind: &RuleKind, window: &[u8]) -> bool {
    let Some(v) = decode_value(kind, window) else {
        return false;
    };
    // The rule value is held as u64; both sides compare at the kind's width.
    let mask = kind.width_mask();
    let c = rule.value & mask;

    match rule.op {
        RuleOp::Equals => v == c,
        RuleOp::NotEquals => v != c,
        RuleOp::GreaterThan => v > c,
        RuleOp::LessThan => v < c,
        RuleOp::BitwiseAnd => (v & c) == c,
        RuleOp::BitwiseClear => ((v & c) ^ c) == 0,
        RuleOp::Any => true,
        RuleOp::Negated => (!v & mask) == c,
    }
}

/// Decode the window as a zero-extended integer per the kind's width and
/// byte order.
fn decode_value(kind: &RuleKind, window: &[u8]) -> Option<u64> {
    match kind {
        RuleKind::Byte => window.first().map(|&b| u64::from(b)),
        RuleKind::Short | RuleKind::BeShort => window
            .get(..2)
            .map(|w| u64::from(u16::from_be_bytes([w[0], w[1]]))),
        RuleKind::LeShort => window
            .get(..2)
            .map(|w| u64::from(u16::from_le_bytes([w[0], w[1]]))),
        RuleKind::BeLong => window
            .get(..4)
            .map(|w| u64::from(u32::from_be_bytes([w[0], w[1], w[2], w[3]]))),
        RuleKind::LeLong => window
            .get(..4)
            .map(|w| u64::from(u32::from_le_bytes([w[0], w[1], w[2], w[3]]))),
        RuleKind::Str { .. } | RuleKind::Unknown => None,
    }
}

fn contains_needle(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Evaluate the tree rooted at `id`, appending contributing rules to `out`.
///
/// A rule contributes when it matches, carries a MIME type, and none of its
/// matching descendants contributed first; a matching rule without a MIME
/// anywhere below it is only a conditional scope. Returns whether the rule
/// itself matched. Short reads fail only this rule; source errors abort the
/// whole call.
pub(crate) fn collect_matches<S: RandomAccess + ?Sized>(
    forest: &RuleForest,
    id: RuleId,
    src: &S,
    out: &mut Vec<RuleId>,
) -> Result<bool> {
    let rule = forest.rule(id);
    let Some(window) = read_window(src, rule)? else {
        return Ok(false);
    };
    if !match_one(rule, &window) {
        return Ok(false);
    }
    trace!(
        "rule {} matched at offset {} (depth {})",
        id.index(),
        rule.offset,
        rule.depth()
    );

    let before = out.len();
    for &child in rule.children() {
        collect_matches(forest, child, src, out)?;
    }
    if out.len() == before && rule.mime_type.as_deref().is_some_and(|m| !m.is_empty()) {
        out.push(id);
    }
    Ok(true)
}
