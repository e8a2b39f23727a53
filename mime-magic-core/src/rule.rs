//! Rule model: kinds, operators, and the arena-backed rule forest.
//!
//! A compiled magic(5) document is a *forest*: an ordered list of root rules,
//! each the head of a tree of continuation rules. Rules live in a single
//! arena `Vec` and refer to each other by [`RuleId`] index, so parent
//! back-references never form ownership cycles. Depth is computed once at
//! attach time and cached on the rule.
//!
//! The forest is append-only while the compiler builds it and is treated as
//! immutable afterwards; matching never mutates it, so one forest can be
//! shared across concurrent match calls without locking.

/// Arena index of a rule within a [`RuleForest`].
///
/// Ids are assigned in source order across all compiled documents, which is
/// what makes them usable as the tie-break key for equally specific matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    /// Position of the rule in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The test kind of a rule: what is read at the offset and how it is
/// interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Byte-sequence test. `contains` is the bounded length of the
    /// `string>N` form: read up to `N` bytes and test for a contiguous
    /// sub-sequence instead of an anchored compare.
    Str {
        /// Bounded-contains window length, when the `string>N` form is used.
        contains: Option<u32>,
    },
    /// Single byte, zero-extended.
    Byte,
    /// Two bytes, big-endian. (`short` in rule files compares big-endian;
    /// see DESIGN.md for the endianness decision.)
    Short,
    /// Two bytes, big-endian.
    BeShort,
    /// Two bytes, little-endian.
    LeShort,
    /// Four bytes, big-endian.
    BeLong,
    /// Four bytes, little-endian.
    LeLong,
    /// Unrecognized type token. The rule is kept for tree structure but
    /// never matches.
    Unknown,
}

impl RuleKind {
    /// A plain (non-contains) string test.
    pub fn string() -> Self {
        RuleKind::Str { contains: None }
    }

    /// Whether this kind reads a fixed-width integer.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, RuleKind::Str { .. } | RuleKind::Unknown)
    }

    /// Integer width in bytes for numeric kinds.
    pub fn numeric_width(&self) -> Option<u32> {
        match self {
            RuleKind::Byte => Some(1),
            RuleKind::Short | RuleKind::BeShort | RuleKind::LeShort => Some(2),
            RuleKind::BeLong | RuleKind::LeLong => Some(4),
            RuleKind::Str { .. } | RuleKind::Unknown => None,
        }
    }

    /// Mask selecting the low `width` bytes of a 64-bit value.
    ///
    /// Rule values are held as `u64` and truncated to the kind's width at
    /// match time, so an out-of-range literal like `byte 0x1FF` compares as
    /// `0xFF` rather than never matching.
    pub fn width_mask(&self) -> u64 {
        match self.numeric_width() {
            Some(w) => (1u64 << (w * 8)) - 1,
            None => u64::MAX,
        }
    }
}

/// Comparison operator applied between the bytes read and the rule content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    /// `=` (default): read value equals the rule value.
    Equals,
    /// `!`: read value differs from the rule value.
    NotEquals,
    /// `>`: read value is greater (unsigned / lexicographic).
    GreaterThan,
    /// `<`: read value is less.
    LessThan,
    /// `&` (numeric only): every bit set in the rule value is set in the
    /// read value.
    BitwiseAnd,
    /// `^` (numeric only): `((v & c) ^ c) == 0`. Equivalent to
    /// [`RuleOp::BitwiseAnd`]; both are kept because rule files use both
    /// sigils.
    BitwiseClear,
    /// `x` (numeric only): always matches.
    Any,
    /// `~` (numeric only): the width-masked complement of the read value
    /// equals the rule value.
    Negated,
}

impl RuleOp {
    /// Whether the operator is meaningful for string kinds.
    pub fn applies_to_strings(self) -> bool {
        matches!(
            self,
            RuleOp::Equals | RuleOp::NotEquals | RuleOp::GreaterThan | RuleOp::LessThan
        )
    }
}

/// A single compiled rule: one test plus an optional MIME assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Byte position in the subject where the test begins.
    pub offset: u64,
    /// What is read and how it is interpreted.
    pub kind: RuleKind,
    /// Comparison operator.
    pub op: RuleOp,
    /// The literal to compare against. For string rules this is the
    /// escape-decoded byte sequence; for numeric rules it is the textual
    /// number token (kept for diagnostics and round-trip checks). Empty when
    /// the rule carries no content.
    pub content: Vec<u8>,
    /// Numeric content parsed once at compile time; 0 for string rules.
    /// Width truncation happens at match time.
    pub value: u64,
    /// MIME type assigned when this rule is the selected match.
    pub mime_type: Option<String>,
    /// Encoding annotation; parsed but not used in selection.
    pub mime_encoding: Option<String>,

    // Tree structure, managed by RuleForest::attach.
    depth: u32,
    parent: Option<RuleId>,
    children: Vec<RuleId>,
}

impl Rule {
    /// Create a detached rule with no content, value, or MIME assignment.
    pub fn new(offset: u64, kind: RuleKind, op: RuleOp) -> Self {
        Rule {
            offset,
            kind,
            op,
            content: Vec::new(),
            value: 0,
            mime_type: None,
            mime_encoding: None,
            depth: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Distance from the root of this rule's tree (roots are depth 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent rule, if this is a continuation.
    pub fn parent(&self) -> Option<RuleId> {
        self.parent
    }

    /// Continuation rules in source order.
    pub fn children(&self) -> &[RuleId] {
        &self.children
    }

    /// Width in bytes of this rule's test window.
    ///
    /// String windows carry one byte of zero slack past the compared
    /// content: the legacy buffer layout that the `>`/`<` lexicographic
    /// compares and the bounded-contains search observe. Unknown kinds read
    /// nothing.
    pub fn test_width(&self) -> u64 {
        match &self.kind {
            RuleKind::Str { contains: Some(n) } => u64::from(*n) + 1,
            RuleKind::Str { contains: None } => self.content.len() as u64 + 1,
            RuleKind::Unknown => 0,
            numeric => u64::from(numeric.numeric_width().unwrap_or(0)),
        }
    }

    /// End of the test window: `offset + test_width`.
    pub fn window_end(&self) -> u64 {
        self.offset + self.test_width()
    }
}

/// The compiled rule set: an ordered sequence of root rule trees backed by
/// a single arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleForest {
    rules: Vec<Rule>,
    roots: Vec<RuleId>,
}

impl RuleForest {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule, wiring it under `parent` (or as a new root).
    ///
    /// Depth is derived from the parent chain and cached on the rule. Panics
    /// if `parent` is not an id previously returned by this forest — that is
    /// a compiler bug, not an input error.
    pub fn attach(&mut self, mut rule: Rule, parent: Option<RuleId>) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        match parent {
            Some(pid) => {
                rule.depth = self.rules[pid.index()].depth + 1;
                rule.parent = Some(pid);
                self.rules[pid.index()].children.push(id);
            }
            None => {
                rule.depth = 0;
                rule.parent = None;
                self.roots.push(id);
            }
        }
        self.rules.push(rule);
        id
    }

    /// Root rules in source order.
    pub fn roots(&self) -> &[RuleId] {
        &self.roots
    }

    /// Look up a rule by id.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    /// Total number of rules (roots and continuations).
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the forest contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over every rule in arena (source) order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i as u32), r))
    }

    /// Maximum bytes any rule in the forest can ask a source for:
    /// `max(offset + test_width)` over all rules transitively.
    ///
    /// Stream matching marks the source with this limit once per call.
    pub fn max_read_length(&self) -> u64 {
        self.rules.iter().map(Rule::window_end).max().unwrap_or(0)
    }

    /// Whether any rule in the forest can produce the given MIME type.
    pub fn contains_mime_type(&self, mime: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.mime_type.as_deref() == Some(mime))
    }
}
