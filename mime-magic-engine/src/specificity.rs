//! Specificity scoring for competing matches.
//!
//! `specificity = (depth + 1) / (weighted_descendant_count + 1)`: the
//! deeper a matched rule sits, the more conditions held on the way to it;
//! the more (and deeper) descendants it has, the more refinements it failed
//! to reach. Ties are broken by source order, which keeps selection
//! deterministic.

use mime_magic_core::{RuleForest, RuleId};

/// Descendants of `id` weighted by their depth below it.
pub(crate) fn weighted_descendant_count(forest: &RuleForest, id: RuleId) -> u64 {
    let base = forest.rule(id).depth();
    let mut total = 0u64;
    let mut stack: Vec<RuleId> = forest.rule(id).children().to_vec();
    while let Some(cur) = stack.pop() {
        let rule = forest.rule(cur);
        total += u64::from(rule.depth() - base);
        stack.extend_from_slice(rule.children());
    }
    total
}

/// Specificity of a matched rule within its forest.
pub fn specificity(forest: &RuleForest, id: RuleId) -> f64 {
    let depth = forest.rule(id).depth();
    f64::from(depth + 1) / (weighted_descendant_count(forest, id) + 1) as f64
}
