//! Selector model, parser, and matcher.
//!
//! The grammar is a CSS subset: a selector list is comma-separated
//! alternatives; each alternative is a whitespace-separated descendant chain
//! of compound terms; a compound term concatenates a bare type name, `#id`,
//! and `.class` terms in any combination. The descendant combinator is the
//! only combinator.
//!
//! Matching walks a chain right-to-left against the widget's ancestor line,
//! backtracking over ancestor skips once the rightmost term has anchored on
//! the widget itself.

use tracing::debug;

use crate::css::tokenizer::{tokenize, SpannedToken, Token};
use crate::host::WidgetRef;

/// Errors from selector parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// `.` or `#` not immediately followed by a name.
    #[error("expected a name after {prefix:?} at byte {position}")]
    MissingName { prefix: char, position: usize },
    /// An alternative with no terms at all.
    #[error("empty selector")]
    Empty,
}

/// One simple term inside a compound term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleTerm {
    /// Bare identifier: matches the widget's type name.
    Type(String),
    /// `#id`: matches the widget's identifier.
    Id(String),
    /// `.class`: matches a class the widget currently carries.
    Class(String),
}

/// A concatenation of simple terms matched against a single widget.
///
/// A compound with no `Type` term matches widgets of any type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundTerm {
    pub terms: Vec<SimpleTerm>,
}

impl CompoundTerm {
    /// Whether every simple term matches the widget. Expired handles never
    /// match.
    pub fn matches(&self, widget: &WidgetRef) -> bool {
        if !widget.is_valid() {
            return false;
        }
        self.terms.iter().all(|term| match term {
            SimpleTerm::Type(name) => widget.widget_type() == *name,
            SimpleTerm::Id(id) => widget.id() == *id,
            SimpleTerm::Class(class) => widget.has_class(class),
        })
    }
}

/// One alternative: a descendant chain of compound terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Compound terms in source order (leftmost ancestor first).
    pub chain: Vec<CompoundTerm>,
}

impl Selector {
    /// Match this chain against a widget and its ancestor line.
    ///
    /// The rightmost term must match the widget itself. Each successful term
    /// match advances the cursor to the parent and allows later terms to skip
    /// non-matching ancestors; running past the root fails the chain.
    pub fn matches(&self, widget: &WidgetRef) -> bool {
        let mut cursor = Some(widget.clone());
        let mut allow_skip = false;
        for term in self.chain.iter().rev() {
            loop {
                let Some(current) = cursor.clone() else {
                    return false;
                };
                if !current.is_valid() {
                    return false;
                }
                if term.matches(&current) {
                    cursor = current.parent();
                    allow_skip = true;
                    break;
                }
                if !allow_skip {
                    return false;
                }
                cursor = current.parent();
            }
        }
        true
    }
}

/// A parsed selector list: comma-separated alternatives, matched as OR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub alternatives: Vec<Selector>,
}

impl SelectorList {
    /// Parse a selector list.
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let tokens = tokenize(text);
        let mut alternatives = Vec::new();
        for group in tokens.split(|t| t.token == Token::Comma) {
            alternatives.push(parse_alternative(group)?);
        }
        Ok(SelectorList { alternatives })
    }

    /// Whether any alternative matches the widget.
    pub fn matches(&self, widget: &WidgetRef) -> bool {
        self.alternatives.iter().any(|s| s.matches(widget))
    }
}

/// Parse one alternative's token run into a descendant chain.
///
/// Compound-term boundaries are byte gaps between consecutive tokens (the
/// lexer skipped the whitespace but the spans remember it).
fn parse_alternative(tokens: &[SpannedToken]) -> Result<Selector, SelectorError> {
    let mut chain: Vec<CompoundTerm> = Vec::new();
    let mut current = CompoundTerm::default();
    let mut prev_end: Option<usize> = None;

    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if let Some(end) = prev_end {
            if tok.start > end && !current.terms.is_empty() {
                chain.push(std::mem::take(&mut current));
            }
        }
        match tok.token {
            Token::Ident => {
                current.terms.push(SimpleTerm::Type(tok.text.clone()));
                prev_end = Some(tok.end);
                i += 1;
            }
            Token::Dot | Token::Hash => {
                let prefix = if tok.token == Token::Dot { '.' } else { '#' };
                let name = tokens
                    .get(i + 1)
                    .filter(|n| n.token == Token::Ident && n.start == tok.end)
                    .ok_or(SelectorError::MissingName {
                        prefix,
                        position: tok.start,
                    })?;
                let term = if prefix == '.' {
                    SimpleTerm::Class(name.text.clone())
                } else {
                    SimpleTerm::Id(name.text.clone())
                };
                current.terms.push(term);
                prev_end = Some(name.end);
                i += 2;
            }
            // Commas were split off by the caller.
            Token::Comma => unreachable!("comma inside an alternative"),
        }
    }
    if !current.terms.is_empty() {
        chain.push(current);
    }
    if chain.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Selector { chain })
}

/// Convenience matcher for selector text.
///
/// An unparseable selector is a normal non-match, not an error.
pub fn selector_matches(widget: &WidgetRef, selector: &str) -> bool {
    match SelectorList::parse(selector) {
        Ok(list) => list.matches(widget),
        Err(err) => {
            debug!(selector, error = %err, "unparseable selector never matches");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    // ── Parsing ──────────────────────────────────────────────────────

    #[test]
    fn parse_compound_terms() {
        let list = SelectorList::parse("Button.primary").unwrap();
        assert_eq!(list.alternatives.len(), 1);
        assert_eq!(
            list.alternatives[0].chain,
            vec![CompoundTerm {
                terms: vec![
                    SimpleTerm::Type("Button".into()),
                    SimpleTerm::Class("primary".into()),
                ],
            }]
        );
    }

    #[test]
    fn parse_descendant_chain() {
        let list = SelectorList::parse("#root .item Label").unwrap();
        let chain = &list.alternatives[0].chain;
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].terms, vec![SimpleTerm::Id("root".into())]);
        assert_eq!(chain[1].terms, vec![SimpleTerm::Class("item".into())]);
        assert_eq!(chain[2].terms, vec![SimpleTerm::Type("Label".into())]);
    }

    #[test]
    fn parse_alternatives_split_on_comma() {
        let list = SelectorList::parse("#foo, .bar").unwrap();
        assert_eq!(list.alternatives.len(), 2);
    }

    #[test]
    fn parse_whitespace_splits_compounds() {
        let one = SelectorList::parse(".a.b").unwrap();
        assert_eq!(one.alternatives[0].chain.len(), 1);
        let two = SelectorList::parse(".a .b").unwrap();
        assert_eq!(two.alternatives[0].chain.len(), 2);
    }

    #[test]
    fn parse_dangling_prefix_is_an_error() {
        assert_eq!(
            SelectorList::parse(".").unwrap_err(),
            SelectorError::MissingName {
                prefix: '.',
                position: 0
            }
        );
        assert!(matches!(
            SelectorList::parse("Panel #"),
            Err(SelectorError::MissingName { prefix: '#', .. })
        ));
        // A gap between the prefix and the name is also dangling.
        assert!(matches!(
            SelectorList::parse(". a"),
            Err(SelectorError::MissingName { prefix: '.', .. })
        ));
    }

    #[test]
    fn parse_empty_is_an_error() {
        assert_eq!(SelectorList::parse("").unwrap_err(), SelectorError::Empty);
        assert_eq!(
            SelectorList::parse("a, ").unwrap_err(),
            SelectorError::Empty
        );
    }

    // ── Matching ─────────────────────────────────────────────────────

    /// Build `root(Panel .a) → mid(Panel .mid) → leaf(Label .b)`.
    fn build_tree(host: &MockHost) -> (crate::host::WidgetRef, crate::host::WidgetRef) {
        let root = host.root();
        root.add_class("a");
        let mid = host.create("Panel", &root, "");
        mid.add_class("mid");
        let leaf = host.create("Label", &mid, "leaf");
        leaf.add_class("b");
        (root, leaf)
    }

    #[test]
    fn descendant_match_skips_intermediate_ancestors() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        assert!(selector_matches(&leaf, ".a .b"));
        assert!(!selector_matches(&leaf, ".x .b"));
    }

    #[test]
    fn rightmost_term_must_match_the_widget_itself() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        // `.a` matches an ancestor, not the leaf.
        assert!(!selector_matches(&leaf, ".mid .a"));
    }

    #[test]
    fn alternatives_match_as_or() {
        let host = MockHost::new();
        let root = host.root();
        let foo = host.create("Panel", &root, "foo");
        let bar = host.create("Panel", &root, "");
        bar.add_class("bar");
        let plain = host.create("Panel", &root, "");

        assert!(selector_matches(&foo, "#foo, .bar"));
        assert!(selector_matches(&bar, "#foo, .bar"));
        assert!(!selector_matches(&plain, "#foo, .bar"));
    }

    #[test]
    fn type_and_typeless_compounds() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        assert!(selector_matches(&leaf, "Label"));
        assert!(!selector_matches(&leaf, "Button"));
        // No type term: any widget type qualifies.
        assert!(selector_matches(&leaf, ".b"));
        assert!(selector_matches(&leaf, "#leaf"));
        assert!(selector_matches(&leaf, "Label#leaf.b"));
    }

    #[test]
    fn chain_longer_than_ancestry_fails() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        assert!(!selector_matches(&leaf, ".x .a .mid .b"));
    }

    #[test]
    fn deeply_nested_descendant_still_matches() {
        let host = MockHost::new();
        let root = host.root();
        root.add_class("a");
        let mut parent = root;
        for _ in 0..4 {
            parent = host.create("Panel", &parent, "");
        }
        let leaf = host.create("Label", &parent, "");
        leaf.add_class("b");
        assert!(selector_matches(&leaf, ".a .b"));
    }

    #[test]
    fn expired_widget_never_matches() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        host.invalidate(&leaf);
        assert!(!selector_matches(&leaf, ".b"));
        assert!(!selector_matches(&leaf, ".a .b"));
    }

    #[test]
    fn unparseable_selector_is_a_non_match() {
        let host = MockHost::new();
        let (_, leaf) = build_tree(&host);
        assert!(!selector_matches(&leaf, "."));
        assert!(!selector_matches(&leaf, ""));
    }
}
