//! Rule-set parsing and style application.
//!
//! A [`Stylesheet`] maps selector text to a property map. Parsing is
//! deliberately a delimiter scan, not a tokenizer: the next `{` ends the
//! selector, the next `}` ends the block. Braces nested inside property
//! values are outside the supported grammar.
//!
//! Selectors are compiled once at insertion; application walks a widget
//! subtree and writes every property of every matching rule onto the live
//! style, in rule order, so a later rule wins per property.

use indexmap::IndexMap;
use tracing::debug;

use crate::css::selector::SelectorList;
use crate::host::WidgetRef;
use crate::merge::merge;
use crate::value::Value;

/// Property map of one rule block: property name → value text.
pub type PropertyMap = IndexMap<String, String>;

/// One compiled rule: the selector (if it compiled) and its properties.
#[derive(Debug, Clone)]
struct StyleRule {
    /// `None` when the selector text failed to compile; the rule is kept
    /// but never matches.
    selector: Option<SelectorList>,
    properties: PropertyMap,
}

/// An insertion-ordered set of style rules keyed by selector text.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: IndexMap<String, StyleRule>,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSS text into a stylesheet.
    ///
    /// `//` line comments are stripped first. Each `selector { ... }` block
    /// is extracted by delimiter scanning; a trailing block with no closing
    /// brace is discarded. Within one block the last declaration for a
    /// duplicate property wins.
    pub fn parse(css: &str) -> Self {
        let source = strip_line_comments(css);
        let mut sheet = Stylesheet::new();
        let mut rest = source.as_str();
        loop {
            let Some(open) = rest.find('{') else { break };
            let selector = rest[..open].trim();
            let Some(close) = rest[open + 1..].find('}') else {
                break;
            };
            let body = &rest[open + 1..open + 1 + close];
            if !selector.is_empty() {
                sheet.insert(selector, parse_declarations(body));
            }
            rest = &rest[open + 1 + close + 1..];
        }
        sheet
    }

    /// Insert (or replace) the rule for a selector.
    ///
    /// The selector is compiled here; one that fails to compile produces a
    /// rule that never matches, which is an ordinary lookup miss.
    pub fn insert(&mut self, selector: &str, properties: PropertyMap) {
        let compiled = match SelectorList::parse(selector) {
            Ok(list) => Some(list),
            Err(err) => {
                debug!(selector, error = %err, "selector failed to compile; rule will never match");
                None
            }
        };
        self.rules.insert(
            selector.to_owned(),
            StyleRule {
                selector: compiled,
                properties,
            },
        );
    }

    /// The property map stored for a selector, if present.
    pub fn get(&self, selector: &str) -> Option<&PropertyMap> {
        self.rules.get(selector).map(|rule| &rule.properties)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the stylesheet has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold another stylesheet's rules onto this one.
    ///
    /// Property maps of rules present in both sheets are combined through
    /// the structural merge, so the overlay wins per property and untouched
    /// properties survive. Rules only in `other` are appended.
    pub fn overlay(&mut self, other: &Stylesheet) {
        for (selector, rule) in &other.rules {
            match self.rules.get_mut(selector) {
                Some(existing) => {
                    let merged = merge(
                        props_to_value(&existing.properties),
                        props_to_value(&rule.properties),
                    );
                    existing.properties = value_to_props(&merged);
                }
                None => {
                    self.rules.insert(selector.clone(), rule.clone());
                }
            }
        }
    }

    /// Apply this stylesheet to a widget and its whole subtree.
    pub fn apply(&self, widget: &WidgetRef) {
        self.apply_to(widget, true);
    }

    /// Apply this stylesheet to a widget, optionally recursing into its
    /// children (depth-first, pre-order).
    ///
    /// Invalid widgets are silently skipped so a subtree mid-teardown can
    /// still be passed in. Re-application is idempotent: style writes
    /// overwrite, they never accumulate.
    pub fn apply_to(&self, widget: &WidgetRef, recursive: bool) {
        if !widget.is_valid() {
            return;
        }
        for rule in self.rules.values() {
            let Some(selector) = &rule.selector else {
                continue;
            };
            if selector.matches(widget) {
                for (property, value) in &rule.properties {
                    widget.set_style(property, value);
                }
            }
        }
        if recursive {
            for child in widget.children() {
                self.apply_to(&child, true);
            }
        }
    }
}

fn parse_declarations(body: &str) -> PropertyMap {
    let mut properties = PropertyMap::new();
    for declaration in body.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        properties.insert(name.to_owned(), value.to_owned());
    }
    properties
}

fn strip_line_comments(css: &str) -> String {
    css.lines()
        .map(|line| match line.find("//") {
            Some(i) => &line[..i],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn props_to_value(properties: &PropertyMap) -> Value {
    Value::table_of(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone()))),
    )
}

fn value_to_props(value: &Value) -> PropertyMap {
    let mut properties = PropertyMap::new();
    if let Some(table) = value.as_table() {
        for (key, entry) in table.borrow().iter() {
            match entry {
                Value::String(s) => {
                    properties.insert(key.clone(), s.clone());
                }
                other => debug!(property = key.as_str(), ?other, "non-string style value dropped"),
            }
        }
    }
    properties
}
