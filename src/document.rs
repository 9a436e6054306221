//! Document model: the flat, ordered view of a markdown file that the checker
//! and the reconciler consume.
//!
//! Parsing is delegated to the tree-sitter markdown grammars. The block tree
//! yields headings and HTML blocks; each `inline` block node carries its own
//! inline tree holding links, images and inline HTML.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Node as SyntaxNode, Parser, Range};

use crate::error::Error;
use crate::grammar;

/// Heading id written explicitly as a `{#custom-id}` suffix.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static EXPLICIT_HEADING_ID: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"\s*\{#([^}\s]+)\}\s*$").expect("valid regex");
});

/// How a link or image names its destination in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `[text](dest)`: the destination is written inline in parentheses.
    Inline,
    /// `[text][label]`: the destination comes from a `[label]: dest` definition.
    Reference,
}

/// One node of interest, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A heading with its derived anchor id (possibly empty).
    Heading {
        /// Explicit `{#id}` or the sanitized heading text.
        id: String,
    },
    /// An image reference.
    Image {
        /// Destination text with escapes and angle brackets removed.
        destination: String,
        /// Inline or reference style.
        style: LinkStyle,
    },
    /// A hyperlink.
    Link {
        /// Destination text with escapes and angle brackets removed.
        destination: String,
        /// Inline or reference style.
        style: LinkStyle,
    },
    /// Anything the checker does not look at.
    Other,
    /// An HTML block, verbatim.
    RawMarkupBlock {
        /// Raw block bytes; not guaranteed to be UTF-8.
        bytes: Vec<u8>,
    },
    /// An inline HTML tag, verbatim.
    RawMarkupSpan {
        /// Raw tag bytes; not guaranteed to be UTF-8.
        bytes: Vec<u8>,
    },
}

/// A parsed document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Nodes in the order they appear in the source.
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parse raw markdown bytes into the document model.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if a grammar cannot be loaded or
    /// tree-sitter produces no tree for the blocks or for an inline run.
    pub fn parse(file: &Path, source: &[u8]) -> Result<Self, Error> {
        let mut block_parser = grammar::parser(file, &grammar::block_language())?;
        let tree = block_parser
            .parse(source, None)
            .ok_or_else(|| return parse_failed(file, "tree-sitter returned None"))?;

        let mut walk = NodeWalk {
            definitions: HashMap::new(),
            file,
            inline_parser: grammar::parser(file, &grammar::inline_language())?,
            nodes: Vec::new(),
            source,
        };
        walk.collect_definitions(tree.root_node());
        walk.block(tree.root_node())?;

        return Ok(Self { nodes: walk.nodes });
    }

    /// Read and parse a document from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or `Error::ParseFailed`.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        return Self::parse(path, &bytes);
    }
}

/// Traversal state while flattening the block and inline trees.
struct NodeWalk<'a> {
    /// Normalized reference label -> destination, first definition wins.
    definitions: HashMap<String, String>,
    /// Document path, for error reporting.
    file: &'a Path,
    /// Parser loaded with the inline grammar, reused for every inline run.
    inline_parser: Parser,
    /// Output nodes in document order.
    nodes: Vec<Node>,
    /// The full document bytes; all syntax node ranges index into it.
    source: &'a [u8],
}

impl<'a> NodeWalk<'a> {
    /// Walk the block tree.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseFailed` if an inline run cannot be parsed.
    fn block(&mut self, node: SyntaxNode<'_>) -> Result<(), Error> {
        match node.kind() {
            "atx_heading" => {
                let text = node
                    .child_by_field_name("heading_content")
                    .or_else(|| return first_child_of_kind(node, "inline"))
                    .map(|content| return self.text(content).into_owned())
                    .unwrap_or_default();
                self.nodes.push(Node::Heading {
                    id: heading_id(strip_closing_sequence(&text)),
                });
            },
            "setext_heading" => {
                let text = first_child_of_kind(node, "paragraph")
                    .map(|para| return self.text(para).into_owned())
                    .unwrap_or_default();
                self.nodes.push(Node::Heading { id: heading_id(&text) });
            },
            "html_block" => {
                self.nodes.push(Node::RawMarkupBlock { bytes: self.bytes(node).to_vec() });
                return Ok(());
            },
            "inline" => return self.parse_inline(node),
            "fenced_code_block" | "indented_code_block" | "link_reference_definition" => return Ok(()),
            _ => {},
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.block(child)?;
        }
        return Ok(());
    }

    /// Parse the text of one `inline` block node with the inline grammar and
    /// walk the result. Nested block markers (such as `>` continuations) are
    /// excluded from the parsed ranges.
    fn parse_inline(&mut self, node: SyntaxNode<'_>) -> Result<(), Error> {
        let ranges = inline_ranges(node);
        if ranges.is_empty() {
            return Ok(());
        }
        self.inline_parser
            .set_included_ranges(&ranges)
            .map_err(|e| return parse_failed(self.file, &e.to_string()))?;
        let tree = self
            .inline_parser
            .parse(self.source, None)
            .ok_or_else(|| return parse_failed(self.file, "tree-sitter returned None for inline content"))?;
        self.inline(tree.root_node());
        return Ok(());
    }

    /// Record every `[label]: destination` definition before the main walk,
    /// since a reference may precede its definition.
    fn collect_definitions(&mut self, node: SyntaxNode<'_>) {
        if node.kind() == "link_reference_definition" {
            let label = first_child_of_kind(node, "link_label").map(|l| return self.text(l));
            let destination = first_child_of_kind(node, "link_destination")
                .map(|d| return clean_destination(&self.text(d)))
                .unwrap_or_default();
            if let Some(label) = label {
                self.definitions.entry(normalize_label(&label)).or_insert(destination);
            }
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_definitions(child);
        }
    }

    /// Walk one inline tree.
    fn inline(&mut self, node: SyntaxNode<'_>) {
        match node.kind() {
            "inline_link" => {
                let destination = self.inline_destination(node);
                self.nodes.push(Node::Link { destination, style: LinkStyle::Inline });
            },
            "image" => {
                let pushed = if has_child_of_kind(node, "(") {
                    Node::Image {
                        destination: self.inline_destination(node),
                        style: LinkStyle::Inline,
                    }
                } else {
                    let label = first_child_of_kind(node, "link_label")
                        .or_else(|| return first_child_of_kind(node, "image_description"));
                    match label.and_then(|l| return self.lookup_definition(l)) {
                        Some(destination) => Node::Image { destination, style: LinkStyle::Reference },
                        None => Node::Other,
                    }
                };
                self.nodes.push(pushed);
            },
            "full_reference_link" | "collapsed_reference_link" | "shortcut_link" => {
                let label = first_child_of_kind(node, "link_label")
                    .or_else(|| return first_child_of_kind(node, "link_text"));
                let pushed = match label.and_then(|l| return self.lookup_definition(l)) {
                    Some(destination) => Node::Link { destination, style: LinkStyle::Reference },
                    None => Node::Other,
                };
                self.nodes.push(pushed);
            },
            "uri_autolink" => {
                let destination = clean_destination(&self.text(node));
                self.nodes.push(Node::Link { destination, style: LinkStyle::Inline });
                return;
            },
            "email_autolink" => {
                self.nodes.push(Node::Other);
                return;
            },
            "html_tag" => {
                self.nodes.push(Node::RawMarkupSpan { bytes: self.bytes(node).to_vec() });
                return;
            },
            "code_span" => return,
            _ => {},
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.inline(child);
        }
    }

    /// Destination of an inline link or image; empty for `[text]()`.
    fn inline_destination(&self, node: SyntaxNode<'_>) -> String {
        return first_child_of_kind(node, "link_destination")
            .map(|d| return clean_destination(&self.text(d)))
            .unwrap_or_default();
    }

    /// Look up a reference label's definition.
    fn lookup_definition(&self, label: SyntaxNode<'_>) -> Option<String> {
        let key = normalize_label(&self.text(label));
        return self.definitions.get(&key).cloned();
    }

    /// Raw bytes covered by a node.
    fn bytes(&self, node: SyntaxNode<'_>) -> &'a [u8] {
        return self.source.get(node.byte_range()).unwrap_or_default();
    }

    /// Text covered by a node, lossily decoded.
    fn text(&self, node: SyntaxNode<'_>) -> Cow<'a, str> {
        return String::from_utf8_lossy(self.bytes(node));
    }
}

/// Build the parse-failure error for a document.
fn parse_failed(file: &Path, reason: &str) -> Error {
    return Error::ParseFailed {
        file: file.to_path_buf(),
        reason: reason.to_string(),
    };
}

/// Byte ranges of an `inline` node minus its named children, which are
/// block-level markers interleaved with the text. Empty ranges are dropped.
fn inline_ranges(node: SyntaxNode<'_>) -> Vec<Range> {
    let mut ranges = Vec::new();
    let mut start_byte = node.start_byte();
    let mut start_point = node.start_position();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        ranges.push(Range {
            start_byte,
            end_byte: child.start_byte(),
            start_point,
            end_point: child.start_position(),
        });
        start_byte = child.end_byte();
        start_point = child.end_position();
    }
    ranges.push(Range {
        start_byte,
        end_byte: node.end_byte(),
        start_point,
        end_point: node.end_position(),
    });

    ranges.retain(|r| return r.start_byte < r.end_byte);
    return ranges;
}

/// First direct child with the given kind.
fn first_child_of_kind<'t>(node: SyntaxNode<'t>, kind: &str) -> Option<SyntaxNode<'t>> {
    let mut cursor = node.walk();
    return node.children(&mut cursor).find(|c| return c.kind() == kind);
}

/// Whether any direct child has the given kind.
fn has_child_of_kind(node: SyntaxNode<'_>, kind: &str) -> bool {
    return first_child_of_kind(node, kind).is_some();
}

/// Strip angle brackets and backslash escapes from a raw destination.
fn clean_destination(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|rest| return rest.strip_suffix('>'))
        .unwrap_or(trimmed);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    return out;
}

/// Reference labels match case-insensitively with collapsed whitespace.
fn normalize_label(raw: &str) -> String {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    return inner
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
}

/// Remove an ATX closing sequence (`## Title ##`). A `#` glued to the last
/// word (`C#`) is content, not a closing sequence.
fn strip_closing_sequence(text: &str) -> &str {
    let trimmed = text.trim_end();
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return trimmed;
    }
    if without_hashes.is_empty() || without_hashes.ends_with(char::is_whitespace) {
        return without_hashes.trim_end();
    }
    return trimmed;
}

/// Derive a heading's anchor id: an explicit `{#id}` suffix wins, otherwise
/// the text is sanitized.
pub fn heading_id(text: &str) -> String {
    if let Some(caps) = EXPLICIT_HEADING_ID.captures(text)
        && let Some(id) = caps.get(1)
    {
        return id.as_str().to_string();
    }
    return sanitize_heading_id(text);
}

/// Convert heading text to an anchor id.
/// Letters and digits are lowercased and kept; any run of other characters
/// between two kept characters becomes a single `-`. Text with nothing to
/// keep becomes `empty`.
pub fn sanitize_heading_id(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if !c.is_alphanumeric() {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen && !result.is_empty() {
            result.push('-');
        }
        pending_hyphen = false;
        result.extend(c.to_lowercase());
    }

    if result.is_empty() {
        return "empty".to_string();
    }
    return result;
}
