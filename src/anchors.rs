//! Anchor extraction: the set of fragment targets a document exposes.
//!
//! Heading ids are made unique with `-1`, `-2`, ... suffixes in document order.
//! The collision policy mirrors the auto-id generator used when rendering,
//! so the ids computed here are the ids readers actually see.

use std::cell::RefCell;
use std::sync::LazyLock;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use regex::Regex;

use crate::document::{Document, Node};
use crate::types::AnchorSet;

/// Highest numeric suffix tried when disambiguating a duplicate heading id.
const MAX_HEADING_SUFFIX: u32 = 99;

/// `<base>-<digit 1-9>` with a non-empty base and no path separator.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static SUFFIXED_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^([^/]+)-[1-9]$").expect("valid regex");
});

/// Walk every node of a document and collect its anchors.
///
/// Raw HTML contributes every non-empty `id` and `name` attribute value.
/// Headings contribute their derived id, or the first free `id-N` for
/// `N` in `1..=99` when the id is taken. A heading for which all suffixes
/// are taken contributes nothing.
pub fn extract(document: &Document) -> AnchorSet {
    let mut anchors = AnchorSet::default();

    for node in &document.nodes {
        match node {
            Node::RawMarkupBlock { bytes } | Node::RawMarkupSpan { bytes } => {
                for value in markup_anchor_values(bytes) {
                    anchors.insert(value);
                }
            },
            Node::Heading { id } if !id.is_empty() => {
                insert_unique_heading_id(&mut anchors, id);
            },
            Node::Heading { .. } | Node::Image { .. } | Node::Link { .. } | Node::Other => {},
        }
    }

    return anchors;
}

/// Insert a heading id, disambiguating duplicates with a numeric suffix.
fn insert_unique_heading_id(anchors: &mut AnchorSet, id: &str) {
    if !anchors.contains(id) {
        anchors.insert(id.to_string());
        return;
    }
    for n in 1..=MAX_HEADING_SUFFIX {
        let candidate = format!("{id}-{n}");
        if !anchors.contains(&candidate) {
            anchors.insert(candidate);
            return;
        }
    }
    return;
}

/// Collects `id`/`name` attribute values from start tags as the tokenizer
/// emits them. Tags are never matched into a tree, so context-sensitive
/// tags such as `<td>` or `<body>` count like any other.
#[derive(Default)]
struct AnchorAttributes {
    /// Values in the order they appear.
    values: RefCell<Vec<String>>,
}

impl TokenSink for AnchorAttributes {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(tag) = token
            && tag.kind == TagKind::StartTag
        {
            let mut values = self.values.borrow_mut();
            for attr in &tag.attrs {
                let name = &*attr.name.local;
                if (name == "id" || name == "name") && !attr.value.is_empty() {
                    values.push(String::from(&*attr.value));
                }
            }
        }
        return TokenSinkResult::Continue;
    }
}

/// Values of `id`/`name` attributes on every start or self-closing tag in
/// an HTML payload. Payloads that are not valid UTF-8 yield nothing.
fn markup_anchor_values(bytes: &[u8]) -> Vec<String> {
    let Ok(markup) = std::str::from_utf8(bytes) else {
        return Vec::new();
    };

    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));
    let tokenizer = Tokenizer::new(AnchorAttributes::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    return tokenizer.sink.values.take();
}

/// Whether a fragment looks like an auto-disambiguated duplicate (`base-N`,
/// single digit) whose `base` is also an anchor. Such references silently
/// repoint when unrelated headings are added, removed or reordered.
pub fn is_unstable(fragment: &str, anchors: &AnchorSet) -> bool {
    let Some(base) = SUFFIXED_ANCHOR.captures(fragment).and_then(|caps| return caps.get(1)) else {
        return false;
    };
    return anchors.contains(base.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(ids: &[&str]) -> Document {
        return Document {
            nodes: ids.iter().map(|id| Node::Heading { id: (*id).to_string() }).collect(),
        };
    }

    #[test]
    fn duplicate_headings_get_numeric_suffixes() {
        let anchors = extract(&headings(&["faq", "faq", "faq"]));
        assert_eq!(anchors, ["faq", "faq-1", "faq-2"].into_iter().collect::<AnchorSet>());
    }

    #[test]
    fn suffix_skips_ids_already_taken() {
        let anchors = extract(&headings(&["intro-1", "intro", "intro"]));
        assert_eq!(anchors, ["intro-1", "intro", "intro-2"].into_iter().collect::<AnchorSet>());
    }

    #[test]
    fn hundred_identical_headings_yield_hundred_anchors() {
        let ids = vec!["same"; 100];
        assert_eq!(extract(&headings(&ids)).len(), 100);

        let ids = vec!["same"; 101];
        assert_eq!(extract(&headings(&ids)).len(), 100);
    }

    #[test]
    fn empty_heading_ids_are_ignored() {
        assert!(extract(&headings(&[""])).is_empty());
    }

    #[test]
    fn html_id_and_name_attributes_become_anchors() {
        let document = Document {
            nodes: vec![
                Node::RawMarkupBlock { bytes: b"<div id=\"top\"><a name=\"here\"></a></div>".to_vec() },
                Node::RawMarkupSpan { bytes: b"<span id=\"\">".to_vec() },
                Node::RawMarkupSpan { bytes: vec![0xff, 0xfe, b'<'] },
            ],
        };
        assert_eq!(extract(&document), ["top", "here"].into_iter().collect::<AnchorSet>());
    }

    #[test]
    fn table_and_document_tags_keep_their_ids() {
        let document = Document {
            nodes: vec![
                Node::RawMarkupSpan { bytes: b"<td id=\"cell\">".to_vec() },
                Node::RawMarkupSpan { bytes: b"<tr id=\"row\">".to_vec() },
                Node::RawMarkupBlock { bytes: b"<body id=\"top\"><th name=\"head\">x</th>".to_vec() },
                Node::RawMarkupSpan { bytes: b"<img id=\"pic\" src=\"a.png\"/>".to_vec() },
                Node::RawMarkupSpan { bytes: b"</td>".to_vec() },
            ],
        };
        assert_eq!(
            extract(&document),
            ["cell", "row", "top", "head", "pic"].into_iter().collect::<AnchorSet>()
        );
    }

    #[test]
    fn html_anchor_forces_heading_suffix() {
        let document = Document {
            nodes: vec![
                Node::RawMarkupBlock { bytes: b"<a id=\"usage\"></a>".to_vec() },
                Node::Heading { id: "usage".to_string() },
            ],
        };
        assert_eq!(extract(&document), ["usage", "usage-1"].into_iter().collect::<AnchorSet>());
    }

    #[test]
    fn detects_unstable_references() {
        let anchors: AnchorSet = ["intro", "intro-1"].into_iter().collect();
        assert!(is_unstable("intro-1", &anchors));
        assert!(!is_unstable("intro", &anchors));
        assert!(!is_unstable("intro-10", &anchors));

        let lone: AnchorSet = ["step-1"].into_iter().collect();
        assert!(!is_unstable("step-1", &lone));
    }
}
