//! Literal text patching for inline link destinations.

/// One literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Text to search for.
    pub from: String,
    /// Text written in its place.
    pub to: String,
}

impl Replacement {
    /// Substitution of an inline destination, parentheses included.
    pub fn inline_destination(old: &str, new: &str) -> Self {
        return Self {
            from: format!("({})", escape(old)),
            to: format!("({})", escape(new)),
        };
    }
}

/// Escape literal parentheses so a destination cannot close the
/// surrounding `(...)` early.
pub fn escape(destination: &str) -> String {
    return destination.replace('(', "\\(").replace(')', "\\)");
}

/// Whether `replacement`'s search text occurs anywhere in `content`.
pub fn occurs(content: &[u8], replacement: &Replacement) -> bool {
    let needle = replacement.from.as_bytes();
    if needle.is_empty() {
        return false;
    }
    return content.windows(needle.len()).any(|window| return window == needle);
}

/// Apply replacements in one left-to-right pass over raw bytes. At each
/// position the first replacement (in list order) whose search text matches
/// wins; replaced text is never searched again. Empty search texts are
/// ignored. Bytes outside the matches are copied unchanged, whether or not
/// they are valid UTF-8.
pub fn apply(content: &[u8], replacements: &[Replacement]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut rest = content;

    while let Some((&byte, tail)) = rest.split_first() {
        let hit = replacements
            .iter()
            .find(|r| return !r.from.is_empty() && rest.starts_with(r.from.as_bytes()));
        match hit {
            Some(r) => {
                out.extend_from_slice(r.to.as_bytes());
                rest = rest.get(r.from.len()..).unwrap_or_default();
            },
            None => {
                out.push(byte);
                rest = tail;
            },
        }
    }

    return out;
}
