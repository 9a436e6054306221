/// Document detection and tree-sitter grammar setup.
use std::path::Path;

use tree_sitter::{Language, Parser};

use crate::error::Error;

/// Extension (without the dot) of files treated as documents.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Whether a path names a document by its extension.
pub fn is_document_path(path: &Path) -> bool {
    return path
        .extension()
        .is_some_and(|ext| return ext == DOCUMENT_EXTENSION);
}

/// Whether a resolved link target string ends in `.md`.
pub fn has_document_suffix(name: &str) -> bool {
    return name
        .strip_suffix(DOCUMENT_EXTENSION)
        .is_some_and(|rest| return rest.ends_with('.'));
}

/// The markdown block grammar: headings, paragraphs, HTML blocks, code.
pub fn block_language() -> Language {
    return tree_sitter_md::LANGUAGE.into();
}

/// The markdown inline grammar: links, images, code spans, inline HTML.
pub fn inline_language() -> Language {
    return tree_sitter_md::INLINE_LANGUAGE.into();
}

/// Create a parser for one grammar.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the grammar is incompatible with the
/// linked tree-sitter runtime.
pub fn parser(file: &Path, language: &Language) -> Result<Parser, Error> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| {
        return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: e.to_string(),
        };
    })?;
    return Ok(parser);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_document_paths() {
        assert!(is_document_path(Path::new("docs/guide.md")));
        assert!(!is_document_path(Path::new("docs/guide.markdown")));
        assert!(!is_document_path(Path::new("docs/md")));
    }

    #[test]
    fn both_grammars_load() {
        let file = Path::new("a.md");
        assert!(parser(file, &block_language()).is_ok());
        assert!(parser(file, &inline_language()).is_ok());
    }

    #[test]
    fn suffix_match_requires_dot() {
        assert!(has_document_suffix("docs/a.md"));
        assert!(!has_document_suffix("docs/readmd"));
    }
}
