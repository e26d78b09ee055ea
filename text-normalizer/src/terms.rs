use crate::kana::{to_hankaku_katakana, to_zenkaku_katakana};

const IDEOGRAPHIC_SPACE: char = '\u{3000}';

fn is_separator(c: char) -> bool {
    c.is_ascii_whitespace() || c == IDEOGRAPHIC_SPACE
}

/// Split a search phrase on runs of ASCII whitespace or U+3000. Empty pieces are dropped.
pub fn split_terms(phrase: &str) -> Vec<&str> {
    phrase.split(is_separator).filter(|t| !t.is_empty()).collect()
}

/// Ordered, de-duplicated spellings of one search term: as typed, full-width katakana,
/// half-width katakana.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVariantSet(Vec<String>);

impl TermVariantSet {
    pub fn as_slice(&self) -> &[String] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, String> { self.0.iter() }
    pub fn contains(&self, v: &str) -> bool { self.0.iter().any(|x| x == v) }
    pub fn into_vec(self) -> Vec<String> { self.0 }
}

impl<'a> IntoIterator for &'a TermVariantSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

pub fn term_variants(term: &str) -> TermVariantSet {
    let mut out: Vec<String> = Vec::with_capacity(3);
    for v in [term.to_string(), to_zenkaku_katakana(term), to_hankaku_katakana(term)] {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    TermVariantSet(out)
}
