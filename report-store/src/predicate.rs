//! Kana-insensitive keyword predicate.
//!
//! A phrase becomes an AND over its terms; each term is an OR over its spelling
//! variants, and each variant is an OR over the searchable fields:
//!
//! `AND(term) OR(variant) OR(field) field CONTAINS variant`
//!
//! The tree is evaluated in memory via [`SearchPredicate::matches`] or lowered to SQL
//! with bound parameters by [`crate::sql_lowering`].

use std::collections::HashSet;

use report_model::{ReportRecord, SearchField};
use text_normalizer::{split_terms, term_variants, TermVariantSet};

/// One variant tested against every field (`field1 CONTAINS v OR field2 CONTAINS v ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantGroup {
    pub variant: String,
    pub fields: Vec<SearchField>,
}

/// All spellings of one term; matches when any group matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermClause {
    pub term: String,
    pub groups: Vec<VariantGroup>,
}

impl TermClause {
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.variant.as_str())
    }

    fn matches_with<'r, F>(&self, text_of: &F) -> bool
    where
        F: Fn(SearchField) -> &'r str,
    {
        self.groups
            .iter()
            .any(|g| g.fields.iter().any(|f| text_of(*f).contains(g.variant.as_str())))
    }
}

/// AND over term clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPredicate {
    terms: Vec<TermClause>,
}

impl SearchPredicate {
    pub fn terms(&self) -> &[TermClause] { &self.terms }

    /// Variant strings in comparison order (term, variant, field), one per leaf comparison.
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for t in &self.terms {
            for g in &t.groups {
                for _ in &g.fields {
                    out.push(g.variant.as_str());
                }
            }
        }
        out
    }

    pub fn matches(&self, record: &ReportRecord) -> bool {
        self.matches_with(|f| record.field(f))
    }

    /// Evaluate against arbitrary field text.
    pub fn matches_with<'r, F>(&self, text_of: F) -> bool
    where
        F: Fn(SearchField) -> &'r str,
    {
        self.terms.iter().all(|t| t.matches_with(&text_of))
    }
}

/// Upper bound on distinct terms kept from one phrase; later terms are ignored.
/// Keeps the lowered statement well inside SQLite's bound-parameter limit.
pub const MAX_TERMS: usize = 1024;

/// Build the predicate for `phrase` over `fields`. Returns `None` when the phrase has no
/// terms, meaning results must not be constrained.
///
/// Repeated terms collapse into one clause. With an empty `fields` list every term clause
/// is empty and nothing matches.
pub fn build_predicate(phrase: &str, fields: &[SearchField]) -> Option<SearchPredicate> {
    let mut seen = HashSet::new();
    let terms: Vec<TermClause> = split_terms(phrase)
        .into_iter()
        .filter(|t| seen.insert(*t))
        .take(MAX_TERMS)
        .map(|t| term_clause(t, term_variants(t), fields))
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(SearchPredicate { terms })
}

fn term_clause(term: &str, variants: TermVariantSet, fields: &[SearchField]) -> TermClause {
    let groups = variants
        .into_vec()
        .into_iter()
        .map(|variant| VariantGroup { variant, fields: fields.to_vec() })
        .collect();
    TermClause { term: term.to_string(), groups }
}
