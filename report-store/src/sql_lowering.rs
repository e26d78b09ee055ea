use report_model::SearchField;

use crate::predicate::SearchPredicate;

/// Escape character declared in every generated `LIKE ... ESCAPE` clause.
pub const LIKE_ESCAPE: char = '\\';

/// Parameterised SQL `WHERE` fragment. `sql` contains only `?` placeholders; user text
/// is carried in `params` in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<String>,
}

/// Escape `LIKE` metacharacters so `%`, `_` and the escape char itself match literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Substring pattern for `LIKE`.
pub fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like(s))
}

/// Lower a predicate into `((... OR ...) AND (...))` with one `col LIKE ? ESCAPE '\'` per leaf.
/// `column_of` maps a field to a trusted column expression.
///
/// Term clauses are joined as a balanced tree so the expression depth grows with the log of
/// the term count and long phrases stay under SQLite's expression depth limit.
pub fn lower_predicate<F>(pred: &SearchPredicate, column_of: F) -> SqlFragment
where
    F: Fn(SearchField) -> &'static str,
{
    let mut params = Vec::new();
    let mut term_sql = Vec::with_capacity(pred.terms().len());
    for term in pred.terms() {
        let mut group_sql = Vec::with_capacity(term.groups.len());
        for g in &term.groups {
            let pattern = contains_pattern(&g.variant);
            let leaves: Vec<String> = g
                .fields
                .iter()
                .map(|f| {
                    params.push(pattern.clone());
                    format!("{} LIKE ? ESCAPE '{}'", column_of(*f), LIKE_ESCAPE)
                })
                .collect();
            if leaves.is_empty() {
                group_sql.push("0".to_string());
            } else {
                group_sql.push(format!("({})", leaves.join(" OR ")));
            }
        }
        term_sql.push(format!("({})", group_sql.join(" OR ")));
    }
    SqlFragment { sql: and_tree(&term_sql), params }
}

/// `a`, `(a AND b)`, `((a AND b) AND (c AND d))`, ... keeping operand order.
fn and_tree(parts: &[String]) -> String {
    match parts {
        [] => "1".to_string(),
        [one] => one.clone(),
        _ => {
            let (left, right) = parts.split_at(parts.len() / 2);
            format!("({} AND {})", and_tree(left), and_tree(right))
        }
    }
}

/// Default column names of the `reports` table.
pub fn report_column(field: SearchField) -> &'static str {
    match field {
        SearchField::Title => "r.title",
        SearchField::Content => "r.content",
        SearchField::Excerpt => "r.excerpt",
    }
}
