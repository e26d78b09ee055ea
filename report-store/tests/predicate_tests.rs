use report_model::{ReportRecord, SearchField};
use report_store::predicate::{build_predicate, MAX_TERMS};
use report_store::sql_lowering::{escape_like, lower_predicate, report_column};

fn record(title: &str, content: &str, excerpt: &str) -> ReportRecord {
    let mut r = ReportRecord::new("r", title, 0);
    r.content = content.to_string();
    r.excerpt = excerpt.to_string();
    r
}

#[test]
fn empty_phrases_build_nothing() {
    assert!(build_predicate("", &SearchField::ALL).is_none());
    assert!(build_predicate("   ", &SearchField::ALL).is_none());
    assert!(build_predicate("\u{3000} \t", &SearchField::ALL).is_none());
}

#[test]
fn katakana_term_matches_halfwidth_title() {
    let pred = build_predicate("ソニー", &SearchField::ALL).expect("one term");
    let variants: Vec<&str> = pred.terms()[0].variants().collect();
    assert!(variants.contains(&"ソニー"));
    assert!(variants.contains(&"ｿﾆｰ"));

    assert!(pred.matches(&record("ｿﾆｰ製テレビの不具合", "", "")));
    assert!(pred.matches(&record("", "ソニーのテレビ", "")));
    assert!(!pred.matches(&record("パナソニック", "", "")));
}

#[test]
fn hiragana_term_reaches_both_katakana_widths() {
    let pred = build_predicate("そにー", &SearchField::ALL).expect("one term");
    assert!(pred.matches(&record("ｿﾆｰ", "", "")));
    assert!(pred.matches(&record("", "", "ソニー")));
}

#[test]
fn every_term_must_match_somewhere() {
    let pred = build_predicate("foo bar", &SearchField::ALL).expect("two terms");
    assert_eq!(pred.terms().len(), 2);
    assert!(pred.matches(&record("foo", "bar", "")));
    assert!(pred.matches(&record("", "", "bar foo")));
    assert!(!pred.matches(&record("foo fighters", "", "")));
}

#[test]
fn only_listed_fields_are_searched() {
    let pred = build_predicate("foo", &[SearchField::Title]).expect("one term");
    assert!(pred.matches(&record("foo", "", "")));
    assert!(!pred.matches(&record("", "foo", "foo")));

    let nothing = build_predicate("foo", &[]).expect("term without fields");
    assert!(!nothing.matches(&record("foo", "foo", "foo")));
}

#[test]
fn escape_like_marks_metacharacters() {
    assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    assert_eq!(escape_like("a\\b"), "a\\\\b");
    assert_eq!(escape_like("ソニー"), "ソニー");
}

#[test]
fn lowering_binds_every_variant_per_field() {
    let pred = build_predicate("ソニー 100%", &SearchField::ALL).expect("two terms");
    let frag = lower_predicate(&pred, report_column);

    let leaf = |c: &str| format!("{c} LIKE ? ESCAPE '\\'");
    let group = format!("({} OR {} OR {})", leaf("r.title"), leaf("r.content"), leaf("r.excerpt"));
    let expected = format!("(({group} OR {group}) AND ({group}))");
    assert_eq!(frag.sql, expected);

    assert_eq!(
        frag.params,
        vec!["%ソニー%", "%ソニー%", "%ソニー%", "%ｿﾆｰ%", "%ｿﾆｰ%", "%ｿﾆｰ%", "%100\\%%", "%100\\%%", "%100\\%%"]
    );
    assert_eq!(pred.params().len(), frag.params.len());
    assert!(!frag.sql.contains("ソニー"));
    assert!(!frag.sql.contains("100"));
}

#[test]
fn repeated_terms_collapse() {
    let pred = build_predicate("foo bar foo\u{3000}foo", &SearchField::ALL).expect("terms");
    let terms: Vec<&str> = pred.terms().iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms, vec!["foo", "bar"]);

    let single = build_predicate(&vec!["a"; 1200].join(" "), &SearchField::ALL).expect("one term");
    assert_eq!(single.terms().len(), 1);
    assert_eq!(lower_predicate(&single, report_column).params.len(), 3);
}

#[test]
fn distinct_terms_are_capped() {
    let phrase: Vec<String> = (0..MAX_TERMS + 50).map(|i| format!("k{i}")).collect();
    let pred = build_predicate(&phrase.join(" "), &[SearchField::Title]).expect("terms");
    assert_eq!(pred.terms().len(), MAX_TERMS);
    assert_eq!(pred.terms()[MAX_TERMS - 1].term, format!("k{}", MAX_TERMS - 1));
}

#[test]
fn lowering_nests_terms_as_balanced_tree() {
    let pred = build_predicate("a b c d", &[SearchField::Title]).expect("four terms");
    let frag = lower_predicate(&pred, report_column);
    let leaf = "((r.title LIKE ? ESCAPE '\\'))";
    assert_eq!(frag.sql, format!("(({leaf} AND {leaf}) AND ({leaf} AND {leaf}))"));
    assert_eq!(frag.params, vec!["%a%", "%b%", "%c%", "%d%"]);

    let phrase: Vec<String> = (0..1000).map(|i| format!("k{i}")).collect();
    let wide = lower_predicate(&build_predicate(&phrase.join(" "), &[SearchField::Title]).expect("terms"), report_column);
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    for c in wide.sql.chars() {
        match c {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    assert!(max_depth <= 16, "nesting depth {max_depth}");
}

#[test]
fn concurrent_builds_stay_independent() {
    let phrases = ["ソニー", "東芝 冷蔵庫", "ﾊﾟﾅｿﾆｯｸ", "a b c", "100%", "日立"];
    std::thread::scope(|scope| {
        for (i, phrase) in phrases.iter().enumerate() {
            scope.spawn(move || {
                let expected = build_predicate(phrase, &SearchField::ALL);
                for _ in 0..200 {
                    let got = build_predicate(phrase, &SearchField::ALL);
                    assert_eq!(got, expected, "phrase #{i}");
                }
            });
        }
    });
}
