use chrono::FixedOffset;
use text_normalizer::format::{event_date_label, join_names};
use text_normalizer::{split_terms, term_variants, to_hankaku_katakana, to_zenkaku_katakana};

#[test]
fn halfwidth_to_fullwidth_composes_voiced_marks() {
    assert_eq!(to_zenkaku_katakana("ｿﾆｰ"), "ソニー");
    assert_eq!(to_zenkaku_katakana("ｶﾞｯｺｳ"), "ガッコウ");
    assert_eq!(to_zenkaku_katakana("ﾊﾟﾅｿﾆｯｸ"), "パナソニック");
    assert_eq!(to_zenkaku_katakana("ｳﾞｨ"), "ヴィ");
    assert_eq!(to_zenkaku_katakana("｢ｱ｣｡"), "「ア」。");
}

#[test]
fn hiragana_becomes_katakana() {
    assert_eq!(to_zenkaku_katakana("そにー"), "ソニー");
    assert_eq!(to_zenkaku_katakana("がっこう"), "ガッコウ");
}

#[test]
fn stray_marks_stay_visible() {
    assert_eq!(to_zenkaku_katakana("ﾞｱ"), "゛ア");
    assert_eq!(to_zenkaku_katakana("ｱﾞ"), "ア゛");
}

#[test]
fn fullwidth_to_halfwidth_splits_voiced_marks() {
    assert_eq!(to_hankaku_katakana("ソニー"), "ｿﾆｰ");
    assert_eq!(to_hankaku_katakana("ガッコウ"), "ｶﾞｯｺｳ");
    assert_eq!(to_hankaku_katakana("パナソニック"), "ﾊﾟﾅｿﾆｯｸ");
    assert_eq!(to_hankaku_katakana("ヴィ"), "ｳﾞｨ");
    assert_eq!(to_hankaku_katakana("がっこう"), "ｶﾞｯｺｳ");
}

#[test]
fn unrelated_text_passes_through() {
    for s in ["Sony 100%", "東芝", "Ａｂｃ", "abc_def", "ゐ"] {
        assert_eq!(to_zenkaku_katakana(s), s.replace('ゐ', "ヰ"), "{s}");
        assert_eq!(to_hankaku_katakana(s), s, "{s}");
    }
}

#[test]
fn terms_split_on_ascii_and_ideographic_space() {
    assert_eq!(split_terms("ソニー　テレビ  4K\t修理"), vec!["ソニー", "テレビ", "4K", "修理"]);
    assert!(split_terms("").is_empty());
    assert!(split_terms("   ").is_empty());
    assert!(split_terms("\u{3000}\u{3000} ").is_empty());
}

#[test]
fn variants_are_deduplicated_in_order() {
    let v = term_variants("ソニー");
    assert_eq!(v.as_slice(), ["ソニー", "ｿﾆｰ"]);

    let v = term_variants("そにー");
    assert_eq!(v.as_slice(), ["そにー", "ソニー", "ｿﾆｰ"]);

    let v = term_variants("ｿﾆｰ");
    assert_eq!(v.as_slice(), ["ｿﾆｰ", "ソニー"]);

    let v = term_variants("abc");
    assert_eq!(v.len(), 1);
    assert!(v.contains("abc"));
}

#[test]
fn display_helpers() {
    let jst = FixedOffset::east_opt(9 * 3600).expect("jst");
    assert_eq!(event_date_label(Some(1_753_974_000), jst), "2025年08月01日");
    assert_eq!(event_date_label(None, jst), "—");
    assert_eq!(join_names(&["ソニー", "東芝"], true), "ソニー、東芝");
    assert_eq!(join_names(&["Sony", "Toshiba"], false), "Sony, Toshiba");
}
