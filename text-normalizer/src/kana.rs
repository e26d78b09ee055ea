//! Kana width/script conversion used to widen substring matches.
//!
//! Two directions are provided:
//! - [`to_zenkaku_katakana`]: half-width katakana becomes full-width (voiced marks are
//!   composed, so `ｶﾞ` becomes `ガ`) and hiragana becomes katakana.
//! - [`to_hankaku_katakana`]: katakana and hiragana become half-width katakana, voiced
//!   syllables split into base + `ﾞ`/`ﾟ`.
//!
//! Characters without a counterpart pass through unchanged.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

const HALFWIDTH_KANA_START: u32 = 0xFF61;
const HALFWIDTH_KANA_END: u32 = 0xFF9F;

const COMBINING_VOICED: char = '\u{3099}';
const COMBINING_SEMI_VOICED: char = '\u{309A}';
const SPACING_VOICED: char = '\u{309B}';
const SPACING_SEMI_VOICED: char = '\u{309C}';
const HALFWIDTH_VOICED: char = '\u{FF9E}';
const HALFWIDTH_SEMI_VOICED: char = '\u{FF9F}';

/// Full-width form -> half-width form, derived from the compatibility mappings of the
/// Halfwidth Katakana block.
static FULL_TO_HALF: Lazy<HashMap<char, char>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for cp in HALFWIDTH_KANA_START..=HALFWIDTH_KANA_END {
        let Some(half) = char::from_u32(cp) else { continue };
        let mut full = std::iter::once(half).nfkc();
        if let (Some(f), None) = (full.next(), full.next()) {
            map.insert(f, half);
        }
    }
    map.insert(SPACING_VOICED, HALFWIDTH_VOICED);
    map.insert(SPACING_SEMI_VOICED, HALFWIDTH_SEMI_VOICED);
    map
});

pub fn is_halfwidth_katakana(c: char) -> bool {
    (HALFWIDTH_KANA_START..=HALFWIDTH_KANA_END).contains(&(c as u32))
}

pub fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}' | '\u{309D}' | '\u{309E}')
}

/// Hiragana -> katakana for a single char; anything else is returned as is.
pub fn hiragana_to_katakana(c: char) -> char {
    if is_hiragana(c) {
        char::from_u32(c as u32 + 0x60).unwrap_or(c)
    } else {
        c
    }
}

/// Normalise to full-width katakana.
pub fn to_zenkaku_katakana(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = String::new();
    for c in s.chars() {
        if is_halfwidth_katakana(c) {
            run.push(c);
            continue;
        }
        flush_halfwidth_run(&mut run, &mut out);
        out.push(hiragana_to_katakana(c));
    }
    flush_halfwidth_run(&mut run, &mut out);
    out
}

/// Compose a run of half-width katakana into full-width. Marks that cannot combine
/// with the preceding kana stay visible as spacing marks.
fn flush_halfwidth_run(run: &mut String, out: &mut String) {
    if run.is_empty() {
        return;
    }
    for c in run.nfkc() {
        out.push(match c {
            COMBINING_VOICED => SPACING_VOICED,
            COMBINING_SEMI_VOICED => SPACING_SEMI_VOICED,
            other => other,
        });
    }
    run.clear();
}

/// Normalise to half-width katakana.
pub fn to_hankaku_katakana(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        let kata = hiragana_to_katakana(c);
        if let Some(&half) = FULL_TO_HALF.get(&kata) {
            out.push(half);
            continue;
        }
        match split_voiced(kata) {
            Some(halves) => out.push_str(&halves),
            None => out.push(c),
        }
    }
    out
}

/// `ガ` -> `ｶﾞ`, `パ` -> `ﾊﾟ`. `None` when `c` is not a voiced kana with a half-width base.
fn split_voiced(c: char) -> Option<String> {
    let mut parts = std::iter::once(c).nfd();
    let base = parts.next()?;
    let mark = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let half_base = *FULL_TO_HALF.get(&base)?;
    let half_mark = match mark {
        COMBINING_VOICED => HALFWIDTH_VOICED,
        COMBINING_SEMI_VOICED => HALFWIDTH_SEMI_VOICED,
        _ => return None,
    };
    Some([half_base, half_mark].iter().collect())
}
