// crates/nlu/src/normalize.rs

use pipa_core::Utterance;
use unicode_normalization::UnicodeNormalization;

/// Unicode NFC compose, drop zero-width/format code points, map exotic space
/// code points to ASCII space, collapse whitespace runs, trim. Total: never
/// fails, empty in means empty out.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.nfc() {
        if is_erasable(ch) {
            continue;
        }
        let ch = if is_space_like(ch) { ' ' } else { ch };
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

pub fn utterance(raw: &str) -> Utterance {
    Utterance::new(raw, normalize(raw))
}

/// Zero-width and bidi format characters plus the soft hyphen.
fn is_erasable(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{00AD}'
    )
}

fn is_space_like(ch: char) -> bool {
    matches!(
        ch,
        '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}
