//! Paired-symbol table.
//!
//! Opening symbols that get their closing partner inserted after them when
//! paired input is enabled. Both half-width and full-width forms are covered.

const PAIRS: &[(char, char)] = &[
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('<', '>'),
    ('"', '"'),
    ('\'', '\''),
    ('（', '）'),
    ('【', '】'),
    ('「', '」'),
    ('『', '』'),
    ('《', '》'),
    ('〈', '〉'),
    ('｛', '｝'),
    ('［', '］'),
    ('\u{201C}', '\u{201D}'), // “ ”
    ('\u{2018}', '\u{2019}'), // ‘ ’
];

/// Closing partner for an opening symbol.
pub fn closing_for(open: char) -> Option<char> {
    PAIRS.iter().find(|(o, _)| *o == open).map(|(_, c)| *c)
}

/// Closing partner when `text` is a single opening symbol.
pub fn closing_for_text(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(open), None) => closing_for(open),
        _ => None,
    }
}
