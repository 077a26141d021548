//! Reserved words of Danfe in both of its surface vocabularies.
//!
//! Every reserved word has one English and one Nepali spelling, and both
//! canonicalize to the same [`Keyword`]. Nothing past the scanner ever sees
//! which spelling was used.

use rustc_hash::FxHashMap;
use std::{fmt, sync::OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    For,
    Break,
    Continue,
    Fn,
    Return,
    True,
    False,
    None,
    Println,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    Nepali,
}

// (canonical, english, nepali)
const TABLE: [(Keyword, &str, &str); 10] = [
    (Keyword::If, "if", "yedi"),
    (Keyword::For, "for", "ghum"),
    (Keyword::Break, "break", "todh"),
    (Keyword::Continue, "continue", "xod"),
    (Keyword::Fn, "fn", "kaam"),
    (Keyword::Return, "return", "farkau"),
    (Keyword::True, "true", "sahi"),
    (Keyword::False, "false", "galat"),
    (Keyword::None, "none", "khali"),
    (Keyword::Println, "println", "dekhau"),
];

// Older spellings still found in the documentation.
const ALIASES: [(Keyword, &str); 1] = [(Keyword::Println, "dekhauln")];

fn lookup() -> &'static FxHashMap<&'static str, Keyword> {
    static LOOKUP: OnceLock<FxHashMap<&'static str, Keyword>> = OnceLock::new();
    LOOKUP.get_or_init(|| {
        let mut map = FxHashMap::default();
        for (kw, english, nepali) in TABLE {
            map.insert(english, kw);
            map.insert(nepali, kw);
        }
        for (kw, alias) in ALIASES {
            map.insert(alias, kw);
        }
        map
    })
}

/// Maps a surface spelling in either locale to its canonical keyword.
pub fn canonicalize(spelling: &str) -> Option<Keyword> {
    lookup().get(spelling).copied()
}

impl Keyword {
    pub const ALL: [Keyword; 10] = [
        Keyword::If,
        Keyword::For,
        Keyword::Break,
        Keyword::Continue,
        Keyword::Fn,
        Keyword::Return,
        Keyword::True,
        Keyword::False,
        Keyword::None,
        Keyword::Println,
    ];

    pub fn spelling(self, locale: Locale) -> &'static str {
        // TABLE is listed in declaration order.
        let (_, english, nepali) = TABLE[self as usize];
        match locale {
            Locale::English => english,
            Locale::Nepali => nepali,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling(Locale::English))
    }
}
