//! English noun inflection and route parameter names.
//!
//! Resource menus are named with the plural of the resource name, and group
//! grants are matched against the singular of menu names, so both
//! directions need to agree on the common cases (`Company`/`Companies`,
//! `Address`/`Addresses`, `Person`/`People`).

use heck::ToSnakeCase;
use regex::Regex;
use std::sync::LazyLock;

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
];

fn rules(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(&format!("(?i){pattern}")).expect("Invalid inflection regex"),
                *replacement,
            )
        })
        .collect()
}

// First match wins.
static PLURAL: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    rules(&[
        ("(quiz)$", "${1}zes"),
        ("^(oxen)$", "${1}"),
        ("^(ox)$", "${1}en"),
        ("([ml])ice$", "${1}ice"),
        ("([ml])ouse$", "${1}ice"),
        ("(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        ("(x|ch|ss|sh)$", "${1}es"),
        ("([^aeiouy]|qu)y$", "${1}ies"),
        ("(hive)$", "${1}s"),
        ("(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
        ("sis$", "ses"),
        ("([ti])a$", "${1}a"),
        ("([ti])um$", "${1}a"),
        ("(buffal|tomat)o$", "${1}oes"),
        ("(bu)s$", "${1}ses"),
        ("(alias|status)$", "${1}es"),
        ("(octop|vir)i$", "${1}i"),
        ("(octop|vir)us$", "${1}i"),
        ("^(ax|test)is$", "${1}es"),
        ("s$", "s"),
        ("$", "s"),
    ])
});

static SINGULAR: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    rules(&[
        ("(database)s$", "${1}"),
        ("(quiz)zes$", "${1}"),
        ("(matr)ices$", "${1}ix"),
        ("(vert|ind)ices$", "${1}ex"),
        ("^(ox)en", "${1}"),
        ("(alias|status)(es)?$", "${1}"),
        ("(octop|vir)(us|i)$", "${1}us"),
        ("^(a)x[ie]s$", "${1}xis"),
        ("(cris|test)(is|es)$", "${1}is"),
        ("(shoe)s$", "${1}"),
        ("(o)es$", "${1}"),
        ("(bus)(es)?$", "${1}"),
        ("^([ml])ice$", "${1}ouse"),
        ("(x|ch|ss|sh)es$", "${1}"),
        ("(m)ovies$", "${1}ovie"),
        ("([^aeiouy]|qu)ies$", "${1}y"),
        ("([lr])ves$", "${1}f"),
        ("(tive)s$", "${1}"),
        ("(hive)s$", "${1}"),
        ("([^f])ves$", "${1}fe"),
        ("(^analy)(sis|ses)$", "${1}sis"),
        ("([ti])a$", "${1}um"),
        ("(ss)$", "${1}"),
        ("s$", ""),
    ])
});

/// Apply an irregular pair to the last word of `word`, keeping the case
/// of its first letter.
fn irregular(word: &str, from: &str, to: &str) -> Option<String> {
    let start = word.rfind(' ').map(|i| i + 1).unwrap_or(0);
    let last = &word[start..];
    if !last.eq_ignore_ascii_case(from) {
        return None;
    }
    let mut replaced = String::with_capacity(to.len());
    if last.starts_with(|c: char| c.is_uppercase()) {
        let mut chars = to.chars();
        if let Some(first) = chars.next() {
            replaced.extend(first.to_uppercase());
            replaced.push_str(chars.as_str());
        }
    } else {
        replaced.push_str(to);
    }
    Some(format!("{}{}", &word[..start], replaced))
}

fn is_uncountable(word: &str) -> bool {
    let lower = word.to_lowercase();
    UNCOUNTABLE.iter().any(|u| lower.ends_with(u))
}

fn inflect(word: &str, rules: &[(Regex, &'static str)], irregular_pair: impl Fn(&str, &str) -> Option<String>) -> String {
    if word.is_empty() || is_uncountable(word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if let Some(replaced) = irregular_pair(singular, plural) {
            return replaced;
        }
    }
    for (pattern, replacement) in rules {
        if pattern.is_match(word) {
            return pattern.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

/// `Company` → `Companies`.
pub fn plural(word: &str) -> String {
    inflect(word, &PLURAL, |singular, plural| irregular(word, singular, plural))
}

/// `Companies` → `Company`.
pub fn singular(word: &str) -> String {
    inflect(word, &SINGULAR, |singular, plural| irregular(word, plural, singular))
}

/// Route parameter form of a name: `Credit Cards` → `credit_cards`,
/// `FakeNews` → `fake_news`.
pub fn to_param(name: &str) -> String {
    name.trim().to_snake_case()
}
