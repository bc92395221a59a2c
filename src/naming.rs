//! Identifier case conversion and the naive English helpers used by templates.

/// Nouns whose route groups get pluralized. Anything else keeps its name.
pub const ROUTE_NOUNS: &[&str] = &[
    "user", "post", "product", "order", "category", "comment", "tag", "item", "customer",
    "article", "page", "role", "invoice", "payment", "review",
];

/// Split on `_`, `-`, spaces and lower-to-upper case boundaries.
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in s.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Upper-case the first character, leaving the rest untouched.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

fn capitalize(word: &str) -> String {
    ucfirst(&word.to_lowercase())
}

pub fn pascal_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

pub fn camel_case(s: &str) -> String {
    let pascal = pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

pub fn kebab_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn snake_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Naive pluralization: `y` → `ies`, `s/x/z/ch/sh` → `+es`, otherwise `+s`.
pub fn pluralize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let lower = s.to_lowercase();
    if let Some(stem) = s.strip_suffix('y').or_else(|| s.strip_suffix('Y')) {
        return format!("{stem}ies");
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{s}es");
    }
    format!("{s}s")
}

/// Rough inverse of [`pluralize`] for display names: `categories` → `category`,
/// `boxes` → `box`, `users` → `user`. Words not ending in `s` are returned as is.
pub fn singularize(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    if lower.ends_with("ies") && s.len() > 3 {
        return format!("{}y", &s[..s.len() - 3]);
    }
    if ["ses", "xes", "zes", "ches", "shes"].iter().any(|suffix| lower.ends_with(suffix)) {
        return s[..s.len() - 2].to_string();
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return s[..s.len() - 1].to_string();
    }
    s.to_string()
}

/// Human label: `first_name` → `First Name`.
pub fn label(s: &str) -> String {
    s.split('_')
        .filter(|w| !w.is_empty())
        .map(ucfirst)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Route segment for a table: kebab-cased, pluralized only for allow-listed nouns.
pub fn route_segment(table: &str) -> String {
    let kebab = kebab_case(table);
    if ROUTE_NOUNS.contains(&kebab.as_str()) {
        pluralize(&kebab)
    } else {
        kebab
    }
}
