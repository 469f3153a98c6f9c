use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Default exchange suffix appended to bare symbols (NSE)
pub const DEFAULT_SYMBOL_SUFFIX: &str = ".NS";

fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // e.g. RELIANCE, M&M, BAJAJ-AUTO, ^NSEI, RELIANCE.NS
        Regex::new(r"^\^?[A-Z0-9][A-Z0-9&_\-]*(\.[A-Z]{1,4})?$").expect("static ticker pattern")
    })
}

/// Uppercase, trim and suffix a single symbol; None when it is not a valid ticker
pub fn normalize_symbol(raw: &str, suffix: Option<&str>) -> Option<String> {
    let symbol = raw.trim().trim_matches('"').to_uppercase();
    if symbol.is_empty() || !ticker_pattern().is_match(&symbol) {
        return None;
    }

    match suffix {
        Some(suffix) if !suffix.is_empty() && !symbol.contains('.') && !symbol.starts_with('^') => {
            Some(format!("{}{}", symbol, suffix.to_uppercase()))
        }
        _ => Some(symbol),
    }
}

/// Normalize a list of symbols, dropping blanks, invalid entries and duplicates.
///
/// Returns the kept symbols in input order plus the rejected raw values.
pub fn normalize_symbols<I, S>(raw: I, suffix: Option<&str>) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    for item in raw {
        let item = item.as_ref();
        if item.trim().is_empty() {
            continue;
        }
        match normalize_symbol(item, suffix) {
            Some(symbol) => {
                if seen.insert(symbol.clone()) {
                    kept.push(symbol);
                }
            }
            None => rejected.push(item.trim().to_string()),
        }
    }

    (kept, rejected)
}

/// Split a comma or newline separated symbol list
pub fn split_symbol_list(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c == '\n' || c == '\r' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
