//! Price-source symbol candidates for KRX securities.

use factorbeta_primitives::Security;

/// Ordered, de-duplicated price-source identifiers to try for a security.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolCandidates {
    /// Identifiers in the order they should be tried.
    pub symbols: Vec<String>,
    /// Rules that produced them, `;`-separated.
    pub note: String,
}

impl SymbolCandidates {
    /// Whether there is nothing to try.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// First candidate, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }
}

/// Candidates for `security`.
///
/// An explicit price symbol is the only candidate. Otherwise the code is
/// upper-cased and matched against the KRX listing conventions; every rule
/// that applies contributes, in rule order.
#[must_use]
pub fn symbol_candidates(security: &Security) -> SymbolCandidates {
    let code = security.code.as_str().trim().to_uppercase();

    if code == "CASH" {
        return SymbolCandidates { symbols: Vec::new(), note: "skip:cash".to_string() };
    }

    if let Some(symbol) = security.price_symbol.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return SymbolCandidates {
            symbols: vec![symbol.to_string()],
            note: "prefer:price_symbol".to_string(),
        };
    }

    if code.ends_with(".KS") || code.ends_with(".KQ") {
        return SymbolCandidates { symbols: vec![code], note: "given:suffixed".to_string() };
    }

    let mut symbols = Vec::new();
    let mut notes = Vec::new();
    let listed = |core: &str| [format!("{core}.KS"), format!("{core}.KQ")];

    let six_digits = is_digits(&code, 6);
    if six_digits {
        symbols.extend(listed(&code));
        notes.push("rule:6digits");
    }

    if is_digits(&code, 5) {
        symbols.extend(listed(&format!("0{code}")));
        notes.push("rule:5digits_padded");
    }

    if let Some(core) = code.strip_prefix('Q').filter(|c| is_digits(c, 6)) {
        symbols.extend(listed(core));
        symbols.extend(listed(&code));
        notes.push("rule:q_prefixed");
    }

    if !six_digits && code.len() == 6 && code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        symbols.extend(listed(&code));
        notes.push("rule:6alnum");
    }

    if let Some(core) = embedded_digits(&code, 6).filter(|_| !six_digits) {
        symbols.extend(listed(core));
        notes.push("rule:embedded_6digits");
    }

    let mut seen = std::collections::HashSet::new();
    symbols.retain(|s| seen.insert(s.clone()));
    if symbols.is_empty() {
        notes.push("no_candidates");
    }

    SymbolCandidates { symbols, note: notes.join(";") }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// First run of `len` consecutive ASCII digits.
fn embedded_digits(s: &str, len: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut run = 0;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == len {
                return Some(&s[i + 1 - len..=i]);
            }
        } else {
            run = 0;
        }
    }
    None
}
