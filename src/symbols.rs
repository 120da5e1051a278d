use std::collections::HashMap;
use std::fmt::{self, Display};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Quote assets recognized when splitting a concatenated pair.
pub const KNOWN_QUOTES: [&str; 7] = ["USDT", "USDC", "USD", "USDE", "FDUSD", "TUSD", "DAI"];

/// Derivative decorations venues append to the pair, matched in this order.
const DERIV_SUFFIXES: [&str; 7] = ["SWAP", "PERP", "USDTM", "USDM", "UMCBL", "CMCBL", "DMCBL"];

/// KNOWN_QUOTES sorted longest first so FDUSD wins over USD, TUSD over USD.
const QUOTES_LONGEST_FIRST: [&str; 7] = ["FDUSD", "USDT", "USDC", "USDE", "TUSD", "USD", "DAI"];

/// Venues occasionally list a base under a decorated name. Canonical keys
/// use the clean base so the same coin lines up across venues.
static BASE_ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("BOBBSC", "BOB")]));

/// Venue-independent instrument key in `BASE/QUOTE` form, e.g. `BTC/USDT`.
///
/// Only [`canonicalize`] produces these, so two equal keys always mean the
/// same instrument regardless of which venue's native symbol they came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSymbol(String);

impl CanonicalSymbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the marker produced from empty input.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn base(&self) -> &str {
        self.0.split_once('/').map(|(b, _)| b).unwrap_or("")
    }

    pub fn quote(&self) -> &str {
        self.0.split_once('/').map(|(_, q)| q).unwrap_or("")
    }
}

impl Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reduces any venue-native perpetual symbol to its canonical `BASE/QUOTE`
/// key: uppercase, drop separators, peel one derivative suffix, peel a
/// trailing contract `M`, then split on the longest matching known quote
/// (defaulting to USDT when none matches). Empty input maps to the empty
/// marker. The function is idempotent, so canonical keys pass through
/// unchanged.
pub fn canonicalize(raw: &str) -> CanonicalSymbol {
    if raw.is_empty() {
        return CanonicalSymbol(String::new());
    }
    let mut s: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '/'))
        .collect();
    for suffix in DERIV_SUFFIXES {
        if s.ends_with(suffix) {
            s.truncate(s.len() - suffix.len());
            break;
        }
    }
    if s.len() > 1 && s.ends_with('M') {
        s.truncate(s.len() - 1);
    }
    for quote in QUOTES_LONGEST_FIRST {
        if let Some(base) = s.strip_suffix(quote) {
            return CanonicalSymbol(format!("{}/{}", alias(base), quote));
        }
    }
    CanonicalSymbol(format!("{}/USDT", alias(&s)))
}

fn alias(base: &str) -> &str {
    BASE_ALIASES.get(base).copied().unwrap_or(base)
}
