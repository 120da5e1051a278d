use std::collections::BTreeSet;

use crate::exchange::ExchangeId;
use crate::symbols::{canonicalize, CanonicalSymbol};
use crate::types::Quote;

/// Request-scoped allow/deny policy. Carried as a value through the
/// pipeline; there is no process-wide filter state.
#[derive(Debug, Clone, Default)]
pub struct FilterLists {
    pub exchange_whitelist: Option<BTreeSet<ExchangeId>>,
    pub exchange_blacklist: BTreeSet<ExchangeId>,
    pub token_whitelist: Option<BTreeSet<CanonicalSymbol>>,
    pub token_blacklist: BTreeSet<CanonicalSymbol>,
}

impl FilterLists {
    /// Builds token lists from raw symbol spellings (native or canonical;
    /// both reduce to the same key).
    pub fn with_tokens(
        whitelist: Option<&[String]>,
        blacklist: Option<&[String]>,
    ) -> Self {
        Self {
            token_whitelist: whitelist.map(|symbols| {
                symbols.iter().map(|s| canonicalize(s)).collect()
            }),
            token_blacklist: blacklist
                .map(|symbols| symbols.iter().map(|s| canonicalize(s)).collect())
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Empty whitelists behave like absent ones.
    pub fn is_exchange_allowed(&self, ex: ExchangeId) -> bool {
        if let Some(whitelist) = &self.exchange_whitelist {
            if !whitelist.is_empty() && !whitelist.contains(&ex) {
                return false;
            }
        }
        !self.exchange_blacklist.contains(&ex)
    }

    pub fn is_token_allowed(&self, symbol: &CanonicalSymbol) -> bool {
        if symbol.is_empty() {
            return false;
        }
        if let Some(whitelist) = &self.token_whitelist {
            if !whitelist.is_empty() && !whitelist.contains(symbol) {
                return false;
            }
        }
        !self.token_blacklist.contains(symbol)
    }

    /// Applies both checks ahead of aggregation so excluded venues and
    /// tokens never influence spread computation.
    pub fn apply(&self, quotes: Vec<Quote>) -> Vec<Quote> {
        quotes
            .into_iter()
            .filter(|q| self.is_exchange_allowed(q.exchange) && self.is_token_allowed(&q.symbol))
            .collect()
    }
}
