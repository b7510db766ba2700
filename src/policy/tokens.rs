// =============================================================================
// ApprovalToken — two-phase commit for order submission
// =============================================================================
//
// Preview() returns a token describing exactly what will be submitted;
// ValidateToken() consumes it (single-use) within a short expiry window
// before CreateOrder actually fires. Grounded on `risk.rs`'s RwLock<Inner>
// shape, applied here to a token table instead of counters.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Tokens older than this are rejected even if still present in the table.
pub const TOKEN_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalToken {
    pub token: String,
    pub symbol: String,
    pub side: String,
    pub qty: f64,
    pub est_price: f64,
    pub issued_at: i64,
}

struct Entry {
    token: ApprovalToken,
    consumed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    NotFound,
    AlreadyConsumed,
    Expired,
    /// Token was issued for a different underlying than the caller is now
    /// trying to submit against — blocks cross-symbol replay of a stale
    /// preview.
    SymbolMismatch,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenError::NotFound => "approval token not found",
            TokenError::AlreadyConsumed => "approval token already consumed",
            TokenError::Expired => "approval token expired",
            TokenError::SymbolMismatch => "approval token symbol mismatch",
        };
        write!(f, "{s}")
    }
}

pub struct TokenStore {
    tokens: RwLock<HashMap<String, Entry>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self { tokens: RwLock::new(HashMap::new()) }
    }

    /// Issue a fresh token for a previewed order. Never fails.
    pub fn issue(&self, symbol: &str, side: &str, qty: f64, est_price: f64) -> ApprovalToken {
        let token = ApprovalToken {
            token: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side: side.to_string(),
            qty,
            est_price,
            issued_at: Utc::now().timestamp(),
        };
        self.tokens.write().insert(
            token.token.clone(),
            Entry { token: token.clone(), consumed: false },
        );
        token
    }

    /// Validate and consume a token. A token can only be validated once;
    /// subsequent calls with the same token fail with `AlreadyConsumed`. The
    /// caller must pass the symbol it intends to trade; a mismatch against
    /// the symbol the token was issued for fails closed without consuming
    /// the token, preventing a preview for one underlying from being replayed
    /// against another.
    pub fn validate(&self, token: &str, symbol: &str) -> Result<ApprovalToken, TokenError> {
        let mut tokens = self.tokens.write();
        let entry = tokens.get_mut(token).ok_or(TokenError::NotFound)?;
        if entry.token.symbol != symbol {
            return Err(TokenError::SymbolMismatch);
        }
        if entry.consumed {
            return Err(TokenError::AlreadyConsumed);
        }
        if Utc::now().timestamp() - entry.token.issued_at > TOKEN_TTL_SECS {
            return Err(TokenError::Expired);
        }
        entry.consumed = true;
        Ok(entry.token.clone())
    }

    /// Drop tokens older than the TTL to bound memory growth.
    pub fn sweep_expired(&self) {
        let now = Utc::now().timestamp();
        self.tokens.write().retain(|_, e| now - e.token.issued_at <= TOKEN_TTL_SECS);
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_validate_succeeds_once() {
        let store = TokenStore::new();
        let token = store.issue("SPY", "buy", 1.0, 500.0);
        let validated = store.validate(&token.token, "SPY").unwrap();
        assert_eq!(validated.symbol, "SPY");
    }

    #[test]
    fn validate_twice_fails_second_time() {
        let store = TokenStore::new();
        let token = store.issue("SPY", "buy", 1.0, 500.0);
        store.validate(&token.token, "SPY").unwrap();
        let err = store.validate(&token.token, "SPY").unwrap_err();
        assert_eq!(err, TokenError::AlreadyConsumed);
    }

    #[test]
    fn validate_unknown_token_fails() {
        let store = TokenStore::new();
        let err = store.validate("nonexistent", "SPY").unwrap_err();
        assert_eq!(err, TokenError::NotFound);
    }

    #[test]
    fn validate_wrong_symbol_fails_without_consuming() {
        let store = TokenStore::new();
        let token = store.issue("SPY", "buy", 1.0, 500.0);
        let err = store.validate(&token.token, "QQQ").unwrap_err();
        assert_eq!(err, TokenError::SymbolMismatch);
        // Token is still unconsumed and can be validated against the right symbol.
        assert!(store.validate(&token.token, "SPY").is_ok());
    }

    #[test]
    fn sweep_removes_stale_tokens() {
        let store = TokenStore::new();
        let token = store.issue("SPY", "buy", 1.0, 500.0);
        {
            let mut tokens = store.tokens.write();
            tokens.get_mut(&token.token).unwrap().token.issued_at -= TOKEN_TTL_SECS + 10;
        }
        store.sweep_expired();
        assert_eq!(store.validate(&token.token, "SPY").unwrap_err(), TokenError::NotFound);
    }
}
