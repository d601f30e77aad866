//! Strongly-typed identifiers for domain entities.
//!
//! Newtypes over strings prevent accidental mixing of market, token, and
//! event identifiers. Generated identifiers (opportunities, scans) are
//! UUID v4.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Unique identifier for a prediction market (one binary question).
    MarketId
}

string_id! {
    /// Unique identifier for a tradeable outcome token.
    TokenId
}

string_id! {
    /// Identifier of the event grouping related markets.
    ///
    /// Markets reference events by id only; there are no object pointers
    /// between the two, so the market/event graph stays acyclic.
    EventId
}

/// Unique identifier for a discovered opportunity. UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(String);

impl OpportunityId {
    /// Creates a new opportunity identifier with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpportunityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OpportunityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_id_round_trips() {
        let id = MarketId::new("market-1");
        assert_eq!(id.as_str(), "market-1");
        assert_eq!(format!("{id}"), "market-1");
    }

    #[test]
    fn token_and_market_ids_are_distinct_types() {
        // Compile-time property; this test documents intent.
        let token = TokenId::from("0xabc");
        let market = MarketId::from("0xabc");
        assert_eq!(token.as_str(), market.as_str());
    }

    #[test]
    fn event_id_orders_lexically() {
        let a = EventId::new("alpha");
        let b = EventId::new("beta");
        assert!(a < b);
    }

    #[test]
    fn opportunity_ids_are_unique() {
        assert_ne!(OpportunityId::new(), OpportunityId::new());
    }

    #[test]
    fn opportunity_id_is_uuid_shaped() {
        let id = OpportunityId::new();
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(id.as_str().chars().filter(|c| *c == '-').count(), 4);
    }
}
