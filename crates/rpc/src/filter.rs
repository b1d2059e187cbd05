//! Result filters shared by the search service and its clients.
//!
//! Only three keys are recognised. Unset keys are `None`; self-describing formats may
//! leave them out entirely. Bincode frames carry every field, so nothing is skipped on
//! serialisation.

use crate::search::FlightOffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub max_price: Option<u32>,
    /// IATA carrier code, stored upper-case
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub max_stops: Option<u8>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.max_price.is_none() && self.airline.is_none() && self.max_stops.is_none()
    }

    pub fn with_max_price(mut self, max_price: u32) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn with_airline(mut self, airline: impl AsRef<str>) -> Self {
        self.airline = Some(airline.as_ref().to_ascii_uppercase());
        self
    }

    pub fn with_max_stops(mut self, max_stops: u8) -> Self {
        self.max_stops = Some(max_stops);
        self
    }

    /// The set keys as `(name, value)` pairs, in a fixed order.
    pub fn flatten(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(max_price) = self.max_price {
            pairs.push(("max-price", max_price.to_string()));
        }
        if let Some(airline) = &self.airline {
            pairs.push(("airline", airline.clone()));
        }
        if let Some(max_stops) = self.max_stops {
            pairs.push(("max-stops", max_stops.to_string()));
        }
        pairs
    }

    pub fn matches(&self, offer: &FlightOffer) -> bool {
        let price_ok = self.max_price.map_or(true, |max| offer.price <= max);
        let airline_ok = self
            .airline
            .as_deref()
            .map_or(true, |code| offer.airline.eq_ignore_ascii_case(code));
        let stops_ok = self.max_stops.map_or(true, |max| offer.stops <= max);
        price_ok && airline_ok && stops_ok
    }
}

impl fmt::Display for SearchFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let rendered: Vec<String> = self
            .flatten()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    #[error("unknown filter `{0}` (expected max-price, airline or max-stops)")]
    UnknownKey(String),

    #[error("filter `{0}` needs a value, e.g. `{0}=...`")]
    MissingValue(String),

    #[error("invalid value `{value}` for filter `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Parses `key=value` pairs separated by whitespace or commas, e.g.
/// `max-price=300, airline=ua`. An empty string yields no filters.
impl FromStr for SearchFilters {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filters = SearchFilters::default();

        for token in s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let Some((key, value)) = token.split_once('=') else {
                return Err(FilterParseError::MissingValue(token.to_string()));
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() {
                return Err(FilterParseError::MissingValue(key));
            }

            let invalid = || FilterParseError::InvalidValue {
                key: key.clone(),
                value: value.to_string(),
            };

            match key.as_str() {
                "max-price" | "maxprice" | "price" => {
                    filters.max_price = Some(value.parse().map_err(|_| invalid())?);
                }
                "airline" => {
                    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                        return Err(invalid());
                    }
                    filters.airline = Some(value.to_ascii_uppercase());
                }
                "max-stops" | "maxstops" | "stops" => {
                    filters.max_stops = Some(value.parse().map_err(|_| invalid())?);
                }
                _ => return Err(FilterParseError::UnknownKey(key.clone())),
            }
        }

        Ok(filters)
    }
}
