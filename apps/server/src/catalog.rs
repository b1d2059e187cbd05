//! Deterministic flight offers for the simulated search.
//!
//! The generator is seeded from the query, so the same query always produces the same
//! sequence of offers. That keeps the client-side de-duplication and paging observable
//! from run to run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rpc::search::FlightOffer;
use std::hash::{DefaultHasher, Hash, Hasher};

const AIRLINES: &[&str] = &["AA", "AS", "B6", "DL", "F9", "NK", "UA", "WN"];
const DEFAULT_ORIGIN: &str = "NYC";
const DEFAULT_DESTINATION: &str = "LAX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
        }
    }
}

impl Route {
    /// Parse `AAA to BBB` (three-letter codes, any case). Anything else is `None`.
    pub fn parse(query: &str) -> Option<Route> {
        let words: Vec<&str> = query.split_whitespace().collect();
        match words.as_slice() {
            [origin, to, destination]
                if to.eq_ignore_ascii_case("to") && is_code(origin) && is_code(destination) =>
            {
                Some(Route {
                    origin: origin.to_ascii_uppercase(),
                    destination: destination.to_ascii_uppercase(),
                })
            }
            _ => None,
        }
    }
}

fn is_code(word: &str) -> bool {
    word.len() == 3 && word.chars().all(|c| c.is_ascii_alphabetic())
}

pub struct OfferGenerator {
    rng: StdRng,
    route: Route,
    next_id: u32,
}

impl OfferGenerator {
    pub fn for_query(query: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        query.trim().to_ascii_lowercase().hash(&mut hasher);

        Self {
            rng: StdRng::seed_from_u64(hasher.finish()),
            route: Route::parse(query).unwrap_or_default(),
            next_id: 1,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn next_batch(&mut self, size: u32) -> Vec<FlightOffer> {
        (0..size).map(|_| self.next_offer()).collect()
    }

    fn next_offer(&mut self) -> FlightOffer {
        let id = format!(
            "{}{}-{:05}",
            self.route.origin, self.route.destination, self.next_id
        );
        self.next_id += 1;

        let airline = AIRLINES[self.rng.gen_range(0..AIRLINES.len())];
        // Nonstops are the most common
        let stops: u8 = match self.rng.gen_range(0..10) {
            0..=4 => 0,
            5..=8 => 1,
            _ => 2,
        };
        let base_price = self.rng.gen_range(89..=649);
        let price = base_price + u32::from(stops) * self.rng.gen_range(0..=60);
        let departure_minute = self.rng.gen_range(0..288u16) * 5;
        let duration_minutes = self.rng.gen_range(75..=390u16) + u16::from(stops) * 70;

        FlightOffer {
            id,
            airline: airline.to_string(),
            origin: self.route.origin.clone(),
            destination: self.route.destination.clone(),
            price,
            stops,
            departure_minute,
            duration_minutes,
        }
    }
}
