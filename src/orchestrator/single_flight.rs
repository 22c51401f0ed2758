//! In-flight request bookkeeping

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;

/// Shared handle to an outstanding request
pub type Flight<T> = Shared<BoxFuture<'static, T>>;

/// At most one outstanding request per key.
///
/// Each flight carries an id so that a finished flight only removes itself,
/// never a newer flight started for the same key.
pub struct FlightMap<T: Clone> {
    flights: HashMap<String, (u64, Flight<T>)>,
    next_id: u64,
}

impl<T> FlightMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            flights: HashMap::new(),
            next_id: 0,
        }
    }

    /// Outstanding flight for `key`, if any
    pub fn get(&self, key: &str) -> Option<Flight<T>> {
        self.flights.get(key).map(|(_, flight)| flight.clone())
    }

    /// Reserve the id for the next flight
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Register a flight for `key` under a reserved id
    pub fn insert(&mut self, key: impl Into<String>, id: u64, fut: BoxFuture<'static, T>) -> Flight<T> {
        let flight = fut.shared();
        self.flights.insert(key.into(), (id, flight.clone()));
        flight
    }

    /// Remove the flight for `key` if it is still flight `id`
    pub fn complete(&mut self, key: &str, id: u64) -> bool {
        match self.flights.get(key) {
            Some((current, _)) if *current == id => {
                self.flights.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Number of outstanding flights
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl<T> Default for FlightMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
