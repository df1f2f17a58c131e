//! Capacity weights for group members.
//!
//! A member's capacity is looked up from three independent sources:
//!
//! - a combined table keyed by location then instance family, or by instance
//!   family then location,
//! - a per instance family table,
//! - a per location table.
//!
//! The combined table wins when it has an entry for the pair; otherwise the
//! product of the two one-level tables is used. Unknown keys weigh `1.0`, so a
//! member on an instance type nobody configured gets baseline capacity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One-level weight table, keyed by instance family or by location.
pub type Weights = BTreeMap<String, f64>;

/// Two-level weight table.
///
/// The outer key may be either the location or the instance family; both
/// orders are looked up.
pub type CombinedWeights = BTreeMap<String, Weights>;

/// Weight of anything a table does not mention.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Where a weight table comes from.
///
/// A computed source is called once per assignment, so values that change
/// over time (e.g. derived from infrastructure state) are picked up on the next
/// rebalance without rebuilding the assignor.
pub enum WeightSource<T> {
    Constant(T),
    Computed(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T> WeightSource<T>
where
    T: Clone,
{
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Produce an owned snapshot of the table.
    ///
    /// Constant tables are cloned so a caller can never observe changes made
    /// to a snapshot handed out by an earlier call.
    pub fn resolve(&self) -> T {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Computed(f) => f(),
        }
    }
}

impl<T> Clone for WeightSource<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<T> Default for WeightSource<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::Constant(T::default())
    }
}

impl<T> From<T> for WeightSource<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

impl<T> fmt::Debug for WeightSource<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Computed(_) => f.debug_tuple("Computed").finish_non_exhaustive(),
        }
    }
}

/// The three member weight sources an assignor is configured with.
#[derive(Debug, Clone, Default)]
pub struct WeightConfig {
    pub instance_family: WeightSource<Weights>,
    pub location: WeightSource<Weights>,
    pub combined: WeightSource<CombinedWeights>,
}

impl WeightConfig {
    /// Evaluate every source once, for the duration of one assignment.
    pub fn resolve(&self) -> WeightResolver {
        WeightResolver {
            instance_family: self.instance_family.resolve(),
            location: self.location.resolve(),
            combined: self.combined.resolve(),
        }
    }
}

/// Resolved weight tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightResolver {
    instance_family: Weights,
    location: Weights,
    combined: CombinedWeights,
}

impl WeightResolver {
    pub fn new(instance_family: Weights, location: Weights, combined: CombinedWeights) -> Self {
        Self {
            instance_family,
            location,
            combined,
        }
    }

    /// Capacity of a member running on `family` in `location`.
    pub fn capacity(&self, family: &str, location: &str) -> f64 {
        let combined = lookup(&self.combined, location, family)
            .or_else(|| lookup(&self.combined, family, location));
        if let Some(weight) = combined {
            return weight;
        }

        let family_weight = self
            .instance_family
            .get(family)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT);
        let location_weight = self
            .location
            .get(location)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT);

        family_weight * location_weight
    }
}

fn lookup(table: &CombinedWeights, outer: &str, inner: &str) -> Option<f64> {
    table.get(outer).and_then(|t| t.get(inner)).copied()
}
