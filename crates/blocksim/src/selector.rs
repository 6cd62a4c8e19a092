//! Weighted operation selection.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};

use crate::error::SimError;
use crate::operation::WeightedOperation;
use crate::rng::SimRng;

/// Selects operations from a catalog with probability proportional to weight.
///
/// The catalog is walked in order, so two selectors built from the same
/// catalog make identical choices from identical random streams.
pub struct OperationSelector<A> {
    catalog: Vec<WeightedOperation<A>>,
    index: WeightedIndex<u64>,
}

impl<A> OperationSelector<A> {
    /// Builds a selector.
    ///
    /// Fails if the catalog is empty or every weight is zero.
    pub fn new(catalog: &[WeightedOperation<A>]) -> Result<Self, SimError> {
        let index = WeightedIndex::new(catalog.iter().map(|op| u64::from(op.weight)))
            .map_err(|e| match e {
                WeightedError::NoItem => {
                    SimError::Config("operation catalog is empty".to_string())
                }
                WeightedError::AllWeightsZero => {
                    SimError::Config("every operation in the catalog has zero weight".to_string())
                }
                other => SimError::Config(format!("invalid operation weights: {other}")),
            })?;

        Ok(Self {
            catalog: catalog.to_vec(),
            index,
        })
    }

    /// Picks one operation.
    pub fn select(&self, rng: &mut SimRng) -> &WeightedOperation<A> {
        &self.catalog[self.index.sample(rng)]
    }

    /// Number of operations in the catalog, including zero-weight ones.
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Returns true if the catalog is empty. A built selector never is.
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationOutput, OperationResult, operation};

    fn named(name: &str, weight: u32) -> WeightedOperation<()> {
        let route = name.to_string();
        WeightedOperation::new(
            name,
            weight,
            operation(move |_, _, _, _, _| {
                Ok(OperationOutput::new(OperationResult::ok(&route, "op", "")))
            }),
        )
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let result = OperationSelector::<()>::new(&[]);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let result = OperationSelector::new(&[named("a", 0), named("b", 0)]);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn single_entry_always_selected() {
        let selector = OperationSelector::new(&[named("only", 7)]).unwrap();
        let mut rng = SimRng::new(1);
        for _ in 0..100 {
            assert_eq!(selector.select(&mut rng).name, "only");
        }
    }

    #[test]
    fn zero_weight_entry_never_selected() {
        let selector = OperationSelector::new(&[named("never", 0), named("always", 1)]).unwrap();
        let mut rng = SimRng::new(2);
        for _ in 0..1000 {
            assert_eq!(selector.select(&mut rng).name, "always");
        }
    }

    #[test]
    fn selection_converges_to_weights() {
        let selector = OperationSelector::new(&[named("a", 1), named("b", 3)]).unwrap();
        let mut rng = SimRng::new(12345);

        let draws = 20_000;
        let b_count = (0..draws)
            .filter(|_| selector.select(&mut rng).name == "b")
            .count();
        let a_count = draws - b_count;

        let ratio = b_count as f64 / a_count as f64;
        assert!((ratio - 3.0).abs() < 0.2, "observed B:A ratio {ratio}");
    }

    #[test]
    fn selection_is_deterministic() {
        let catalog = [named("a", 2), named("b", 5), named("c", 1)];
        let s1 = OperationSelector::new(&catalog).unwrap();
        let s2 = OperationSelector::new(&catalog).unwrap();
        let mut rng1 = SimRng::new(77);
        let mut rng2 = SimRng::new(77);

        for _ in 0..500 {
            assert_eq!(s1.select(&mut rng1).name, s2.select(&mut rng2).name);
        }
    }
}
