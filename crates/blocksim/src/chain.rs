//! Chain-level values shared between the driver and the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SimRng;

/// A simulated account handed to every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: String,
    /// Seed material the application may use to derive keys.
    pub key_seed: u64,
}

impl Account {
    /// Creates an account with a random address.
    pub fn random(rng: &mut SimRng) -> Self {
        let key_seed = rand::RngCore::next_u64(rng);
        Self {
            address: format!("sim1{key_seed:016x}"),
            key_seed,
        }
    }
}

/// Generates `n` random accounts.
///
/// This is the default account generator passed to the driver.
pub fn random_accounts(rng: &mut SimRng, n: usize) -> Vec<Account> {
    (0..n).map(|_| Account::random(rng)).collect()
}

/// A validator returned by chain initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator address.
    pub address: String,
    /// Voting power.
    pub power: u64,
}

/// The validator set used to pick block proposers.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Creates a validator set. Validators are sorted by address so that
    /// proposer selection does not depend on the order the application
    /// returned them in.
    pub fn new(mut validators: Vec<Validator>) -> Self {
        validators.sort_by(|a, b| a.address.cmp(&b.address));
        Self { validators }
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns true if there are no validators.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Picks a proposer uniformly at random.
    pub fn random_proposer(&self, rng: &mut SimRng) -> Option<&Validator> {
        if self.validators.is_empty() {
            return None;
        }
        self.validators.get(rng.next_usize(self.validators.len()))
    }

    /// Returns an iterator over the validators.
    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }
}

/// Header of the block currently being simulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier returned by chain initialization.
    pub chain_id: String,
    /// Block height.
    pub height: u64,
    /// Block timestamp.
    pub time: DateTime<Utc>,
    /// Address of the proposing validator.
    pub proposer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(address: &str) -> Validator {
        Validator {
            address: address.to_string(),
            power: 10,
        }
    }

    #[test]
    fn random_accounts_are_deterministic() {
        let a = random_accounts(&mut SimRng::new(5), 4);
        let b = random_accounts(&mut SimRng::new(5), 4);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn proposer_independent_of_input_order() {
        let set1 = ValidatorSet::new(vec![validator("c"), validator("a"), validator("b")]);
        let set2 = ValidatorSet::new(vec![validator("b"), validator("c"), validator("a")]);

        let mut rng1 = SimRng::new(11);
        let mut rng2 = SimRng::new(11);
        for _ in 0..20 {
            assert_eq!(
                set1.random_proposer(&mut rng1),
                set2.random_proposer(&mut rng2)
            );
        }
    }

    #[test]
    fn empty_set_has_no_proposer() {
        let set = ValidatorSet::new(Vec::new());
        assert!(set.is_empty());
        assert!(set.random_proposer(&mut SimRng::new(0)).is_none());
    }
}
