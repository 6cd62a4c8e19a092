//! Operation catalog for the ledger.

use blocksim::{
    Account, FutureOperation, Operation, OperationError, OperationOutput, OperationResult, SimRng,
    WeightedOperation, operation,
};
use blocksim_config::OperationWeights;
use chrono::Duration;

use crate::ledger::{Ledger, VESTING_POOL};

const BANK: &str = "bank";
const VESTING: &str = "vesting";
const AUDIT: &str = "audit";

/// Chance that a send moves the sender's whole balance.
const SWEEP_PROBABILITY: f64 = 0.1;

/// Builds the weighted operation catalog.
pub fn catalog(weights: &OperationWeights) -> Vec<WeightedOperation<Ledger>> {
    vec![
        WeightedOperation::new("send", weights.send, send()),
        WeightedOperation::new(
            "lock_until_height",
            weights.lock_until_height,
            lock_until_height(),
        ),
        WeightedOperation::new("vest_after", weights.vest_after, vest_after()),
        WeightedOperation::new("audit_supply", weights.audit_supply, audit_supply()),
    ]
}

/// Picks a funded account and an amount in `1..=balance`.
fn funded_account<'a>(
    rng: &mut SimRng,
    ledger: &Ledger,
    accounts: &'a [Account],
) -> Option<(&'a Account, u64)> {
    if accounts.is_empty() {
        return None;
    }
    let account = &accounts[rng.next_usize(accounts.len())];
    let balance = ledger.balance(&account.address);
    if balance == 0 {
        return None;
    }
    Some((account, rng.int_between(1, balance)))
}

fn failed(route: &str, name: &str, err: impl std::fmt::Display) -> OperationResult {
    OperationResult::no_op(route, name, err.to_string())
}

// ============================================================================
// Bank
// ============================================================================

/// Random transfer between two accounts.
fn send() -> Operation<Ledger> {
    operation(|rng, ledger: &mut Ledger, _header, accounts, _chain_id| {
        let Some((from, amount)) = funded_account(rng, ledger, accounts) else {
            return Ok(OperationResult::no_op(BANK, "send", "sender has no funds").into());
        };
        let to = &accounts[rng.next_usize(accounts.len())];
        let sweep = rng.next_bool_with_probability(SWEEP_PROBABILITY);
        let amount = if sweep {
            ledger.balance(&from.address)
        } else {
            amount
        };

        ledger
            .transfer(&from.address, &to.address, amount)
            .map_err(|e| OperationError::new(failed(BANK, "send", &e), e))?;

        let mut result = OperationResult::ok(
            BANK,
            "send",
            format!("{} -> {}: {amount}", from.address, to.address),
        );
        if from.address == to.address {
            result = result.with_event("self_send");
        }
        if sweep {
            result = result.with_event("sweep");
        }
        Ok(result.into())
    })
}

// ============================================================================
// Vesting
// ============================================================================

/// Moves `amount` from the vesting pool back to `owner`.
fn release(name: &'static str, owner: String, amount: u64) -> Operation<Ledger> {
    operation(move |_rng, ledger: &mut Ledger, _header, _accounts, _chain_id| {
        ledger
            .transfer(VESTING_POOL, &owner, amount)
            .map_err(|e| OperationError::new(failed(VESTING, name, &e), e))?;
        Ok(OperationResult::ok(VESTING, name, format!("{owner}: {amount}")).into())
    })
}

/// Locks funds and unlocks them a few blocks later.
fn lock_until_height() -> Operation<Ledger> {
    operation(|rng, ledger: &mut Ledger, header, accounts, _chain_id| {
        let Some((owner, amount)) = funded_account(rng, ledger, accounts) else {
            return Ok(
                OperationResult::no_op(VESTING, "lock_until_height", "owner has no funds").into(),
            );
        };

        ledger
            .transfer(&owner.address, VESTING_POOL, amount)
            .map_err(|e| OperationError::new(failed(VESTING, "lock_until_height", &e), e))?;

        let unlock_height = header.height + rng.int_between(1, 10);
        let unlock = release("unlock", owner.address.clone(), amount);

        Ok(OperationOutput::new(OperationResult::ok(
            VESTING,
            "lock_until_height",
            format!("{}: {amount} until height {unlock_height}", owner.address),
        ))
        .with_future_op(FutureOperation::at_height(unlock_height, unlock)))
    })
}

/// Locks funds and releases them after a random delay.
fn vest_after() -> Operation<Ledger> {
    operation(|rng, ledger: &mut Ledger, header, accounts, _chain_id| {
        let Some((owner, amount)) = funded_account(rng, ledger, accounts) else {
            return Ok(OperationResult::no_op(VESTING, "vest_after", "owner has no funds").into());
        };

        ledger
            .transfer(&owner.address, VESTING_POOL, amount)
            .map_err(|e| OperationError::new(failed(VESTING, "vest_after", &e), e))?;

        let delay = rng.int_between(30, 600) as i64;
        let release_at = header.time + Duration::seconds(delay);
        let vest = release("release", owner.address.clone(), amount);

        Ok(OperationOutput::new(OperationResult::ok(
            VESTING,
            "vest_after",
            format!("{}: {amount} at {release_at}", owner.address),
        ))
        .with_future_op(FutureOperation::at_time(release_at, vest)))
    })
}

// ============================================================================
// Audit
// ============================================================================

/// Fails the run if total supply drifted from genesis.
fn audit_supply() -> Operation<Ledger> {
    operation(|_rng, ledger: &mut Ledger, _header, _accounts, _chain_id| {
        let supply = ledger
            .audit()
            .map_err(|e| OperationError::new(failed(AUDIT, "audit_supply", &e), e))?;
        Ok(OperationResult::ok(AUDIT, "audit_supply", format!("supply {supply}")).into())
    })
}

#[cfg(test)]
mod tests {
    use blocksim::{BlockHeader, Schedule};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn header() -> BlockHeader {
        BlockHeader {
            chain_id: "c".to_string(),
            height: 5,
            time: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            proposer: String::new(),
        }
    }

    fn accounts() -> Vec<Account> {
        ["a", "b"]
            .iter()
            .map(|a| Account {
                address: (*a).to_string(),
                key_seed: 0,
            })
            .collect()
    }

    fn funded_ledger() -> Ledger {
        let mut ledger = Ledger::new(100);
        ledger.mint("a", 100).unwrap();
        ledger.mint("b", 100).unwrap();
        ledger
    }

    #[test]
    fn catalog_names_and_weights() {
        let weights = OperationWeights::default();
        let ops = catalog(&weights);
        let names: Vec<_> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["send", "lock_until_height", "vest_after", "audit_supply"]);
        assert_eq!(ops[0].weight, weights.send);
    }

    #[test]
    fn send_from_empty_accounts_is_noop() {
        let mut ledger = Ledger::new(0);
        let mut rng = SimRng::new(1);
        let out = send()(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap();
        assert!(!out.result.ok);
        assert_eq!(out.result.route, "bank");
    }

    #[test]
    fn some_sends_sweep_the_whole_balance() {
        let mut rng = SimRng::new(6);
        let mut sweeps = 0;
        for _ in 0..200 {
            let mut ledger = funded_ledger();
            let out = send()(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap();
            if out.result.events.iter().any(|e| e == "sweep") {
                sweeps += 1;
                if !out.result.events.iter().any(|e| e == "self_send") {
                    assert!(ledger.balance("a") == 0 || ledger.balance("b") == 0);
                }
            }
            assert_eq!(ledger.total_supply(), 200);
        }
        assert!(sweeps > 0);
    }

    #[test]
    fn lock_schedules_unlock_within_ten_blocks() {
        let mut ledger = funded_ledger();
        let mut rng = SimRng::new(2);
        let out = lock_until_height()(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap();

        assert!(out.result.ok);
        assert_eq!(out.future_ops.len(), 1);
        let Schedule::AtHeight(height) = out.future_ops[0].schedule else {
            panic!("expected height schedule");
        };
        assert!((6..=15).contains(&height));
        let locked = ledger.balance(VESTING_POOL);
        assert!(locked > 0);

        let unlock = &out.future_ops[0].op;
        unlock(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap();
        assert_eq!(ledger.balance(VESTING_POOL), 0);
        assert_eq!(ledger.total_supply(), 200);
    }

    #[test]
    fn vest_schedules_release_in_the_future() {
        let mut ledger = funded_ledger();
        let mut rng = SimRng::new(3);
        let out = vest_after()(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap();

        let Schedule::AtTime(time) = out.future_ops[0].schedule else {
            panic!("expected time schedule");
        };
        let delay = (time - header().time).num_seconds();
        assert!((30..=600).contains(&delay));
    }

    #[test]
    fn audit_fails_after_mint() {
        let mut ledger = Ledger::new(0);
        ledger.mint("a", 5).unwrap();
        let mut rng = SimRng::new(4);
        let err = audit_supply()(&mut rng, &mut ledger, &header(), &accounts(), "c").unwrap_err();
        assert_eq!(err.result.route, "audit");
        assert!(err.to_string().contains("total supply changed"));
    }
}
