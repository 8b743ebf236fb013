//! In-memory token balances

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use alloy_primitives::U256;
use ibc_eureka_utils::ensure;

use crate::error::TransferError;

#[derive(Debug, Default)]
struct Ledger {
    balances: BTreeMap<(String, String), U256>,
    supply: BTreeMap<String, U256>,
}

/// Balances per `(account, denom)` and total supply per denom.
///
/// Clones share the same ledger. Every operation checks before it writes, so a failed
/// operation leaves the ledger unchanged.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    ledger: Arc<RwLock<Ledger>>,
}

impl Bank {
    /// Balance of `account` in `denom`
    #[must_use]
    pub fn balance(&self, account: &str, denom: &str) -> U256 {
        self.read()
            .balances
            .get(&(account.to_string(), denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Every non-zero balance of `account`, by denom
    #[must_use]
    pub fn balances(&self, account: &str) -> BTreeMap<String, U256> {
        self.read()
            .balances
            .iter()
            .filter(|((holder, _), _)| holder == account)
            .map(|((_, denom), amount)| (denom.clone(), *amount))
            .collect()
    }

    /// Total amount of `denom` in existence
    #[must_use]
    pub fn supply(&self, denom: &str) -> U256 {
        self.read().supply.get(denom).copied().unwrap_or_default()
    }

    /// Creates `amount` of `denom` in `account`
    ///
    /// # Errors
    /// Returns [`TransferError::InvalidAmount`] for zero or [`TransferError::BalanceOverflow`].
    pub fn mint(&self, account: &str, denom: &str, amount: U256) -> Result<(), TransferError> {
        ensure!(!amount.is_zero(), TransferError::InvalidAmount(amount));
        let mut ledger = self.write();
        let key = (account.to_string(), denom.to_string());

        let overflow = || TransferError::BalanceOverflow {
            denom: denom.to_string(),
        };
        let supply = ledger
            .supply
            .get(denom)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or_else(overflow)?;
        // bounded by the supply
        let balance = ledger.balances.get(&key).copied().unwrap_or_default() + amount;

        ledger.supply.insert(denom.to_string(), supply);
        ledger.balances.insert(key, balance);
        drop(ledger);
        tracing::debug!(account, denom, %amount, "minted");
        Ok(())
    }

    /// Destroys `amount` of `denom` held by `account`
    ///
    /// # Errors
    /// Returns [`TransferError::InvalidAmount`] for zero or
    /// [`TransferError::InsufficientFunds`].
    pub fn burn(&self, account: &str, denom: &str, amount: U256) -> Result<(), TransferError> {
        ensure!(!amount.is_zero(), TransferError::InvalidAmount(amount));
        let mut ledger = self.write();
        let key = (account.to_string(), denom.to_string());

        let balance = debit(&ledger, &key, amount)?;
        let supply = ledger.supply.get(denom).copied().unwrap_or_default() - amount;

        set_balance(&mut ledger, key, balance);
        if supply.is_zero() {
            ledger.supply.remove(denom);
        } else {
            ledger.supply.insert(denom.to_string(), supply);
        }
        drop(ledger);
        tracing::debug!(account, denom, %amount, "burned");
        Ok(())
    }

    /// Moves `amount` of `denom` from `from` to `to`
    ///
    /// # Errors
    /// Returns [`TransferError::InvalidAmount`] for zero or
    /// [`TransferError::InsufficientFunds`].
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        denom: &str,
        amount: U256,
    ) -> Result<(), TransferError> {
        ensure!(!amount.is_zero(), TransferError::InvalidAmount(amount));
        let mut ledger = self.write();
        let from_key = (from.to_string(), denom.to_string());
        let to_key = (to.to_string(), denom.to_string());

        let from_balance = debit(&ledger, &from_key, amount)?;
        set_balance(&mut ledger, from_key, from_balance);
        // bounded by the supply
        let to_balance = ledger.balances.get(&to_key).copied().unwrap_or_default() + amount;
        ledger.balances.insert(to_key, to_balance);
        drop(ledger);
        tracing::debug!(from, to, denom, %amount, "transferred");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn debit(ledger: &Ledger, key: &(String, String), amount: U256) -> Result<U256, TransferError> {
    let balance = ledger.balances.get(key).copied().unwrap_or_default();
    balance
        .checked_sub(amount)
        .ok_or_else(|| TransferError::InsufficientFunds {
            account: key.0.clone(),
            denom: key.1.clone(),
            balance,
            amount,
        })
}

fn set_balance(ledger: &mut Ledger, key: (String, String), balance: U256) {
    if balance.is_zero() {
        ledger.balances.remove(&key);
    } else {
        ledger.balances.insert(key, balance);
    }
}
