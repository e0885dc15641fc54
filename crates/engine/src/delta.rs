//! Signed adjustments derived from ledger mutations.
//!
//! | kind    | create          | delete          | update (d = new - old) |
//! |---------|-----------------|-----------------|------------------------|
//! | income  | balance += amt  | balance -= amt  | balance += d           |
//! | expense | balance -= amt  | balance += amt  | balance -= d           |
//! | budget  | budget  += amt  | budget  -= amt  | budget  += d           |

use crate::{AggregateField, EntryKind, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delta {
    pub field: AggregateField,
    pub amount: Money,
}

impl Delta {
    /// Field and sign an entry of `kind` contributes to its owner's totals.
    fn contribution(kind: EntryKind, amount: Money) -> Self {
        match kind {
            EntryKind::Income => Self {
                field: AggregateField::TotalBalance,
                amount,
            },
            EntryKind::Expense => Self {
                field: AggregateField::TotalBalance,
                amount: -amount,
            },
            EntryKind::Budget => Self {
                field: AggregateField::TotalBudget,
                amount,
            },
        }
    }

    pub fn on_create(kind: EntryKind, amount: Money) -> Self {
        Self::contribution(kind, amount)
    }

    pub fn on_delete(kind: EntryKind, amount: Money) -> Self {
        Self::contribution(kind, -amount)
    }

    /// Returns `None` when the amount did not change, so no aggregate write is
    /// needed.
    pub fn on_update(kind: EntryKind, old: Money, new: Money) -> Option<Self> {
        if old == new {
            return None;
        }
        let difference = Money::from_minor(new.minor() - old.minor());
        Some(Self::contribution(kind, difference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn create_follows_sign_table() {
        assert_eq!(
            Delta::on_create(EntryKind::Income, m(200)),
            Delta {
                field: AggregateField::TotalBalance,
                amount: m(200)
            }
        );
        assert_eq!(
            Delta::on_create(EntryKind::Expense, m(50)),
            Delta {
                field: AggregateField::TotalBalance,
                amount: m(-50)
            }
        );
        assert_eq!(
            Delta::on_create(EntryKind::Budget, m(300)),
            Delta {
                field: AggregateField::TotalBudget,
                amount: m(300)
            }
        );
    }

    #[test]
    fn delete_reverts_create() {
        for kind in [EntryKind::Income, EntryKind::Expense, EntryKind::Budget] {
            let create = Delta::on_create(kind, m(123));
            let delete = Delta::on_delete(kind, m(123));
            assert_eq!(create.field, delete.field);
            assert_eq!(create.amount, -delete.amount);
        }
    }

    #[test]
    fn expense_update_applies_negated_difference() {
        // 50 -> 30 frees 20 of balance.
        let delta = Delta::on_update(EntryKind::Expense, m(50), m(30)).unwrap();
        assert_eq!(delta.field, AggregateField::TotalBalance);
        assert_eq!(delta.amount, m(20));

        let delta = Delta::on_update(EntryKind::Income, m(50), m(30)).unwrap();
        assert_eq!(delta.amount, m(-20));

        let delta = Delta::on_update(EntryKind::Budget, m(100), m(150)).unwrap();
        assert_eq!(delta.field, AggregateField::TotalBudget);
        assert_eq!(delta.amount, m(50));
    }

    #[test]
    fn unchanged_amount_yields_no_delta() {
        assert_eq!(Delta::on_update(EntryKind::Income, m(10), m(10)), None);
    }
}
