//! # Customer Credit Ledger
//!
//! Each customer owns an append-only log of credit and payment entries.
//! The cached `current_balance` on the customer row always equals the
//! replay of that log, because both are written in the same transaction
//! under a version check.
//!
//! ```text
//!   seq  type     amount  before  after
//!   1    credit   5.00    0.00    5.00
//!   2    payment  3.00    5.00    2.00   ◄── before[n] == after[n-1]
//!   3    payment  4.00    2.00    0.00   ◄── overpayment clamps at zero
//!   4    credit   6.00    0.00    6.00       (credit sale)
//!   5    reversal 6.00    6.00    0.00   ◄── that sale cancelled
//! ```
//!
//! A reversal lowers the balance like a payment, but no cash changes hands,
//! so reports never count it as money received.

use chrono::Utc;
use tracing::{debug, info, warn};

use tillbook_core::validation::{
    normalize_name, validate_amount, validate_customer_name, validate_description,
    validate_non_negative, validate_phone,
};
use tillbook_core::{
    new_id, replay_credit_log, BalanceAudit, CoreError, CreditEntryType, CreditItem,
    CreditTransaction, Customer, LineRequest, Money, PaymentType, Sale, ValidationError,
};
use tillbook_db::{Database, DbError, ReversalOutcome};

use crate::error::{LedgerError, LedgerResult};
use crate::sales::{already_cancelled, validate_lines, SaleRecorder};

const REGISTER_HINT: &str = "customer <name> <phone>";

/// Customers and their running credit balances.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    db: Database,
    sales: SaleRecorder,
    max_retries: u32,
}

impl CreditLedger {
    pub fn new(db: Database, sales: SaleRecorder, max_retries: u32) -> Self {
        CreditLedger {
            db,
            sales,
            max_retries: max_retries.max(1),
        }
    }

    /// Registers a customer. Phone numbers are unique per shop.
    pub async fn register(
        &self,
        shop_id: &str,
        name: &str,
        phone: &str,
        email: Option<&str>,
    ) -> LedgerResult<Customer> {
        let name = normalize_name(name);
        validate_customer_name(&name)?;
        let phone = phone.trim();
        validate_phone(phone)?;

        let customer = Customer {
            id: new_id(),
            shop_id: shop_id.to_string(),
            name,
            phone: phone.to_string(),
            email: email.map(str::to_string),
            total_spent_cents: 0,
            total_visits: 0,
            loyalty_points: 0,
            current_balance_cents: 0,
            credit_limit_cents: 0,
            last_purchase_at: None,
            version: 0,
            created_at: Utc::now(),
        };

        self.db.customers().insert(&customer).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => LedgerError::from(ValidationError::Duplicate {
                field: "phone".to_string(),
                value: customer.phone.clone(),
            }),
            other => other.into(),
        })?;

        info!(shop_id, customer = %customer.name, "Customer registered");
        Ok(customer)
    }

    /// Finds a customer by exact phone number, or by case-insensitive name
    /// when that name is unique.
    pub async fn resolve(&self, shop_id: &str, reference: &str) -> LedgerResult<Customer> {
        let reference = reference.trim();
        let customers = self.db.customers();

        if validate_phone(reference).is_ok() {
            if let Some(customer) = customers.find_by_phone(shop_id, reference).await? {
                return Ok(customer);
            }
        }

        let mut named = customers.find_by_name(shop_id, &normalize_name(reference)).await?;
        match named.len() {
            0 => Err(CoreError::not_found_with_hint(
                "Customer",
                reference,
                format!("customer {reference} <phone>"),
            )
            .into()),
            1 => Ok(named.swap_remove(0)),
            n => Err(ValidationError::InvalidFormat {
                field: "customer".to_string(),
                reason: format!("{n} customers are called '{reference}', use their phone number"),
            }
            .into()),
        }
    }

    /// All customers, sorted by name.
    pub async fn list(&self, shop_id: &str) -> LedgerResult<Vec<Customer>> {
        Ok(self.db.customers().list(shop_id).await?)
    }

    /// Caps how much the customer may owe. Zero removes the cap.
    pub async fn set_credit_limit(
        &self,
        shop_id: &str,
        customer_id: &str,
        limit: Money,
    ) -> LedgerResult<()> {
        validate_non_negative("credit_limit", limit.cents())?;
        self.db
            .customers()
            .set_credit_limit(shop_id, customer_id, limit.cents())
            .await
            .map_err(|e| match e {
                DbError::NotFound { .. } => {
                    CoreError::not_found_with_hint("Customer", customer_id, REGISTER_HINT).into()
                }
                other => LedgerError::from(other),
            })?;
        info!(shop_id, customer_id, limit = %limit, "Credit limit set");
        Ok(())
    }

    /// Puts `amount` on the customer's account.
    pub async fn add_credit(
        &self,
        shop_id: &str,
        customer_id: &str,
        amount: Money,
        items: &[CreditItem],
        description: &str,
    ) -> LedgerResult<CreditTransaction> {
        validate_amount("amount", amount)?;
        validate_description(description)?;
        let items_json = if items.is_empty() {
            None
        } else {
            Some(serde_json::to_string(items)?)
        };

        let entry = self
            .append(shop_id, customer_id, CreditEntryType::Credit, amount, items_json, description)
            .await?;
        info!(
            shop_id,
            customer_id,
            amount = %amount,
            balance = %Money::from_cents(entry.balance_after_cents),
            "Credit added"
        );
        Ok(entry)
    }

    /// Takes a payment against the account. Paying more than is owed
    /// clears the balance to zero.
    pub async fn record_payment(
        &self,
        shop_id: &str,
        customer_id: &str,
        amount: Money,
        description: &str,
    ) -> LedgerResult<CreditTransaction> {
        validate_amount("amount", amount)?;
        validate_description(description)?;

        let entry = self
            .append(shop_id, customer_id, CreditEntryType::Payment, amount, None, description)
            .await?;
        info!(
            shop_id,
            customer_id,
            amount = %amount,
            balance = %Money::from_cents(entry.balance_after_cents),
            "Payment recorded"
        );
        Ok(entry)
    }

    /// Replays the log from zero and compares it with the cached balance.
    pub async fn audit(&self, shop_id: &str, customer_id: &str) -> LedgerResult<BalanceAudit> {
        let customer = self.customer(shop_id, customer_id).await?;
        let log = self.db.customers().credit_log(shop_id, customer_id).await?;

        let (replayed_cents, chain_break) = match replay_credit_log(&log) {
            Ok(balance) => (Some(balance.cents()), None),
            Err(brk) => (None, Some(brk)),
        };

        let audit = BalanceAudit {
            customer_id: customer.id,
            entries: log.len(),
            cached_cents: customer.current_balance_cents,
            replayed_cents,
            chain_break,
        };
        if !audit.is_consistent() {
            warn!(shop_id, customer_id, ?audit, "Credit log does not match cached balance");
        }
        Ok(audit)
    }

    /// Sells goods on account: a `credit` sale (stock reserved) followed
    /// by a credit entry listing the items.
    ///
    /// If the entry cannot be appended the sale is cancelled again.
    pub async fn credit_sale(
        &self,
        shop_id: &str,
        customer_id: &str,
        lines: &[LineRequest],
    ) -> LedgerResult<(Sale, CreditTransaction)> {
        let customer = self.customer(shop_id, customer_id).await?;
        let total = validate_lines(lines)?;
        check_limit(&customer, total)?;

        let sale = self
            .sales
            .record_sale(shop_id, lines, PaymentType::Credit, Some(customer_id), None)
            .await?;

        let items: Vec<CreditItem> = lines
            .iter()
            .map(|l| CreditItem {
                product_name: l.product_name.clone(),
                quantity: l.quantity,
                price_cents: l.price_cents,
            })
            .collect();
        let description = format!("Sale {}", sale.short_id());

        match self
            .add_credit(shop_id, customer_id, sale.total(), &items, &description)
            .await
        {
            Ok(entry) => Ok((sale, entry)),
            Err(err) => {
                warn!(sale_id = %sale.id, error = %err, "Credit entry failed, cancelling sale");
                if let Err(undo) = self
                    .sales
                    .cancel_resolved(sale.clone(), Some("credit entry failed"))
                    .await
                {
                    warn!(sale_id = %sale.id, error = %undo, "Compensating cancel failed");
                }
                Err(err)
            }
        }
    }

    /// Cancels any sale by id, id prefix or recent-list position and puts
    /// its stock back.
    ///
    /// A sale made on credit also takes its amount off the customer's
    /// balance with a `reversal` entry, written in the same transaction as
    /// the cancelled flag. Payments the customer already made against it
    /// stay as they are; the balance floors at zero.
    pub async fn cancel_sale(
        &self,
        shop_id: &str,
        reference: &str,
        reason: Option<&str>,
    ) -> LedgerResult<(Sale, Option<CreditTransaction>)> {
        if let Some(reason) = reason {
            validate_description(reason)?;
        }

        let sale = self.sales.find_by_id_or_index(shop_id, reference).await?;
        if sale.is_cancelled {
            return Err(already_cancelled(&sale));
        }

        let customer_id = match (sale.payment_type, sale.customer_id.clone()) {
            (PaymentType::Credit, Some(id)) if sale.total_cents > 0 => id,
            _ => return Ok((self.sales.cancel_resolved(sale, reason).await?, None)),
        };

        let description = format!("Cancelled sale {}", sale.short_id());
        for attempt in 1..=self.max_retries {
            let customer = self.customer(shop_id, &customer_id).await?;
            let now = Utc::now();
            let entry =
                next_entry(&customer, CreditEntryType::Reversal, sale.total(), None, &description);

            match self
                .db
                .customers()
                .reverse_credit_sale(&entry, customer.version, &sale.id, reason, now)
                .await
            {
                Ok(ReversalOutcome::Reversed) => {
                    self.sales.release_stock(&sale).await;
                    info!(
                        shop_id,
                        sale_id = %sale.id,
                        customer_id = %customer_id,
                        balance = %Money::from_cents(entry.balance_after_cents),
                        "Credit sale cancelled"
                    );
                    return Ok((sale.into_cancelled(reason, now), Some(entry)));
                }
                Ok(ReversalOutcome::SaleAlreadyCancelled) => return Err(already_cancelled(&sale)),
                Ok(ReversalOutcome::StaleCustomer) => {}
                Err(e) if e.is_unique_violation() => {}
                Err(e) => return Err(e.into()),
            }
            warn!(customer_id = %customer_id, attempt, "Credit reversal lost a race, retrying");
        }

        Err(CoreError::ConcurrentModification {
            entity: "Customer",
            id: customer_id,
        }
        .into())
    }

    async fn customer(&self, shop_id: &str, customer_id: &str) -> LedgerResult<Customer> {
        self.db
            .customers()
            .get(shop_id, customer_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found_with_hint("Customer", customer_id, REGISTER_HINT).into()
            })
    }

    async fn append(
        &self,
        shop_id: &str,
        customer_id: &str,
        entry_type: CreditEntryType,
        amount: Money,
        items_json: Option<String>,
        description: &str,
    ) -> LedgerResult<CreditTransaction> {
        for attempt in 1..=self.max_retries {
            let customer = self.customer(shop_id, customer_id).await?;
            if entry_type == CreditEntryType::Credit {
                check_limit(&customer, amount)?;
            }

            let entry = next_entry(&customer, entry_type, amount, items_json.clone(), description);

            match self.db.customers().append_credit(&entry, customer.version).await {
                Ok(true) => {
                    debug!(customer_id, seq = entry.seq, "Credit entry appended");
                    return Ok(entry);
                }
                Ok(false) => {}
                // Same seq taken between our read and insert
                Err(e) if e.is_unique_violation() => {}
                Err(e) => return Err(e.into()),
            }
            warn!(customer_id, attempt, "Credit append lost a race, retrying");
        }

        Err(CoreError::ConcurrentModification {
            entity: "Customer",
            id: customer_id.to_string(),
        }
        .into())
    }
}

/// The entry that would follow the customer's current log.
fn next_entry(
    customer: &Customer,
    entry_type: CreditEntryType,
    amount: Money,
    items_json: Option<String>,
    description: &str,
) -> CreditTransaction {
    let before = customer.balance();
    CreditTransaction {
        id: new_id(),
        shop_id: customer.shop_id.clone(),
        customer_id: customer.id.clone(),
        seq: customer.version + 1,
        entry_type,
        amount_cents: amount.cents(),
        items_json,
        description: description.to_string(),
        date: Utc::now(),
        balance_before_cents: before.cents(),
        balance_after_cents: entry_type.apply(before, amount).cents(),
    }
}

fn check_limit(customer: &Customer, amount: Money) -> LedgerResult<()> {
    if let Some(limit) = customer.credit_limit() {
        if customer.balance() + amount > limit {
            return Err(CoreError::CreditLimitExceeded {
                customer: customer.name.clone(),
                amount,
                balance: customer.balance(),
                limit,
            }
            .into());
        }
    }
    Ok(())
}
