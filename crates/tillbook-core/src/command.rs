//! # Command Interpreter
//!
//! Turns one line of shop-keeper text into a typed [`Intent`].
//!
//! ## Dispatch
//! ```text
//! "sell 2 bread 3 milk 1.20 to john"
//!   │
//!   ▼  split_whitespace
//! ["sell", "2", "bread", "3", "milk", "1.20", "to", "john"]
//!   │
//!   ▼  verb table (one parser per verb, no prefix ordering)
//! parse_sell
//!   │
//!   ├── item list:  2 × bread          (catalog price)
//!   │               3 × milk @ $1.20   (override)
//!   └── customer:   "john"
//!   │
//!   ▼
//! Intent::Sell { items, customer: Some("john") }
//! ```
//!
//! ## Item Lists
//! `(int quantity, name tokens…, optional price)` repeated. The first token
//! after a quantity always belongs to the name; further name tokens run
//! until the next numeric token. A numeric token after a name is a price
//! when it contains a decimal point (or `$`), when it is the last token, or
//! when the token after it is numeric too. Otherwise it starts the next item.
//!
//! The interpreter is pure: it reads the catalog but never writes, and it
//! never panics on malformed input.

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ExpenseCategory, OrderStatus, OrderType, PaymentMethod, Product};
use crate::validation::normalize_name;

// =============================================================================
// Catalog
// =============================================================================

/// Read-only product lookup used while interpreting.
pub trait Catalog {
    /// Finds an active product by case-insensitive exact name.
    fn find_by_name(&self, name: &str) -> Option<&Product>;
}

impl Catalog for [Product] {
    fn find_by_name(&self, name: &str) -> Option<&Product> {
        let name = normalize_name(name);
        self.iter()
            .find(|p| p.active && p.name.eq_ignore_ascii_case(&name))
    }
}

impl Catalog for Vec<Product> {
    fn find_by_name(&self, name: &str) -> Option<&Product> {
        self.as_slice().find_by_name(name)
    }
}

// =============================================================================
// Intents
// =============================================================================

/// A product resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMatch {
    pub id: String,
    pub name: String,
}

impl From<&Product> for ProductMatch {
    fn from(p: &Product) -> Self {
        ProductMatch {
            id: p.id.clone(),
            name: p.name.clone(),
        }
    }
}

/// One requested line: a resolved product, a quantity and an optional
/// price override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub product: ProductMatch,
    pub quantity: i64,
    pub price: Option<Money>,
}

/// How a `stock` command changes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    Add,
    Remove,
    Set,
}

/// A single-field product edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductEdit {
    Name(String),
    Price(Money),
    Stock(i64),
    Threshold(i64),
    Cost(Money),
}

/// A month named in a report command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpec {
    /// `None` means the current year.
    pub year: Option<i32>,
    pub month: u32,
}

/// Which report a command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly(Option<MonthSpec>),
    BestSellers,
}

/// Everything the ledger can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    // Inventory
    AddProduct {
        name: String,
        price: Money,
        stock: Option<i64>,
        threshold: Option<i64>,
        cost: Option<Money>,
    },
    ListStock,
    ChangeStock {
        product: ProductMatch,
        change: StockChange,
        quantity: i64,
    },
    LowStock,
    SetPrice {
        product: ProductMatch,
        price: Money,
    },
    SetThreshold {
        product: ProductMatch,
        threshold: i64,
    },
    EditProduct {
        product: ProductMatch,
        edit: ProductEdit,
    },
    DeleteProduct {
        product: ProductMatch,
        confirmed: bool,
    },

    // Sales
    Sell {
        items: Vec<ItemRequest>,
        customer: Option<String>,
    },
    RecentSales,
    CancelSale {
        reference: String,
        reason: Option<String>,
    },

    // Customers & credit
    RegisterCustomer {
        name: String,
        phone: String,
    },
    ListCustomers,
    Balance {
        customer: String,
    },
    CreditAmount {
        customer: String,
        amount: Money,
    },
    CreditItems {
        customer: String,
        items: Vec<ItemRequest>,
    },
    Payment {
        customer: String,
        amount: Money,
    },
    AuditCredit {
        customer: String,
    },

    // Orders
    PlaceOrder {
        customer: String,
        items: Vec<ItemRequest>,
        order_type: OrderType,
    },
    ListOrders,
    MoveOrder {
        reference: String,
        to: OrderStatus,
    },

    // Lay-byes
    CreateLayBye {
        customer: String,
        items: Vec<ItemRequest>,
    },
    LayByePayment {
        reference: String,
        amount: Money,
        method: PaymentMethod,
    },
    CancelLayBye {
        reference: String,
    },
    ListLayByes,

    // Expenses
    RecordExpense {
        amount: Money,
        category: ExpenseCategory,
        description: String,
        method: PaymentMethod,
        receipt: Option<String>,
    },
    ListExpenses,

    // Reports
    Report {
        period: ReportPeriod,
        export: bool,
    },
    CashFlow {
        start: NaiveDate,
        end: NaiveDate,
    },
    Help,
}

impl Intent {
    /// Short name used in tracing fields.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::AddProduct { .. } => "add_product",
            Intent::ListStock => "list_stock",
            Intent::ChangeStock { .. } => "change_stock",
            Intent::LowStock => "low_stock",
            Intent::SetPrice { .. } => "set_price",
            Intent::SetThreshold { .. } => "set_threshold",
            Intent::EditProduct { .. } => "edit_product",
            Intent::DeleteProduct { .. } => "delete_product",
            Intent::Sell { .. } => "sell",
            Intent::RecentSales => "recent_sales",
            Intent::CancelSale { .. } => "cancel_sale",
            Intent::RegisterCustomer { .. } => "register_customer",
            Intent::ListCustomers => "list_customers",
            Intent::Balance { .. } => "balance",
            Intent::CreditAmount { .. } => "credit_amount",
            Intent::CreditItems { .. } => "credit_items",
            Intent::Payment { .. } => "payment",
            Intent::AuditCredit { .. } => "audit_credit",
            Intent::PlaceOrder { .. } => "place_order",
            Intent::ListOrders => "list_orders",
            Intent::MoveOrder { .. } => "move_order",
            Intent::CreateLayBye { .. } => "create_laybye",
            Intent::LayByePayment { .. } => "laybye_payment",
            Intent::CancelLayBye { .. } => "cancel_laybye",
            Intent::ListLayByes => "list_laybyes",
            Intent::RecordExpense { .. } => "record_expense",
            Intent::ListExpenses => "list_expenses",
            Intent::Report { .. } => "report",
            Intent::CashFlow { .. } => "cash_flow",
            Intent::Help => "help",
        }
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Why a line of text could not be turned into an [`Intent`].
///
/// Every message is meant to be shown to the user as-is.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Empty message. Send 'help' to see the commands.")]
    Empty,

    #[error("Unknown command '{0}'. Send 'help' to see the commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Expected a quantity, found '{found}'")]
    ExpectedQuantity { found: String },

    #[error("Invalid {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Product '{name}' not found. Add it with: add {name} <price>")]
    UnknownProduct { name: String },

    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("{0}")]
    Invalid(#[from] ValidationError),
}

// =============================================================================
// Usage strings
// =============================================================================

const USAGE_SELL: &str = "sell <qty> <product> [price] ... [to <customer>]";
const USAGE_ADD: &str = "add <product> <price> [stock <n>] [threshold <n>] [cost <n>]";
const USAGE_STOCK: &str = "stock [+|-]<product> <n>";
const USAGE_PRICE: &str = "price <product> <amount>";
const USAGE_THRESHOLD: &str = "threshold <product> <n>";
const USAGE_EDIT: &str = "edit <product> <name|price|stock|threshold|cost> <value>";
const USAGE_DELETE: &str = "delete <product> [confirm]";
const USAGE_CANCEL: &str = "cancel [sale] <id|number> [reason]";
const USAGE_CUSTOMER: &str = "customer <name> <phone>";
const USAGE_BALANCE: &str = "balance <customer>";
const USAGE_CREDIT: &str = "credit <customer> <amount> | credit <customer> <qty> <product> ...";
const USAGE_PAYMENT: &str = "payment <customer> <amount>";
const USAGE_AUDIT: &str = "audit <customer>";
const USAGE_ORDER: &str = "order <customer> <qty> <product> ... [delivery]";
const USAGE_MOVE_ORDER: &str = "confirm|ready|complete|cancel order <id|number>";
const USAGE_LAYBYE: &str = "laybye <customer> <qty> <product> ...";
const USAGE_LAYBYE_PAY: &str = "laybye pay <id|number> <amount> [method]";
const USAGE_LAYBYE_CANCEL: &str = "laybye cancel <id|number>";
const USAGE_EXPENSE: &str =
    "expense <amount> <category> <description> [method <m>] [receipt <no>]";
const USAGE_EXPORT: &str = "export <daily|weekly|monthly|best> [month]";
const USAGE_CASHFLOW: &str = "cashflow <YYYY-MM-DD> <YYYY-MM-DD>";

/// Text sent back for `help`.
pub const HELP_TEXT: &str = "\
Inventory:
  add <product> <price> [stock <n>] [threshold <n>] [cost <n>]
  stock | stock [+|-]<product> <n> | low stock
  price <product> <n> | threshold <product> <n>
  edit <product> <name|price|stock|threshold|cost> <value>
  delete <product> [confirm]
Sales:
  sell <qty> <product> [price] ... [to <customer>]
  sales | cancel [sale] <id|number> [reason]
Customers:
  customer <name> <phone> | customers | balance <customer>
  credit <customer> <amount> | credit <customer> <qty> <product> ...
  payment <customer> <amount> | audit <customer>
Orders:
  order <customer> <qty> <product> ... [delivery] | orders
  confirm|ready|complete|cancel order <id|number>
Lay-byes:
  laybye <customer> <qty> <product> ... | laybyes
  laybye pay <id|number> <amount> [method] | laybye cancel <id|number>
Expenses:
  expense <amount> <category> <description> [method <m>] [receipt <no>]
  expenses
Reports:
  daily | weekly | monthly [month] | best
  export <daily|weekly|monthly|best> [month]
  cashflow <YYYY-MM-DD> <YYYY-MM-DD>";

// =============================================================================
// Entry Point
// =============================================================================

/// Interprets one line of text against the shop's active catalog.
///
/// ## Example
/// ```rust
/// use tillbook_core::command::{interpret, Intent};
/// use tillbook_core::Product;
///
/// let catalog: Vec<Product> = Vec::new();
/// assert_eq!(interpret("help", &catalog).unwrap(), Intent::Help);
/// assert!(interpret("sell 2 unicorn", &catalog).is_err());
/// ```
pub fn interpret<C: Catalog + ?Sized>(raw: &str, catalog: &C) -> Result<Intent, ParseError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some((verb, rest)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };

    match verb.to_lowercase().as_str() {
        "sell" => parse_sell(rest, catalog),
        "add" => parse_add(rest),
        "stock" => parse_stock(rest, catalog),
        "lowstock" if rest.is_empty() => Ok(Intent::LowStock),
        "low" if is_words(rest, &["stock"]) => Ok(Intent::LowStock),
        "price" => parse_set_price(rest, catalog),
        "threshold" => parse_set_threshold(rest, catalog),
        "edit" => parse_edit(rest, catalog),
        "delete" => parse_delete(rest, catalog),
        "sales" if rest.is_empty() => Ok(Intent::RecentSales),
        "cancel" => parse_cancel(rest),
        "customer" => parse_customer(rest),
        "customers" if rest.is_empty() => Ok(Intent::ListCustomers),
        "balance" => parse_customer_only(rest, USAGE_BALANCE)
            .map(|customer| Intent::Balance { customer }),
        "credit" => parse_credit(rest, catalog),
        "payment" | "pay" => parse_payment(rest),
        "audit" => parse_customer_only(rest, USAGE_AUDIT)
            .map(|customer| Intent::AuditCredit { customer }),
        "order" => parse_order(rest, catalog),
        "orders" if rest.is_empty() => Ok(Intent::ListOrders),
        "confirm" => parse_move_order(rest, OrderStatus::Confirmed),
        "ready" => parse_move_order(rest, OrderStatus::Ready),
        "complete" => parse_move_order(rest, OrderStatus::Completed),
        "laybye" => parse_laybye(rest, catalog),
        "laybyes" if rest.is_empty() => Ok(Intent::ListLayByes),
        "expense" => parse_expense(rest),
        "expenses" if rest.is_empty() => Ok(Intent::ListExpenses),
        "export" | "pdf" => parse_export(rest),
        "daily" | "weekly" | "monthly" | "best" | "bestselling" | "bestsellers" => {
            parse_report(&tokens, false)
        }
        "cashflow" => parse_cash_flow(rest),
        "help" => Ok(Intent::Help),
        _ => Err(ParseError::UnknownCommand(raw.trim().to_string())),
    }
}

// =============================================================================
// Token helpers
// =============================================================================

fn is_words(tokens: &[&str], words: &[&str]) -> bool {
    tokens.len() == words.len()
        && tokens
            .iter()
            .zip(words)
            .all(|(t, w)| t.eq_ignore_ascii_case(w))
}

fn is_integer(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_numeric(token: &str) -> bool {
    Money::parse(token).is_some()
}

fn parse_int(field: &'static str, token: &str) -> Result<i64, ParseError> {
    if !is_integer(token) {
        return Err(ParseError::InvalidNumber {
            field,
            value: token.to_string(),
        });
    }
    token.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: token.to_string(),
    })
}

fn parse_money(field: &'static str, token: &str) -> Result<Money, ParseError> {
    Money::parse(token).ok_or_else(|| ParseError::InvalidNumber {
        field,
        value: token.to_string(),
    })
}

fn join(tokens: &[&str]) -> String {
    tokens.join(" ")
}

fn lookup<C: Catalog + ?Sized>(catalog: &C, name: &str) -> Result<ProductMatch, ParseError> {
    catalog
        .find_by_name(name)
        .map(ProductMatch::from)
        .ok_or_else(|| ParseError::UnknownProduct {
            name: normalize_name(name),
        })
}

/// Splits `<name tokens…> <number>`, resolving the name in the catalog.
fn product_and_last<'a, C: Catalog + ?Sized>(
    tokens: &[&'a str],
    catalog: &C,
    usage: &'static str,
) -> Result<(ProductMatch, &'a str), ParseError> {
    let Some((last, name)) = tokens.split_last() else {
        return Err(ParseError::Usage(usage));
    };
    if name.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok((lookup(catalog, &join(name))?, last))
}

/// Leading non-numeric tokens name a customer; the rest is returned.
fn split_customer<'a, 'b>(tokens: &'b [&'a str]) -> (String, &'b [&'a str]) {
    let cut = tokens
        .iter()
        .position(|t| is_numeric(t))
        .unwrap_or(tokens.len());
    (join(&tokens[..cut]), &tokens[cut..])
}

// =============================================================================
// Item lists
// =============================================================================

/// Parses `(qty name… [price])+` against the catalog.
pub fn parse_items<C: Catalog + ?Sized>(
    tokens: &[&str],
    catalog: &C,
) -> Result<Vec<ItemRequest>, ParseError> {
    let mut items = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let qty_token = tokens[i];
        if !is_integer(qty_token) {
            return Err(ParseError::ExpectedQuantity {
                found: qty_token.to_string(),
            });
        }
        let quantity = parse_int("quantity", qty_token)?;
        i += 1;

        let Some(first) = tokens.get(i) else {
            return Err(ParseError::Usage("<qty> <product> [price]"));
        };
        let mut name = vec![*first];
        i += 1;
        while i < tokens.len() && !is_numeric(tokens[i]) {
            name.push(tokens[i]);
            i += 1;
        }

        let mut price = None;
        if let Some(next) = tokens.get(i) {
            let is_last = i + 1 == tokens.len();
            let followed_by_number = tokens.get(i + 1).is_some_and(|t| is_numeric(t));
            let looks_like_price = next.contains('.') || next.starts_with('$');
            if looks_like_price || is_last || followed_by_number {
                price = Some(parse_money("price", next)?);
                i += 1;
            }
        }

        items.push(ItemRequest {
            product: lookup(catalog, &join(&name))?,
            quantity,
            price,
        });
    }

    if items.is_empty() {
        return Err(ParseError::Usage("<qty> <product> [price]"));
    }
    Ok(items)
}

// =============================================================================
// Per-verb parsers
// =============================================================================

fn parse_sell<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    let (item_tokens, customer) = match rest.iter().rposition(|t| t.eq_ignore_ascii_case("to")) {
        Some(at) if at + 1 < rest.len() && at > 0 => (&rest[..at], Some(join(&rest[at + 1..]))),
        _ => (rest, None),
    };
    if item_tokens.is_empty() {
        return Err(ParseError::Usage(USAGE_SELL));
    }
    Ok(Intent::Sell {
        items: parse_items(item_tokens, catalog)?,
        customer,
    })
}

fn parse_add(rest: &[&str]) -> Result<Intent, ParseError> {
    let price_at = rest
        .iter()
        .position(|t| is_numeric(t))
        .ok_or(ParseError::Usage(USAGE_ADD))?;
    if price_at == 0 {
        return Err(ParseError::Usage(USAGE_ADD));
    }
    let name = join(&rest[..price_at]);
    let price = parse_money("price", rest[price_at])?;

    let modifiers = &rest[price_at + 1..];
    for pair in modifiers.chunks(2) {
        let [keyword, _value] = pair else {
            return Err(ParseError::Usage(USAGE_ADD));
        };
        let known = ["stock", "threshold", "cost"]
            .iter()
            .any(|k| keyword.eq_ignore_ascii_case(k));
        if !known {
            return Err(ParseError::Usage(USAGE_ADD));
        }
    }

    Ok(Intent::AddProduct {
        name,
        price,
        stock: modifier(modifiers, "stock")
            .map(|t| parse_int("stock", t))
            .transpose()?,
        threshold: modifier(modifiers, "threshold")
            .map(|t| parse_int("threshold", t))
            .transpose()?,
        cost: modifier(modifiers, "cost")
            .map(|t| parse_money("cost", t))
            .transpose()?,
    })
}

/// Value following `keyword` in a modifier list.
fn modifier<'a>(tokens: &[&'a str], keyword: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case(keyword))
        .and_then(|at| tokens.get(at + 1).copied())
}

fn parse_stock<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    if rest.is_empty() {
        return Ok(Intent::ListStock);
    }
    if rest.len() < 2 {
        return Err(ParseError::Usage(USAGE_STOCK));
    }

    let first = rest[0];
    let (change, stripped) = if let Some(s) = first.strip_prefix('+') {
        (StockChange::Add, s)
    } else if let Some(s) = first.strip_prefix('-') {
        (StockChange::Remove, s)
    } else {
        (StockChange::Set, first)
    };

    let mut name_tokens: Vec<&str> = Vec::with_capacity(rest.len());
    if !stripped.is_empty() {
        name_tokens.push(stripped);
    }
    name_tokens.extend_from_slice(&rest[1..]);

    let (product, qty) = product_and_last(&name_tokens, catalog, USAGE_STOCK)?;
    Ok(Intent::ChangeStock {
        product,
        change,
        quantity: parse_int("quantity", qty)?,
    })
}

fn parse_set_price<C: Catalog + ?Sized>(
    rest: &[&str],
    catalog: &C,
) -> Result<Intent, ParseError> {
    let (product, value) = product_and_last(rest, catalog, USAGE_PRICE)?;
    Ok(Intent::SetPrice {
        product,
        price: parse_money("price", value)?,
    })
}

fn parse_set_threshold<C: Catalog + ?Sized>(
    rest: &[&str],
    catalog: &C,
) -> Result<Intent, ParseError> {
    let (product, value) = product_and_last(rest, catalog, USAGE_THRESHOLD)?;
    Ok(Intent::SetThreshold {
        product,
        threshold: parse_int("threshold", value)?,
    })
}

fn parse_edit<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    const FIELDS: [&str; 5] = ["name", "price", "stock", "threshold", "cost"];

    // The first field keyword whose preceding tokens name a product wins,
    // so products called e.g. "price tag" still resolve.
    for at in 1..rest.len() {
        let field = rest[at].to_lowercase();
        if !FIELDS.contains(&field.as_str()) {
            continue;
        }
        let Some(product) = catalog.find_by_name(&join(&rest[..at])) else {
            continue;
        };
        let value = &rest[at + 1..];
        if value.is_empty() {
            return Err(ParseError::Usage(USAGE_EDIT));
        }
        let single = match value {
            [one] => Ok(*one),
            _ => Err(ParseError::Usage(USAGE_EDIT)),
        };
        let edit = match field.as_str() {
            "name" => ProductEdit::Name(join(value)),
            "price" => ProductEdit::Price(parse_money("price", single?)?),
            "stock" => ProductEdit::Stock(parse_int("stock", single?)?),
            "threshold" => ProductEdit::Threshold(parse_int("threshold", single?)?),
            _ => ProductEdit::Cost(parse_money("cost", single?)?),
        };
        return Ok(Intent::EditProduct {
            product: product.into(),
            edit,
        });
    }

    match rest.iter().position(|t| FIELDS.contains(&t.to_lowercase().as_str())) {
        Some(at) if at > 0 => Err(ParseError::UnknownProduct {
            name: join(&rest[..at]),
        }),
        _ => Err(ParseError::Usage(USAGE_EDIT)),
    }
}

fn parse_delete<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    let (name, confirmed) = match rest.split_last() {
        Some((last, name)) if last.eq_ignore_ascii_case("confirm") => (name, true),
        _ => (rest, false),
    };
    if name.is_empty() {
        return Err(ParseError::Usage(USAGE_DELETE));
    }
    Ok(Intent::DeleteProduct {
        product: lookup(catalog, &join(name))?,
        confirmed,
    })
}

fn parse_cancel(rest: &[&str]) -> Result<Intent, ParseError> {
    let Some((first, tail)) = rest.split_first() else {
        return Err(ParseError::Usage(USAGE_CANCEL));
    };

    match first.to_lowercase().as_str() {
        "order" => parse_move_order(rest, OrderStatus::Cancelled),
        "laybye" => match tail {
            [reference] => Ok(Intent::CancelLayBye {
                reference: reference.to_string(),
            }),
            _ => Err(ParseError::Usage(USAGE_LAYBYE_CANCEL)),
        },
        "sale" => parse_cancel_sale(tail),
        _ => parse_cancel_sale(rest),
    }
}

fn parse_cancel_sale(tokens: &[&str]) -> Result<Intent, ParseError> {
    let Some((reference, reason)) = tokens.split_first() else {
        return Err(ParseError::Usage(USAGE_CANCEL));
    };
    Ok(Intent::CancelSale {
        reference: reference.to_string(),
        reason: (!reason.is_empty()).then(|| join(reason)),
    })
}

fn parse_customer(rest: &[&str]) -> Result<Intent, ParseError> {
    match rest.split_last() {
        Some((phone, name)) if !name.is_empty() => Ok(Intent::RegisterCustomer {
            name: join(name),
            phone: phone.to_string(),
        }),
        _ => Err(ParseError::Usage(USAGE_CUSTOMER)),
    }
}

fn parse_customer_only(rest: &[&str], usage: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok(join(rest))
}

fn parse_credit<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    let (customer, tail) = split_customer(rest);
    if customer.is_empty() || tail.is_empty() {
        return Err(ParseError::Usage(USAGE_CREDIT));
    }
    match tail {
        [amount] => Ok(Intent::CreditAmount {
            customer,
            amount: parse_money("amount", amount)?,
        }),
        _ => Ok(Intent::CreditItems {
            customer,
            items: parse_items(tail, catalog)?,
        }),
    }
}

fn parse_payment(rest: &[&str]) -> Result<Intent, ParseError> {
    match rest.split_last() {
        Some((amount, customer)) if !customer.is_empty() => Ok(Intent::Payment {
            customer: join(customer),
            amount: parse_money("amount", amount)?,
        }),
        _ => Err(ParseError::Usage(USAGE_PAYMENT)),
    }
}

fn parse_order<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    let (body, order_type) = match rest.split_last() {
        Some((last, body)) if last.eq_ignore_ascii_case("delivery") => (body, OrderType::Delivery),
        Some((last, body)) if last.eq_ignore_ascii_case("pickup") => (body, OrderType::Pickup),
        _ => (rest, OrderType::Pickup),
    };
    let (customer, tail) = split_customer(body);
    if customer.is_empty() || tail.is_empty() {
        return Err(ParseError::Usage(USAGE_ORDER));
    }
    Ok(Intent::PlaceOrder {
        customer,
        items: parse_items(tail, catalog)?,
        order_type,
    })
}

fn parse_move_order(rest: &[&str], to: OrderStatus) -> Result<Intent, ParseError> {
    let tokens = match rest.split_first() {
        Some((first, tail)) if first.eq_ignore_ascii_case("order") => tail,
        _ => rest,
    };
    match tokens {
        [reference] => Ok(Intent::MoveOrder {
            reference: reference.to_string(),
            to,
        }),
        _ => Err(ParseError::Usage(USAGE_MOVE_ORDER)),
    }
}

fn parse_laybye<C: Catalog + ?Sized>(rest: &[&str], catalog: &C) -> Result<Intent, ParseError> {
    let sub = rest.first().map(|t| t.to_lowercase());
    match sub.as_deref() {
        Some("pay") => match &rest[1..] {
            [reference, amount] => Ok(Intent::LayByePayment {
                reference: reference.to_string(),
                amount: parse_money("amount", amount)?,
                method: PaymentMethod::Cash,
            }),
            [reference, amount, method] => Ok(Intent::LayByePayment {
                reference: reference.to_string(),
                amount: parse_money("amount", amount)?,
                method: method.parse()?,
            }),
            _ => Err(ParseError::Usage(USAGE_LAYBYE_PAY)),
        },
        Some("cancel") => match &rest[1..] {
            [reference] => Ok(Intent::CancelLayBye {
                reference: reference.to_string(),
            }),
            _ => Err(ParseError::Usage(USAGE_LAYBYE_CANCEL)),
        },
        _ => {
            let (customer, tail) = split_customer(rest);
            if customer.is_empty() || tail.is_empty() {
                return Err(ParseError::Usage(USAGE_LAYBYE));
            }
            Ok(Intent::CreateLayBye {
                customer,
                items: parse_items(tail, catalog)?,
            })
        }
    }
}

fn parse_expense(rest: &[&str]) -> Result<Intent, ParseError> {
    let [amount, category, tail @ ..] = rest else {
        return Err(ParseError::Usage(USAGE_EXPENSE));
    };
    let amount = parse_money("amount", amount)?;
    let category: ExpenseCategory = category.parse()?;

    let mut description = Vec::new();
    let mut method = PaymentMethod::Cash;
    let mut receipt = None;
    let mut i = 0;
    while i < tail.len() {
        let token = tail[i];
        if token.eq_ignore_ascii_case("method") {
            let value = tail.get(i + 1).ok_or(ParseError::Usage(USAGE_EXPENSE))?;
            method = value.parse()?;
            i += 2;
        } else if token.eq_ignore_ascii_case("receipt") {
            let value = tail.get(i + 1).ok_or(ParseError::Usage(USAGE_EXPENSE))?;
            receipt = Some(value.to_string());
            i += 2;
        } else {
            description.push(token);
            i += 1;
        }
    }
    if description.is_empty() {
        return Err(ParseError::Usage(USAGE_EXPENSE));
    }

    Ok(Intent::RecordExpense {
        amount,
        category,
        description: join(&description),
        method,
        receipt,
    })
}

fn parse_export(rest: &[&str]) -> Result<Intent, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::Usage(USAGE_EXPORT));
    }
    parse_report(rest, true).map_err(|_| ParseError::Usage(USAGE_EXPORT))
}

fn parse_report(tokens: &[&str], export: bool) -> Result<Intent, ParseError> {
    let Some((head, tail)) = tokens.split_first() else {
        return Err(ParseError::Usage(USAGE_EXPORT));
    };
    let period = match (head.to_lowercase().as_str(), tail) {
        ("daily", []) => ReportPeriod::Daily,
        ("weekly", []) => ReportPeriod::Weekly,
        ("monthly", []) => ReportPeriod::Monthly(None),
        ("monthly", [month]) => ReportPeriod::Monthly(Some(parse_month(month)?)),
        ("best" | "bestselling" | "bestsellers", []) => ReportPeriod::BestSellers,
        ("best", [word]) if word.eq_ignore_ascii_case("selling") => ReportPeriod::BestSellers,
        _ => return Err(ParseError::UnknownCommand(join(tokens))),
    };
    Ok(Intent::Report { period, export })
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parses `YYYY-MM`, a month name or a three-letter abbreviation.
fn parse_month(token: &str) -> Result<MonthSpec, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        field: "month",
        value: token.to_string(),
    };

    if let Some((year, month)) = token.split_once('-') {
        if !is_integer(year) || !is_integer(month) || year.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        return Ok(MonthSpec {
            year: Some(year),
            month,
        });
    }

    let lower = token.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(&lower)))
        .map(|idx| MonthSpec {
            year: None,
            month: idx as u32 + 1,
        })
        .ok_or_else(invalid)
}

fn parse_date(token: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| ParseError::InvalidDate {
        value: token.to_string(),
    })
}

fn parse_cash_flow(rest: &[&str]) -> Result<Intent, ParseError> {
    let [start, end] = rest else {
        return Err(ParseError::Usage(USAGE_CASHFLOW));
    };
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        return Err(ParseError::InvalidRange { start, end });
    }
    Ok(Intent::CashFlow { start, end })
}

// =============================================================================
// Unit Tests
// =============================================================================
