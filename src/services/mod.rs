// Core workflow services
pub mod purchase_orders;
pub mod sequence;
pub mod stock_ledger;

// Catalog and account management
pub mod products;
pub mod suppliers;
pub mod users;

// Read-only projections
pub mod reports;
