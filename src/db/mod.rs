pub mod invoices;
pub mod load;
pub mod pool;
pub mod queries;

pub use invoices::{InvoiceFilter, InvoiceSort, SortOrder};
pub use load::PgLoadStore;
pub use pool::{create_pool, run_migrations};
