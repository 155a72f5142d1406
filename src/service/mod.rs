pub mod aggregation;
pub mod chat;
pub mod loader;
pub mod materializer;
pub mod normalize;
pub mod report;
pub mod resolver;

pub use chat::ChatClient;
pub use loader::{LoadStore, Loader};
pub use report::{InvoiceListQuery, ReportService};
