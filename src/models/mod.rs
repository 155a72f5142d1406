pub mod extraction;
pub mod invoice;
pub mod load;
pub mod party;
pub mod report;

pub use extraction::{ExtractionRecord, LlmData, RawLineItem, RawValue};
pub use invoice::{
    CategoryAmount, CustomerInvoiceRow, InvoiceDraft, InvoiceFigure, InvoiceListRow,
    InvoiceStat, InvoiceStatus, LineItemDraft, MaterializedInvoice, OutflowCandidate, PartyTotal,
};
pub use load::{LoadIssue, LoadStats, SkipReason};
pub use party::{Customer, CustomerSummaryRow, PartyFields, PartyKind, StoreCounts};
pub use report::{
    CashOutflowEntry, CategorySpend, CustomerDetail, CustomerInvoice, CustomerWithStats,
    DashboardStats, InvoicePage, InvoiceSummary, MonthlyTrend, Pagination, TopCustomer,
    TopVendor, VendorRef,
};
