pub mod report_ctx;
pub mod report_flow;

pub use report_ctx::{AuthenticatedUser, ReportCtx, RequestCtx};
pub use report_flow::ReportFlow;
