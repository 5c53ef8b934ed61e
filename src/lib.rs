// Metapackage for the workspace-level tests in tests/
//
// The crates are re-exported so that the end-to-end tests can reach every
// layer through one dependency.

pub use api_gateway;
pub use common;
pub use exchange_sync;
pub use fiscal_receipt;
pub use order_service;
