//! Request extractors.

mod tenant;

pub use tenant::{tenant_from_headers, TENANT_ID_HEADER};
