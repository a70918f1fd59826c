#![warn(clippy::pedantic)]
// Noisy doc/signature lints — would require annotating most pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference — keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Timestamps and counters cross integer widths at the wire boundary
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
// Module structure — store::StoreError, gateway::GatewayClient pattern by design
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod errors;
pub mod gateway;
pub mod identity;
pub mod ingest;
pub mod materialize;
pub mod model;
pub mod store;
pub mod webhook;

pub use errors::{WabridgeError, WabridgeResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
