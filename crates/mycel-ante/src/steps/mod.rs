//! Step implementations, one `impl AnteHandler` block per concern

mod checks;
mod deduct;
mod relay;
pub(crate) mod sigverify;
