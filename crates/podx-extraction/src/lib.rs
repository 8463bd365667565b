mod client;
mod driver;

pub use client::ReductoClient;
pub use driver::run_all;
