pub mod model;

pub use model::{DEFAULT_STATUS, Transaction, TxOptions, parse_amount};
