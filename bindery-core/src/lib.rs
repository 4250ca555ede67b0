mod arg;
mod as_value;
mod bean;
mod cache;
mod config;
mod dialect;
mod driver;
mod error;
mod function;
mod input;
mod monitor;
mod output;
mod processor;
mod resolver;
mod service;
mod table;
mod token;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use arg::*;
pub use as_value::*;
pub use bean::*;
pub use cache::*;
pub use config::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use function::*;
pub use input::*;
pub use monitor::*;
pub use output::*;
pub use processor::*;
pub use resolver::*;
pub use service::*;
pub use table::*;
pub use token::*;
pub use transaction::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
