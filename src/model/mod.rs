//! Types that represent the core data model: the message parser, the quincena
//! period and the persisted `Expense` record.

mod expense;
mod message;
mod period;

pub use expense::{Expense, Source};
pub use message::{parse, ParsedExpense};
pub use period::Quincena;
