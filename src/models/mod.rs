pub mod enums;
pub mod file;
pub mod record;
pub mod ledger_row;
pub mod matching;
pub mod outcome;

pub use enums::*;
pub use file::*;
pub use record::*;
pub use ledger_row::*;
pub use matching::*;
pub use outcome::*;
