pub mod kill;
pub mod limits;
pub mod tail;
