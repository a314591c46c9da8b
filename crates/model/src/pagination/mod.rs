pub mod cursor;
pub mod position;
