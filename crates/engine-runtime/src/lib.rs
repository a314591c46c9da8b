pub mod error;
pub mod scheduler;
pub mod source;
pub mod supervisor;

#[cfg(test)]
mod tests;
