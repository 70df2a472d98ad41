pub mod http;
pub mod pdf;

#[cfg(test)]
pub mod fixtures;
