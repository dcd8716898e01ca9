pub mod utils;

#[cfg(test)]
pub mod http_stub;
