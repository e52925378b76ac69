pub mod services;

#[cfg(test)]
pub mod fixtures;
