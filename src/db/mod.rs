pub mod entities;
pub mod schema;
pub mod services;

#[cfg(test)]
pub mod test_support;
