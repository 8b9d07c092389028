pub mod constants;
pub mod path;
#[cfg(test)]
pub mod test_helpers;
pub mod types;
pub mod validation;
