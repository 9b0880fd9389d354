pub mod errors;
pub mod hooks;
pub mod magic_link;
pub mod oauth;
pub mod password;
pub mod tokens;
pub mod user;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
