pub mod errors;
pub mod signer;

pub use errors::TokenError;
pub use signer::TokenSigner;
