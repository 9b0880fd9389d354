pub mod config;
pub mod domain;
pub mod outbound;
pub mod services;

pub use domain::errors::AccountError;
pub use domain::magic_link;
pub use domain::oauth;
pub use domain::password;
pub use domain::user;
pub use outbound::providers;
pub use outbound::repositories;
pub use services::AccountServices;
