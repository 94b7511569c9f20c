mod token;

pub use token::TokenManager;
pub use token::refresh_token;
pub use token::token_from_json;
