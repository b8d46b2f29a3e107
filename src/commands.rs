pub mod retrieve_token;
pub mod serve;
