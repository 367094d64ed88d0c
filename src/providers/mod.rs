pub mod assets;
pub mod coinmarketcap;
pub mod http;
