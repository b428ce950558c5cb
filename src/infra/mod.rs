// Adapters behind the application ports
pub mod credentials;
pub mod opensea;
pub mod webdriver;

pub use opensea::{OpenSeaMarketplace, Wallet};
pub use webdriver::WebDriverClient;
