pub mod nonce;

pub use nonce::NonceService;
