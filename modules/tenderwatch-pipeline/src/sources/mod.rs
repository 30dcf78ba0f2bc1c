mod nen;
mod ted;

pub use nen::NenClient;
pub use ted::TedClient;
