pub mod announce;
pub mod clips;
pub mod health;
pub mod session;
pub mod sse;
pub mod validation;
