pub mod chat;
pub mod config;
pub mod health;
pub mod input;
pub mod insights;
pub mod mood;
pub mod pattern;
pub mod risk;
pub mod service;
pub mod trend;

pub use chat::*;
pub use config::*;
pub use health::*;
pub use input::*;
pub use insights::*;
pub use mood::*;
pub use risk::*;
pub use service::*;
pub use trend::*;
