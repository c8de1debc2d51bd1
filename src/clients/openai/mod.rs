pub mod chat_completions;
pub mod model_info;
pub mod types;

pub use chat_completions::HttpTransport;
