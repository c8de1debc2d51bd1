pub mod completion;
pub mod openai;
pub mod transport;
