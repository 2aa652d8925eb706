pub mod error;
pub mod markup;
pub mod protocol;
