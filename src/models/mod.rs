pub mod document;
pub mod plan;
pub mod preferences;
pub mod request;
