pub mod cors;
pub mod response;
