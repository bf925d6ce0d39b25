pub mod resume;
pub mod response;
