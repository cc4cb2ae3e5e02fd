pub mod scenario;
pub mod template;
