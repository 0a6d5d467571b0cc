pub mod grade;
pub mod init;
pub mod stats;
pub mod validate;
