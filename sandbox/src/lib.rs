pub mod backend;
pub mod config_file;
pub mod init;
pub mod scenario;
