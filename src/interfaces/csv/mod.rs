pub mod command_reader;
pub mod request_writer;
pub mod runner;
