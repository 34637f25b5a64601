//! Processors shipped with the server.

mod csv_export;
mod email_send;

pub use csv_export::CsvExportProcessor;
pub use email_send::EmailSendProcessor;
