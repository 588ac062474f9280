// Label printing: transport sinks and the print/preview HTTP handlers.

pub mod handlers;
pub mod sink;

pub use sink::{build_sink, LabelSink, PrintJob, PrinterConfig, PrinterError};
