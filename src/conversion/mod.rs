//! On-the-fly conversion of non-native media.
//!
//! This module owns the encoder process end to end:
//!
//! - [`ConversionSupervisor`] keeps at most one encoder alive and preempts
//!   it when a new conversion starts
//! - [`pipeline`] copies encoder output to a single client and stops the
//!   encoder when that client goes away
//! - [`Transcoder`] decides which program runs and with which arguments

mod error;
pub mod pipeline;
mod supervisor;
mod transcoder;

pub use error::{ConversionError, ErrorKind};
pub use pipeline::{ConversionStream, PendingConversion, StreamOutcome};
pub use supervisor::{
    ActiveConversion, ConversionId, ConversionSupervisor, ConversionTicket, Release,
    StartedConversion,
};
pub use transcoder::{FfmpegTranscoder, Transcoder};
