mod chunker;
pub mod config;
mod crypto;
mod error;
mod fountain;
mod frame;
mod integrity;
mod metadata;
mod packet;
pub mod pipeline;
pub mod video;

pub use config::RvsConfig;
pub use error::RvsError;
pub use metadata::Metadata;
pub use pipeline::decode::{decode_file, decode_stream, DecodedFile};
pub use pipeline::encode::{encode_file, encode_stream};
pub use pipeline::hook::{NoopHook, PipelineHook};
pub use pipeline::{roundtrip, RoundtripResult};
