pub mod dtype;
pub mod error;
pub mod fetch;
pub mod float16;
pub mod ingest;
pub mod models;
pub mod npy;
pub mod record;
pub mod store;

pub use error::{Error, StoreError};
pub use fetch::{FetchOptions, Source, acquire, load};
pub use float16::{f16_bits_to_f32, f16_slice_to_f32};
pub use ingest::{
    ImportProgress, ImportRequest, ImportWorker, ImportWorkerHandle, IngestConfig, LineAssembler,
    WorkerMessage,
};
pub use models::{ByteOrder, DType, MemoryOrder, TensorData, TensorDescriptor};
pub use npy::{DecoderOptions, NpyDecoder, decode, encode};
pub use record::{NormalizedRecord, RawRecord};
pub use store::{MemoryRecordStore, MemoryVectorStore, RecordStore, VectorStore};
