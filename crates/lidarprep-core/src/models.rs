pub mod job;
pub mod point;

pub use job::{DownsampleJob, FileTask, Method, MethodParam};
pub use point::{PointCollection, PointRecord, SourceFormat};
