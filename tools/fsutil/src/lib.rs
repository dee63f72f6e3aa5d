pub mod content;
pub mod filesystem;
pub mod ops;
pub mod path;

pub mod mock;

pub use content::{Encoding, FileContent, ReadOptions};
pub use filesystem::{FileSystem, FileSystemError, Metadata, NodeKind, RealFileSystem};
pub use ops::{FsOptions, FsUtil};
