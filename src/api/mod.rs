pub mod format;

pub use format::{PageQuery, Pagination};
