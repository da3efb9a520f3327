pub mod qna_repo;
pub mod store;
pub mod trend_repo;

pub use qna_repo::QnaRepo;
pub use store::{ensure_tables, CellMap, MemoryStore, ScanParams, StoreGateway};
pub use trend_repo::TrendRepo;
