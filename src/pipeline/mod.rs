pub mod extraction;
pub mod structuring;
pub mod batch;
pub mod export;
