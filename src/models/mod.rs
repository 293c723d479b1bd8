pub mod document;
pub mod enums;
pub mod record;

pub use document::*;
pub use enums::*;
pub use record::*;
