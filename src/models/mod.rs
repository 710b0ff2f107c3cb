pub mod arco;
pub mod consent;
pub mod enums;

pub use arco::*;
pub use consent::*;
pub use enums::*;

/// Patient identifier as issued by the records service.
pub type PatientId = i64;
