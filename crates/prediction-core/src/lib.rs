pub mod error;
pub mod normalize;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::*;
pub use normalize::normalize;
pub use traits::*;
pub use types::*;
