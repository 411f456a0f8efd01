pub mod classifier;
pub mod dataset;
pub mod schema;
pub mod train;

pub use classifier::*;
pub use dataset::*;
pub use schema::*;
pub use train::*;
