pub mod asset;
pub mod feedback;
pub mod shared;
