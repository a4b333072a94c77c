pub mod order;
pub mod roll;
