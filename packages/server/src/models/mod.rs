pub mod category;
pub mod container;
pub mod image;
pub mod item;
pub mod shared;
