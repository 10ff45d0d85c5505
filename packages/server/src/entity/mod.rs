pub mod category;
pub mod container;
pub mod image;
pub mod item;
