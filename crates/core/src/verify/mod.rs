pub mod chunk;
pub mod comparator;
pub mod reporter;
