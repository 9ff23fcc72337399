//! Typed indices and the arena maps addressed by them.
mod index_trait;
mod indexed_map;
mod macros;

pub mod maps {
    pub use super::indexed_map::IndexedMap;
}

pub use index_trait::IndexRef;
