//! Draw-call primitives.

mod primitive;

pub use primitive::PrimitiveType;
