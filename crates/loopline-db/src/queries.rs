//! Database query functions organized by table family.

pub mod passes;
pub mod plays;
pub mod previews;
pub mod works;
