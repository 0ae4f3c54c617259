pub mod asyncx;
pub mod serdex;
