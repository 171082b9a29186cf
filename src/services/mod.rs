pub mod ai;
pub mod extraction;
