pub mod experiences;
pub mod health;
