pub mod activity;
pub mod vacancy;
