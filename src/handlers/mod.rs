pub mod grocery;
pub mod pinterest;
pub mod plans;
pub mod profile;
pub mod recipes;
