pub mod list_distributions;
pub mod run;
pub mod validate;
