pub mod model_pass;
pub mod pass;
