pub mod features;
pub mod image;
pub mod scaler;
