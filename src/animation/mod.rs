pub mod clip;
pub mod mixer;

pub use clip::{AnimationClip, Channel, ChannelValues, Interpolation};
pub use mixer::{ActionId, AnimationAction, AnimationMixer, LoopMode};
