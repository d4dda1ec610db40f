pub mod backend;
pub mod clip;
#[cfg(feature = "devices")]
pub mod device;
pub mod file;
pub mod recorder;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use clip::AudioClip;
#[cfg(feature = "devices")]
pub use device::CpalMicrophone;
pub use file::{AudioFile, FileMicrophone};
pub use recorder::{VoiceClip, VoiceRecorder};
