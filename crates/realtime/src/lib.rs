pub mod audio_unlock;
pub mod backend;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod openai;

pub use backend::{BackendConnection, BackendEvent, RealtimeBackend, RealtimeSession};
pub use coordinator::{ConnectOptions, SessionCoordinator, SessionSettings, SessionSignal};
pub use credentials::{CredentialProvider, HttpCredentialProvider, StaticCredentialProvider};
pub use error::{BackendError, CredentialError, SessionError};
pub use openai::OpenAiRealtimeBackend;
