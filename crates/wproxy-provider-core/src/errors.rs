use std::error::Error;
use std::fmt;

use wproxy_protocol::openai::list_models::types::ModelKind;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The resolved model serves the other endpoint.
    WrongModelKind { expected: ModelKind },
    /// The page was fetched but carried no chat nonce.
    NonceNotFound,
    /// The upstream could not be reached or answered garbage.
    Upstream(String),
    /// The chat reply stream carried no text.
    EmptyResponse,
    /// The image handler refused the nonce.
    NonceRejected { details: String },
    /// The image handler reported a failure unrelated to the nonce.
    GenerationFailed(String),
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::WrongModelKind { expected } => match expected {
                ModelKind::Chat => write!(f, "Model is not a chat model"),
                ModelKind::Image => write!(f, "Model is not an image model"),
            },
            ProviderError::NonceNotFound => write!(f, "Could not find chat nonce"),
            ProviderError::Upstream(msg) => write!(f, "{msg}"),
            ProviderError::EmptyResponse => write!(f, "No response from upstream"),
            ProviderError::NonceRejected { .. } => {
                write!(f, "Nonce verification failed - try refreshing the source page")
            }
            ProviderError::GenerationFailed(msg) => write!(f, "{msg}"),
            ProviderError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for ProviderError {}
