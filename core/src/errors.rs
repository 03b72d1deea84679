use thiserror::Error;

/// Failures reported by the Gemini API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The API answered with an error body or a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("{0}")]
    Transport(String),
    /// The response arrived but could not be interpreted.
    #[error("{0}")]
    Malformed(String),
    /// The prompt or the candidate was withheld by the provider.
    #[error("Text not available. Response was blocked due to {0}")]
    Blocked(String),
}

impl ProviderError {
    /// Human readable message, falling back to a generic one when the
    /// provider left it empty.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "An error occurred while communicating with Gemini.".to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LabError {
    #[error("Please provide a valid Gemini API Key first.")]
    MissingCredential,
    #[error("Please enter some text to process.")]
    EmptyInput,
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("{}", .0.user_message())]
    Provider(#[from] ProviderError),
    #[error("Could not list models. This usually happens if the API key is invalid or restricted. Error: {0}")]
    ListingUnavailable(String),
    #[error("Could not list models. This usually happens if the API key is invalid or restricted. Error: {}", .0.user_message())]
    ListingFailed(ProviderError),
    #[error("Credential storage unavailable: {0}")]
    Storage(String),
}

impl LabError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "KEY-1001",
            Self::EmptyInput => "INP-1001",
            Self::UnknownModel(_) => "MDL-1002",
            Self::Provider(_) => "GEN-2001",
            Self::ListingUnavailable(_) => "MDL-1001",
            Self::ListingFailed(_) => "MDL-2001",
            Self::Storage(_) => "DB-1001",
        }
    }
    pub fn explain(&self) -> &'static str {
        match self {
            Self::MissingCredential => "No Gemini API key is stored for this workspace.",
            Self::EmptyInput => "The task input was empty or whitespace only.",
            Self::UnknownModel(_) => "The requested model is not in the selectable list.",
            Self::Provider(_) => "The Gemini API rejected the request or could not be reached.",
            Self::ListingUnavailable(_) => "The model listing response did not contain any models.",
            Self::ListingFailed(_) => "The model listing request could not be completed.",
            Self::Storage(_) => "The application could not access the credential store.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_is_surfaced_verbatim() {
        let err = LabError::from(ProviderError::Api {
            status: 400,
            message: "API key not valid".into(),
        });
        assert_eq!(err.to_string(), "API key not valid");
        assert_eq!(err.code(), "GEN-2001");
    }

    #[test]
    fn empty_provider_message_falls_back() {
        let err = LabError::from(ProviderError::Transport(String::new()));
        assert_eq!(
            err.to_string(),
            "An error occurred while communicating with Gemini."
        );
    }

    #[test]
    fn listing_failure_hints_at_the_key() {
        let err = LabError::ListingUnavailable("invalid key".into());
        let text = err.to_string();
        assert!(text.contains("invalid or restricted"));
        assert!(text.ends_with("Error: invalid key"));
    }
}
