//! Customer sign-off

use crate::capture::Signature;
use crate::store::SignOffRecord;

use super::SessionError;

/// A customer's signature with who signed
#[derive(Debug, Clone)]
pub struct SignOff {
    pub signature: Signature,
    pub signer_name: String,
    pub signer_title: Option<String>,
}

impl SignOff {
    pub fn new(signature: Signature, signer_name: impl Into<String>) -> Self {
        Self {
            signature,
            signer_name: signer_name.into(),
            signer_title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.signer_title = Some(title.into());
        self
    }

    /// The signature itself is non-empty by construction; only the signer
    /// name needs checking.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.signer_name.trim().is_empty() {
            return Err(SessionError::MissingSignerName);
        }
        Ok(())
    }

    /// Form sent to the backend and kept in the queue
    pub fn to_record(&self) -> SignOffRecord {
        SignOffRecord {
            signature: self.signature.to_data_url(),
            signer_name: self.signer_name.trim().to_string(),
            signer_title: self
                .signer_title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }
}
