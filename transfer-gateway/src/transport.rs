//! Transport capability consumed by the gateway

use crate::{Result, TransferError};

/// The live transfer a gateway protects
///
/// Implementations perform the actual outbound call and derive the cache key
/// for a request. Validation runs before any side effect; a rejected request
/// is never transferred, queued or looked up.
pub trait Transport {
    /// Outbound payload
    type Request;
    /// Inbound payload
    type Response;

    /// Reject malformed requests with [`crate::Error::InvalidArgument`]
    fn validate(&self, _request: &Self::Request) -> Result<()> {
        Ok(())
    }

    /// Perform the live transfer
    fn transfer(&self, request: &Self::Request) -> std::result::Result<Self::Response, TransferError>;

    /// Stable cache key for `request`
    fn hash(&self, request: &Self::Request) -> Result<String>;

    /// Whether a live response may be written to the inbound cache
    fn is_cacheable(&self, _response: &Self::Response) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    type Request = T::Request;
    type Response = T::Response;

    fn validate(&self, request: &Self::Request) -> Result<()> {
        (**self).validate(request)
    }

    fn transfer(&self, request: &Self::Request) -> std::result::Result<Self::Response, TransferError> {
        (**self).transfer(request)
    }

    fn hash(&self, request: &Self::Request) -> Result<String> {
        (**self).hash(request)
    }

    fn is_cacheable(&self, response: &Self::Response) -> bool {
        (**self).is_cacheable(response)
    }
}
