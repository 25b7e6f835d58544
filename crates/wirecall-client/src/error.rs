use wirecall_codec::CodecError;
use wirecall_proto::Failure;
use wirecall_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The connection ended before any response envelope arrived.
    #[error("server closed the connection without a response")]
    NullResponse,

    /// The server answered with an error-status envelope.
    #[error("remote failure: {0}")]
    Remote(Failure),
}

pub type Result<T> = std::result::Result<T, ClientError>;
