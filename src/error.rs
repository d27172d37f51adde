/// The error type for the socket multiplexer.
///
/// These are categories, not wrapped transport error objects: the
/// transport's own error codes are carried alongside, in the variants
/// that need them, as opaque `i32`s (see [`Error::Transport`]).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The socket table is at capacity; no slot was available.
    SocketSetFull,
    /// No slot exists for the given handle (already released, or never
    /// allocated).
    InvalidSocket,
    /// The operation is not permitted in the socket's current state.
    Illegal,
    /// A buffer allocation or growth failed.
    Exhausted,
    /// The transport rejected a connect/listen/send/disconnect request.
    ///
    /// Carries the transport's own error code, for surfacing to the
    /// caller without this crate having to understand what it means.
    Transport(i32),
    /// DNS resolution of the saved hostname failed.
    ResolutionFailed,
    /// `createsocket` was asked to resolve a hostname, but
    /// `gethostbyname` was never called first.
    NoSavedHostname,
}

pub type Result<T> = core::result::Result<T, Error>;
