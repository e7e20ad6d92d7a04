/// Classification of a terminal failure.
///
/// | Class | Session usable? | Effect on the cycle |
/// |-------|-----------------|---------------------|
/// | `Session` | No | Remaining requests skipped, loop reconnects next tick |
/// | `Request` | Yes | Only the affected symbol or category goes stale |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultClass {
    /// The session is gone or was never established.
    Session,

    /// A single request failed; the session is still good.
    Request,
}
