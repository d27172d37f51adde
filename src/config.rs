/// Default socket pool capacity, matching the original's `MAX_SOCKETS`.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

/// Default ceiling on how large a single socket's receive buffer may grow.
///
/// Not present in the distilled spec's accounting (the original never
/// bounds `rxBuf`), but carried as the ambient safety net a `no_std`
/// multiplexer needs against a transport that never stops delivering data
/// the upper layer never drains.
pub const DEFAULT_RX_LIMIT: usize = 16 * 1024;
