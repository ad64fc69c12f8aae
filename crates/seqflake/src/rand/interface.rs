/// A trait for random sources that return random integers.
///
/// The generator draws a small starting offset for each new millisecond from
/// this source. Plugging in a fixed source makes ID values deterministic in
/// tests.
///
/// # Example
/// ```
/// use seqflake::RandSource;
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn rand(&self) -> u64 {
///         1234
///     }
/// }
///
/// let rng = FixedRand;
/// assert_eq!(rng.rand(), 1234);
/// ```
pub trait RandSource {
    /// Returns a random integer.
    fn rand(&self) -> u64;
}
