/// Evaluates the tokens after `=>`, logging how long it took at `debug` level.
///
/// ```
/// let sum = quire::time!("summing" => (1..10).sum::<u32>());
/// assert_eq!(sum, 45);
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! time {
    ($label:expr => $($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        $crate::log::debug!("{} took {}ms", $label, start.elapsed().as_millis());
        value
    });
}

pub use time;
