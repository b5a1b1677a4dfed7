//! Transformer trait for data transformation

use eyre::Result;

/// Transformer trait for transforming data items
///
/// Implementors define how to transform items:
/// - Data enrichment (adding derived columns)
/// - Unit conversion
/// - Validation
///
/// # Example
/// ```
/// use bank_etl::etl::Transformer;
/// use eyre::Result;
///
/// struct Doubler;
///
/// impl Transformer for Doubler {
///     type Input = f64;
///     type Output = f64;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         Ok(input * 2.0)
///     }
/// }
///
/// assert_eq!(Doubler.transform_many(vec![1.0, 2.5]).unwrap(), vec![2.0, 5.0]);
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if transformation fails (validation, conversion, etc.)
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform multiple items (default batch implementation)
    ///
    /// Output order and length match the input.
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}
