//! Tool trait
//!
//! Tools are narrowly-scoped external calls a flow makes before prompting.

pub mod geocoding;
pub use geocoding::ReverseGeocoder;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn call(&self, input: Self::Input) -> Self::Output;
}

/// Address lookup as used by the coordinate flow
pub type AddressTool = dyn Tool<Input = crate::models::Coordinates, Output = String>;
