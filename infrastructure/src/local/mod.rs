//! Offline stand-ins for the reasoning module and the execution runtime.
//!
//! Both are deterministic and need no network, so the binary and its tests
//! run anywhere. Real adapters implement the same ports.

mod reasoning;
mod runtime;

pub use reasoning::OfflineReasoningModule;
pub use runtime::OfflineExecutionRuntime;

/// Lowercased alphanumeric words of `text`.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}
