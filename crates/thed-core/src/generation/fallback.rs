use async_trait::async_trait;

use crate::gateway::TaskGenerator;
use crate::task::Suggestion;

/// Routine items used when the generator is unavailable.
pub fn fallback_routine() -> Vec<Suggestion> {
    vec![
        Suggestion::new("Morning Hydration", "Drink 500ml of water."),
        Suggestion::new("Core Stretch", "5-minute mobility flow."),
        Suggestion::new("Deep Focus", "25 minutes of zero-distraction work."),
        Suggestion::new(
            "Digital Decompression",
            "Step away from screens for 10 minutes.",
        ),
    ]
}

/// Single suggestion used when the generator is unavailable.
pub fn fallback_single() -> Suggestion {
    Suggestion::new("Focus", "Take a deep breath.")
}

/// Offline generator that always returns the built-in payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

#[async_trait]
impl TaskGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn generate_routine_batch(&self, count: usize) -> Vec<Suggestion> {
        let mut items = fallback_routine();
        items.truncate(count);
        items
    }

    async fn generate_single_suggestion(&self) -> Suggestion {
        fallback_single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fallback_batch_has_four_items() {
        let items = FallbackGenerator.generate_routine_batch(12).await;
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].title, "Morning Hydration");
    }

    #[tokio::test]
    async fn fallback_batch_respects_smaller_counts() {
        assert_eq!(FallbackGenerator.generate_routine_batch(2).await.len(), 2);
    }

    #[tokio::test]
    async fn fallback_single_is_stable() {
        assert_eq!(
            FallbackGenerator.generate_single_suggestion().await,
            fallback_single()
        );
    }
}
