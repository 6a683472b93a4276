//! Throw game aggregation
//!
//! Accuracy, hit score and percentile placement computed from the throw
//! counters and history of a session.

use crate::config::GameConfig;
use crate::types::ThrowRecord;

/// Successful throws against the configured throw budget.
///
/// The divisor is `max_throws`, not the number of throws attempted. Returns 0
/// until the first throw is detected.
pub fn accuracy(success_count: u32, throw_count: u32, config: &GameConfig) -> u32 {
    if throw_count == 0 || config.max_throws == 0 {
        return 0;
    }
    (success_count as f64 / config.max_throws as f64 * 100.0).round() as u32
}

/// Cumulative share of players with fewer hits, from the hit distribution
pub fn percentile_position(success_count: u32, config: &GameConfig) -> u32 {
    let cumulative: f64 = (0..success_count)
        .map(|hits| config.hit_distribution.get(&hits).copied().unwrap_or(0.0))
        .sum();
    cumulative.round() as u32
}

/// Points for every successful throw in history
pub fn game_score(history: &[ThrowRecord], config: &GameConfig) -> u32 {
    history
        .iter()
        .filter(|t| t.success)
        .map(|t| {
            if t.is_big_throw {
                config.score_per_big_hit
            } else {
                config.score_per_hit
            }
        })
        .sum()
}

/// Blend of average attention and throw accuracy
pub fn brain_power(average_attention: u32, accuracy: u32) -> u32 {
    ((average_attention + accuracy) as f64 / 2.0).round() as u32
}
