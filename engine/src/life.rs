//! Health arithmetic shared by the player and enemies.

/// Subtract `damage` from `current`, never going below 0.
pub fn apply_damage(current: u32, damage: u32) -> u32 {
    current.saturating_sub(damage)
}

/// Add `amount` to `current`, capped at `max`. A creature above `max`
/// (e.g. after a corrupted save) is pulled back down to it.
pub fn heal(current: u32, amount: u32, max: u32) -> u32 {
    current.saturating_add(amount).min(max)
}

/// True when the creature has no health left.
pub fn is_down(current: u32) -> bool {
    current == 0
}
