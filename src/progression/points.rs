//! Point awards and level derivation (pure math, no DB).

/// Cumulative point thresholds per level. Level = highest index whose
/// threshold the lifetime total has reached, capped at the last rung.
const LEVEL_THRESHOLDS: &[i64] = &[0, 50, 150, 300, 500, 750, 1000];

/// Ladder-rung titles, one per level.
const LEVEL_TITLES: &[&str] = &[
    "Newcomer",
    "Starter",
    "Builder",
    "Climber",
    "Pacesetter",
    "Veteran",
    "Summit",
];

/// Streak multiplier tiers, highest threshold first.
pub fn streak_multiplier(streak: i64) -> f64 {
    if streak >= 7 {
        1.5
    } else if streak >= 3 {
        1.2
    } else {
        1.0
    }
}

/// Points earned for one completion: the item's base value scaled by the
/// streak multiplier, rounded half-up.
pub fn compute_award(base_points: i64, streak: i64) -> i64 {
    (base_points as f64 * streak_multiplier(streak)).round() as i64
}

/// Level for a lifetime point total.
pub fn level_for(total_points: i64) -> i64 {
    let mut level = 0;
    for (i, threshold) in LEVEL_THRESHOLDS.iter().enumerate() {
        if total_points >= *threshold {
            level = i as i64;
        } else {
            break;
        }
    }
    level
}

/// Title for a level, clamped to the ladder.
pub fn level_title(level: i64) -> &'static str {
    let idx = level.clamp(0, LEVEL_TITLES.len() as i64 - 1) as usize;
    LEVEL_TITLES[idx]
}
