//! Exercise catalogue: resolves a free-text exercise name to its channel.
//!
//! Lookup order, fixed:
//!   1. case-insensitive exact match;
//!   2. first catalogue entry (in table order) where either name contains
//!      the other, case-insensitively.

use crate::channel::Channel;

/// Append new names at the end of their group; earlier entries win
/// partial matches.
pub static EXERCISES: &[(&str, Channel)] = &[
    // ── Chest ──────────────────────────────────────────────────────
    ("Bench Press", Channel::Chest),
    ("Incline Press", Channel::Chest),
    ("Decline Press", Channel::Chest),
    ("Dumbbell Fly", Channel::Chest),
    ("Chest Fly", Channel::Chest),
    ("Push-ups", Channel::Chest),
    ("Pushups", Channel::Chest),
    ("Cable Crossover", Channel::Chest),
    ("Pec Deck", Channel::Chest),
    ("Dips", Channel::Chest),
    // ── Back ───────────────────────────────────────────────────────
    ("Deadlift", Channel::Back),
    ("Barbell Row", Channel::Back),
    ("Dumbbell Row", Channel::Back),
    ("Bent Over Row", Channel::Back),
    ("Lat Pulldown", Channel::Back),
    ("Pull-ups", Channel::Back),
    ("Pullups", Channel::Back),
    ("Chin-ups", Channel::Back),
    ("Chinups", Channel::Back),
    ("Seated Row", Channel::Back),
    ("Cable Row", Channel::Back),
    ("T-Bar Row", Channel::Back),
    ("Face Pull", Channel::Back),
    // ── Shoulders ──────────────────────────────────────────────────
    ("Overhead Press", Channel::Shoulders),
    ("Military Press", Channel::Shoulders),
    ("Shoulder Press", Channel::Shoulders),
    ("Lateral Raise", Channel::Shoulders),
    ("Side Raise", Channel::Shoulders),
    ("Front Raise", Channel::Shoulders),
    ("Rear Delt Fly", Channel::Shoulders),
    ("Arnold Press", Channel::Shoulders),
    ("Upright Row", Channel::Shoulders),
    ("Shrugs", Channel::Shoulders),
    // ── Biceps ─────────────────────────────────────────────────────
    ("Bicep Curl", Channel::Biceps),
    ("Barbell Curl", Channel::Biceps),
    ("Dumbbell Curl", Channel::Biceps),
    ("Hammer Curl", Channel::Biceps),
    ("Preacher Curl", Channel::Biceps),
    ("Concentration Curl", Channel::Biceps),
    ("Cable Curl", Channel::Biceps),
    ("EZ Bar Curl", Channel::Biceps),
    ("Spider Curl", Channel::Biceps),
    // ── Triceps ────────────────────────────────────────────────────
    ("Tricep Pushdown", Channel::Triceps),
    ("Tricep Extension", Channel::Triceps),
    ("Skull Crusher", Channel::Triceps),
    ("Overhead Extension", Channel::Triceps),
    ("Close Grip Bench", Channel::Triceps),
    ("Tricep Dips", Channel::Triceps),
    ("Kickbacks", Channel::Triceps),
    ("Diamond Push-ups", Channel::Triceps),
    // ── Legs ───────────────────────────────────────────────────────
    ("Squat", Channel::Legs),
    ("Back Squat", Channel::Legs),
    ("Front Squat", Channel::Legs),
    ("Leg Press", Channel::Legs),
    ("Lunges", Channel::Legs),
    ("Leg Extension", Channel::Legs),
    ("Leg Curl", Channel::Legs),
    ("Calf Raise", Channel::Legs),
    ("Romanian Deadlift", Channel::Legs),
    ("Hip Thrust", Channel::Legs),
    ("Bulgarian Split Squat", Channel::Legs),
    ("Hack Squat", Channel::Legs),
    ("Step-ups", Channel::Legs),
    // ── Core ───────────────────────────────────────────────────────
    ("Plank", Channel::Core),
    ("Crunches", Channel::Core),
    ("Sit-ups", Channel::Core),
    ("Situps", Channel::Core),
    ("Leg Raise", Channel::Core),
    ("Russian Twist", Channel::Core),
    ("Ab Wheel", Channel::Core),
    ("Cable Crunch", Channel::Core),
    ("Hanging Leg Raise", Channel::Core),
    ("Mountain Climbers", Channel::Core),
    ("Dead Bug", Channel::Core),
    ("Bicycle Crunch", Channel::Core),
    // ── Endurance ──────────────────────────────────────────────────
    ("Running", Channel::Endurance),
    ("Run", Channel::Endurance),
    ("Jogging", Channel::Endurance),
    ("Cycling", Channel::Endurance),
    ("Bike", Channel::Endurance),
    ("Rowing", Channel::Endurance),
    ("Swimming", Channel::Endurance),
    ("Jump Rope", Channel::Endurance),
    ("Burpees", Channel::Endurance),
    ("HIIT", Channel::Endurance),
    ("Elliptical", Channel::Endurance),
    ("Stair Climber", Channel::Endurance),
    ("Walking", Channel::Endurance),
    ("Treadmill", Channel::Endurance),
];

/// A resolved exercise name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseMatch {
    pub channel: Channel,
    /// Catalogue name that matched.
    pub matched: &'static str,
    pub exact:   bool,
}

/// Resolve `name` to a channel. Blank names never match.
pub fn detect_channel(name: &str) -> Option<ExerciseMatch> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some((matched, channel)) = EXERCISES.iter().find(|(n, _)| n.to_lowercase() == needle) {
        return Some(ExerciseMatch { channel: *channel, matched: *matched, exact: true });
    }
    EXERCISES
        .iter()
        .find(|(n, _)| {
            let known = n.to_lowercase();
            needle.contains(&known) || known.contains(&needle)
        })
        .map(|(matched, channel)| ExerciseMatch { channel: *channel, matched: *matched, exact: false })
}
