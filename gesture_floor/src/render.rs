//! Renderer boundary.
//!
//! The sessions never touch the window.  They emit [`RenderCommand`]s in
//! world space, and whatever implements [`RenderSink`] turns them into
//! pixels (or records them, in tests).  The [`SceneRegistry`] is the core's
//! typed view of what is on the floor.
//!
//! | Command | Emitted when |
//! |---|---|
//! | `DrawCircle` | a circle is added, and once per stored circle at startup |
//! | `SpawnEffect` | a new circle crosses another user's circle |
//! | `SetCursor` | every Connect frame (hidden when no hand) |
//! | `PrayerEffect` | prayer begins, on every active frame, and when it ends |
//! | `ClearCircles` | the user clears their own circles |

use std::collections::BTreeMap;

use log::debug;

use hand_gesture::PrayerFacts;

// ════════════════════════════════════════════════════════════════════════════
// RenderCommand
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    /// Sparkle where two users' circles cross.
    Intersection,
}

/// Distances that parameterise the prayer effect; closer hands, stronger glow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrayerIntensity {
    pub index_distance: f32,
    pub palm_distance:  f32,
}

impl PrayerIntensity {
    pub fn from_facts(p: &PrayerFacts) -> Self {
        PrayerIntensity { index_distance: p.index_distance, palm_distance: p.palm_distance }
    }

    /// 0.0 (hands at the threshold) to 1.0 (hands touching).
    pub fn strength(&self, palm_threshold: f32) -> f32 {
        if palm_threshold <= 0.0 {
            return 1.0;
        }
        (1.0 - self.palm_distance / palm_threshold).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrayerEffect {
    Begin(PrayerIntensity),
    Update(PrayerIntensity),
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    DrawCircle   { owner_id: String, x: f64, z: f64, radius: f64 },
    SpawnEffect  { x: f64, z: f64, kind: EffectKind },
    /// Screen pixels.
    SetCursor    { x: f64, y: f64, visible: bool },
    PrayerEffect(PrayerEffect),
    ClearCircles { owner_id: String },
}

// ════════════════════════════════════════════════════════════════════════════
// Sinks
// ════════════════════════════════════════════════════════════════════════════

pub trait RenderSink {
    fn submit(&mut self, command: &RenderCommand);
}

/// Discards everything.  Used for headless replay.
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn submit(&mut self, _command: &RenderCommand) {}
}

/// Keeps every command in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub commands: Vec<RenderCommand>,
}

impl RecordingSink {
    pub fn new() -> Self { RecordingSink::default() }

    pub fn drain(&mut self) -> Vec<RenderCommand> { std::mem::take(&mut self.commands) }

    pub fn circles_drawn(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, RenderCommand::DrawCircle { .. })).count()
    }

    pub fn effects_spawned(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, RenderCommand::SpawnEffect { .. })).count()
    }
}

impl RenderSink for RecordingSink {
    fn submit(&mut self, command: &RenderCommand) {
        self.commands.push(command.clone());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SceneRegistry
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    FloorCircle,
    IntersectionEffect,
    Figure,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEntry {
    pub kind:     EntityKind,
    pub owner_id: Option<String>,
    /// When the entity appeared, in frame milliseconds.
    pub born_ms:  f64,
}

/// What is on the floor, by id.
///
/// The figure is registered on construction and never removed.
#[derive(Clone, Debug)]
pub struct SceneRegistry {
    entries:         BTreeMap<EntityId, SceneEntry>,
    next_id:         u64,
    figure:          EntityId,
    figure_rotating: bool,
}

impl Default for SceneRegistry {
    fn default() -> Self { SceneRegistry::new() }
}

impl SceneRegistry {
    pub fn new() -> Self {
        let mut reg = SceneRegistry {
            entries:         BTreeMap::new(),
            next_id:         0,
            figure:          EntityId(0),
            figure_rotating: false,
        };
        reg.figure = reg.register(EntityKind::Figure, None, 0.0);
        reg
    }

    pub fn register(&mut self, kind: EntityKind, owner_id: Option<&str>, born_ms: f64) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, SceneEntry { kind, owner_id: owner_id.map(str::to_string), born_ms });
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntry> { self.entries.get(&id) }

    pub fn figure(&self) -> EntityId { self.figure }

    pub fn is_figure_rotating(&self) -> bool { self.figure_rotating }

    pub fn set_figure_rotating(&mut self, rotating: bool) {
        if self.figure_rotating != rotating {
            debug!("figure rotating: {}", rotating);
        }
        self.figure_rotating = rotating;
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entries.values().filter(|e| e.kind == kind).count()
    }

    pub fn owned_by<'a>(&'a self, owner_id: &'a str) -> impl Iterator<Item = EntityId> + 'a {
        self.entries.iter()
            .filter(move |(_, e)| e.owner_id.as_deref() == Some(owner_id))
            .map(|(id, _)| *id)
    }

    /// Forget every entity of `owner_id`; returns how many were removed.
    pub fn remove_owner(&mut self, owner_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.owner_id.as_deref() != Some(owner_id));
        before - self.entries.len()
    }

    /// Drop intersection effects older than `lifetime_ms`.
    pub fn expire_effects(&mut self, now_ms: f64, lifetime_ms: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| {
            e.kind != EntityKind::IntersectionEffect || now_ms - e.born_ms < lifetime_ms
        });
        before - self.entries.len()
    }

    /// Update the registry to reflect a command on its way to the renderer.
    pub fn record(&mut self, command: &RenderCommand, now_ms: f64) {
        match command {
            RenderCommand::DrawCircle { owner_id, .. } => {
                self.register(EntityKind::FloorCircle, Some(owner_id), now_ms);
            }
            RenderCommand::SpawnEffect { .. } => {
                self.register(EntityKind::IntersectionEffect, None, now_ms);
            }
            RenderCommand::ClearCircles { owner_id } => {
                self.remove_owner(owner_id);
            }
            RenderCommand::PrayerEffect(PrayerEffect::Begin(_)) => self.set_figure_rotating(true),
            RenderCommand::PrayerEffect(PrayerEffect::End)      => self.set_figure_rotating(false),
            RenderCommand::PrayerEffect(PrayerEffect::Update(_)) | RenderCommand::SetCursor { .. } => {}
        }
    }
}

/// Figure angle in radians after `rotating_secs` of accumulated rotation.
pub fn rotation_angle(rotating_secs: f64, speed: f64) -> f64 {
    (rotating_secs * speed).rem_euclid(std::f64::consts::TAU)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(owner: &str) -> RenderCommand {
        RenderCommand::DrawCircle { owner_id: owner.into(), x: 0.0, z: 0.0, radius: 1.0 }
    }

    #[test]
    fn registry_starts_with_figure() {
        let reg = SceneRegistry::new();
        assert_eq!(reg.count(EntityKind::Figure), 1);
        assert_eq!(reg.get(reg.figure()).map(|e| e.kind), Some(EntityKind::Figure));
        assert!(!reg.is_figure_rotating());
    }

    #[test]
    fn record_tracks_circles_and_clears() {
        let mut reg = SceneRegistry::new();
        reg.record(&circle("alice"), 0.0);
        reg.record(&circle("alice"), 0.0);
        reg.record(&circle("bob"), 0.0);
        assert_eq!(reg.count(EntityKind::FloorCircle), 3);
        assert_eq!(reg.owned_by("alice").count(), 2);

        reg.record(&RenderCommand::ClearCircles { owner_id: "alice".into() }, 1.0);
        assert_eq!(reg.count(EntityKind::FloorCircle), 1);
        assert_eq!(reg.count(EntityKind::Figure), 1);
    }

    #[test]
    fn effects_expire() {
        let mut reg = SceneRegistry::new();
        let fx = RenderCommand::SpawnEffect { x: 1.0, z: 1.0, kind: EffectKind::Intersection };
        reg.record(&fx, 0.0);
        reg.record(&fx, 900.0);
        assert_eq!(reg.expire_effects(1000.0, 1000.0), 1);
        assert_eq!(reg.count(EntityKind::IntersectionEffect), 1);
    }

    #[test]
    fn prayer_effect_drives_rotation_flag() {
        let mut reg = SceneRegistry::new();
        let i = PrayerIntensity { index_distance: 0.1, palm_distance: 0.1 };
        reg.record(&RenderCommand::PrayerEffect(PrayerEffect::Begin(i)), 0.0);
        assert!(reg.is_figure_rotating());
        reg.record(&RenderCommand::PrayerEffect(PrayerEffect::Update(i)), 10.0);
        assert!(reg.is_figure_rotating());
        reg.record(&RenderCommand::PrayerEffect(PrayerEffect::End), 20.0);
        assert!(!reg.is_figure_rotating());
    }

    #[test]
    fn rotation_is_pure_and_wraps() {
        assert_eq!(rotation_angle(0.0, 1.0), 0.0);
        assert!((rotation_angle(1.0, 0.5) - 0.5).abs() < 1e-12);
        let wrapped = rotation_angle(10.0, 1.0);
        assert!((0.0..std::f64::consts::TAU).contains(&wrapped));
        assert_eq!(rotation_angle(3.0, 0.8), rotation_angle(3.0, 0.8));
    }

    #[test]
    fn intensity_strength() {
        let i = PrayerIntensity { index_distance: 0.0, palm_distance: 0.125 };
        assert!((i.strength(0.25) - 0.5).abs() < 1e-6);
        let far = PrayerIntensity { index_distance: 0.0, palm_distance: 0.5 };
        assert_eq!(far.strength(0.25), 0.0);
    }

    #[test]
    fn recording_sink_counts() {
        let mut sink = RecordingSink::new();
        sink.submit(&circle("a"));
        sink.submit(&RenderCommand::SpawnEffect { x: 0.0, z: 0.0, kind: EffectKind::Intersection });
        assert_eq!(sink.circles_drawn(), 1);
        assert_eq!(sink.effects_spawned(), 1);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.commands.is_empty());
    }
}
