//! Combat style registry.
//!
//! A style names how an attack resolves (melee or ranged), which sounds and
//! visuals the presentation layer should play, and for ranged styles how the
//! projectile flies. The simulation only reads the behavior class and the
//! projectile parameters; the id itself is forwarded untouched to effect and
//! projectile entities.

use crate::error::{Result, SimError};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense handle into the [`StyleRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StyleId(pub u16);

/// How an attack of this style resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLogic {
    /// Instant damage on the target.
    Melee,
    /// Spawns a projectile.
    Ranged,
}

/// Projectile parameters for ranged styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    #[serde(default = "default_shape")]
    pub shape: String,
    /// Steer toward the attacker's target after launch.
    #[serde(default)]
    pub tracking: bool,
    #[serde(default = "default_projectile_speed")]
    pub speed: f32,
    /// Additional targets after the first.
    #[serde(default)]
    pub pierce: u32,
    #[serde(default = "default_projectile_life")]
    pub life_time: f32,
    /// Minimum seconds between repeat hits on the same target.
    #[serde(default = "default_hit_interval")]
    pub hit_interval: f32,
    /// Multiplier on the global homing blend.
    #[serde(default = "default_tracking_strength")]
    pub tracking_strength: f32,
}

fn default_shape() -> String {
    "orb".to_string()
}
fn default_projectile_speed() -> f32 {
    18.0
}
fn default_projectile_life() -> f32 {
    2.0
}
fn default_hit_interval() -> f32 {
    0.5
}
fn default_tracking_strength() -> f32 {
    1.0
}
fn default_effect_duration() -> f32 {
    0.3
}

/// A single combat style definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStyle {
    pub name: String,
    pub logic: StyleLogic,
    #[serde(default)]
    pub sfx: Vec<String>,
    #[serde(default)]
    pub vfx: String,
    #[serde(default = "default_effect_duration")]
    pub effect_duration: f32,
    #[serde(default)]
    pub projectile: Option<ProjectileSpec>,
}

impl CombatStyle {
    pub fn melee(name: &str, vfx: &str) -> Self {
        Self {
            name: name.to_string(),
            logic: StyleLogic::Melee,
            sfx: vec![format!("{}_swing", name), format!("{}_hit", name)],
            vfx: vfx.to_string(),
            effect_duration: default_effect_duration(),
            projectile: None,
        }
    }

    pub fn ranged(name: &str, vfx: &str, projectile: ProjectileSpec) -> Self {
        Self {
            name: name.to_string(),
            logic: StyleLogic::Ranged,
            sfx: vec![format!("{}_fire", name)],
            vfx: vfx.to_string(),
            effect_duration: default_effect_duration(),
            projectile: Some(projectile),
        }
    }
}

/// All known combat styles.
#[derive(Resource, Debug, Clone, Default)]
pub struct StyleRegistry {
    styles: Vec<CombatStyle>,
    by_name: HashMap<String, StyleId>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default roster shipped with the engine.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let styles = [
            CombatStyle::melee("slash", "arc"),
            CombatStyle::melee("bite", "snap"),
            CombatStyle::melee("smash", "shockwave"),
            CombatStyle::ranged(
                "bolt",
                "muzzle_flash",
                ProjectileSpec {
                    shape: "bolt".into(),
                    tracking: false,
                    speed: 22.0,
                    pierce: 0,
                    life_time: 1.5,
                    hit_interval: 0.5,
                    tracking_strength: 1.0,
                },
            ),
            CombatStyle::ranged(
                "arrow",
                "string_snap",
                ProjectileSpec {
                    shape: "arrow".into(),
                    tracking: false,
                    speed: 20.0,
                    pierce: 2,
                    life_time: 1.5,
                    hit_interval: 0.5,
                    tracking_strength: 1.0,
                },
            ),
            CombatStyle::ranged(
                "wisp",
                "glow",
                ProjectileSpec {
                    shape: "orb".into(),
                    tracking: true,
                    speed: 12.0,
                    pierce: 0,
                    life_time: 3.0,
                    hit_interval: 0.5,
                    tracking_strength: 1.0,
                },
            ),
        ];
        for style in styles {
            let registered = registry.register(style);
            debug_assert!(registered.is_ok(), "builtin combat styles must register: {registered:?}");
        }
        registry
    }

    /// Load a registry from a JSON array of styles.
    pub fn from_json(json: &str) -> Result<Self> {
        let styles: Vec<CombatStyle> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for style in styles {
            registry.register(style)?;
        }
        Ok(registry)
    }

    /// Add a style, rejecting duplicates and ranged styles without a projectile.
    pub fn register(&mut self, style: CombatStyle) -> Result<StyleId> {
        if self.by_name.contains_key(&style.name) {
            return Err(SimError::DuplicateStyle(style.name));
        }
        if style.logic == StyleLogic::Ranged && style.projectile.is_none() {
            return Err(SimError::MissingProjectile(style.name));
        }
        let id = u16::try_from(self.styles.len())
            .map(StyleId)
            .map_err(|_| SimError::InvalidConfig("too many combat styles".into()))?;
        self.by_name.insert(style.name.clone(), id);
        self.styles.push(style);
        Ok(id)
    }

    /// Resolve a style name; unknown names are a content error.
    pub fn resolve(&self, name: &str) -> Result<StyleId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownStyle(name.to_string()))
    }

    pub fn get(&self, id: StyleId) -> Option<&CombatStyle> {
        self.styles.get(id.0 as usize)
    }

    /// Style name for presentation; empty for ids from another registry.
    pub fn name(&self, id: StyleId) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolves() {
        let registry = StyleRegistry::builtin();
        let slash = registry.resolve("slash").unwrap();
        assert_eq!(registry.get(slash).unwrap().logic, StyleLogic::Melee);
        let wisp = registry.resolve("wisp").unwrap();
        assert!(registry.get(wisp).unwrap().projectile.as_ref().unwrap().tracking);
        assert_eq!(registry.name(slash), "slash");
        assert_eq!(registry.len(), 6);
        for name in ["slash", "bite", "smash", "bolt", "arrow", "wisp"] {
            assert!(registry.resolve(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn test_unknown_style_fails_loudly() {
        let registry = StyleRegistry::builtin();
        assert!(matches!(registry.resolve("laser"), Err(SimError::UnknownStyle(name)) if name == "laser"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            { "name": "jab", "logic": "melee", "vfx": "poke" },
            { "name": "spit", "logic": "ranged", "projectile": { "tracking": true, "pierce": 1 } }
        ]"#;
        let registry = StyleRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 2);
        let spit = registry.get(registry.resolve("spit").unwrap()).unwrap();
        let projectile = spit.projectile.as_ref().unwrap();
        assert_eq!(projectile.pierce, 1);
        assert_eq!(projectile.speed, 18.0);
    }

    #[test]
    fn test_ranged_without_projectile_rejected() {
        let json = r#"[{ "name": "spit", "logic": "ranged" }]"#;
        assert!(matches!(StyleRegistry::from_json(json), Err(SimError::MissingProjectile(_))));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = StyleRegistry::builtin();
        assert!(matches!(
            registry.register(CombatStyle::melee("slash", "arc")),
            Err(SimError::DuplicateStyle(_))
        ));
    }
}
