//! Level layout data
//!
//! A level is an ordered list of vine descriptors stored as JSON:
//!
//! ```json
//! [
//!   { "relative_anchor": [0.25, 0.92], "length": 12 },
//!   { "relative_anchor": [0.75, 0.92], "length": 12 }
//! ]
//! ```
//!
//! Anchors are fractions of the scene size. A missing or unreadable file gives
//! an empty (vine-less) level; malformed contents are a configuration error.

use std::io::ErrorKind;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_VINE_LENGTH;
use crate::error::{GameError, Result};
use crate::scene_point;

/// One vine in a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VineDescriptor {
    /// Anchor position, each axis in 0..=1 of the scene extent
    pub relative_anchor: Vec2,
    /// Segment count
    pub length: u32,
}

impl VineDescriptor {
    pub fn anchor_point(&self, scene_size: Vec2) -> Vec2 {
        scene_point(self.relative_anchor, scene_size)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelLayout {
    pub vines: Vec<VineDescriptor>,
}

impl LevelLayout {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(vines: Vec<VineDescriptor>) -> Result<Self> {
        let layout = Self { vines };
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Read a layout file. Absent or unreadable files yield an empty layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    log::warn!("Level layout {} not found, no vines", path.display());
                } else {
                    log::warn!("Level layout {} unreadable ({err}), no vines", path.display());
                }
                return Ok(Self::empty());
            }
        };
        let layout = Self::from_json(&json)?;
        log::info!(
            "Loaded level layout {} ({} vines)",
            path.display(),
            layout.vines.len()
        );
        Ok(layout)
    }

    pub fn is_empty(&self) -> bool {
        self.vines.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for (i, vine) in self.vines.iter().enumerate() {
            if vine.length == 0 {
                return Err(GameError::Configuration(format!(
                    "vine {i}: length must be positive"
                )));
            }
            if vine.length > MAX_VINE_LENGTH {
                return Err(GameError::Configuration(format!(
                    "vine {i}: length {} exceeds {MAX_VINE_LENGTH}",
                    vine.length
                )));
            }
            let a = vine.relative_anchor;
            let in_unit = |v: f32| (0.0..=1.0).contains(&v);
            if !in_unit(a.x) || !in_unit(a.y) {
                return Err(GameError::Configuration(format!(
                    "vine {i}: relative anchor {a:?} outside the scene"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout() {
        let layout = LevelLayout::from_json(
            r#"[
                { "relative_anchor": [0.25, 0.9], "length": 10 },
                { "relative_anchor": [0.75, 0.9], "length": 8 }
            ]"#,
        )
        .unwrap();
        assert_eq!(layout.vines.len(), 2);
        assert_eq!(layout.vines[1].length, 8);
        assert_eq!(
            layout.vines[0].anchor_point(Vec2::new(400.0, 600.0)),
            Vec2::new(100.0, 540.0)
        );
    }

    #[test]
    fn test_invalid_layouts() {
        for json in [
            r#"[{ "relative_anchor": [0.5, 0.9], "length": 0 }]"#,
            r#"[{ "relative_anchor": [0.5, 0.9], "length": -3 }]"#,
            r#"[{ "relative_anchor": [0.5, 0.9], "length": 4000000000 }]"#,
            r#"[{ "relative_anchor": [1.5, 0.9], "length": 4 }]"#,
            r#"[{ "length": 4 }]"#,
            r#"{ "vines": "nope" }"#,
        ] {
            assert!(
                matches!(LevelLayout::from_json(json), Err(GameError::Configuration(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_vine_length_limit() {
        let vine = |length| VineDescriptor {
            relative_anchor: Vec2::new(0.5, 0.9),
            length,
        };
        assert!(LevelLayout::new(vec![vine(MAX_VINE_LENGTH)]).is_ok());
        assert!(matches!(
            LevelLayout::new(vec![vine(MAX_VINE_LENGTH + 1)]),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_file_is_empty_level() {
        let layout = LevelLayout::load("/no/such/level.json").unwrap();
        assert!(layout.is_empty());
    }

    #[test]
    fn test_load_from_disk() {
        let path =
            std::env::temp_dir().join(format!("vine_cut_layout_{}.json", std::process::id()));
        std::fs::write(&path, r#"[{ "relative_anchor": [0.5, 1.0], "length": 3 }]"#).unwrap();
        let layout = LevelLayout::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(layout.vines.len(), 1);

        let bad = std::env::temp_dir().join(format!("vine_cut_bad_{}.json", std::process::id()));
        std::fs::write(&bad, "[{").unwrap();
        let result = LevelLayout::load(&bad);
        std::fs::remove_file(&bad).ok();
        assert!(matches!(result, Err(GameError::Configuration(_))));
    }
}
