//! Rendition tracking helpers
//!
//! Maps engine level lists into the public rendition list and validates
//! manual quality selections. The list is replaced wholesale on every
//! manifest parse; `id` is the engine's level index and stays stable for
//! the life of the manifest.

use crate::engine::EngineLevel;
use crate::error::{Error, Result};
use crate::types::Rendition;

/// Automatic rendition selection sentinel
pub const AUTO_LEVEL: i32 = -1;

/// Build the public rendition list from an engine level list
pub fn map_levels(levels: &[EngineLevel]) -> Vec<Rendition> {
    levels
        .iter()
        .enumerate()
        .map(|(index, level)| Rendition {
            id: index as i32,
            width: level.width,
            height: level.height,
            bitrate: level.bitrate,
            display_name: display_name(index, level),
        })
        .collect()
}

fn display_name(index: usize, level: &EngineLevel) -> String {
    if level.height > 0 {
        format!("{}p", level.height)
    } else {
        format!("Level {}", index + 1)
    }
}

/// Validate a manual quality selection against the current list
pub fn validate_selection(requested: i32, available: usize) -> Result<()> {
    if requested == AUTO_LEVEL {
        return Ok(());
    }
    if requested < 0 || requested as usize >= available {
        return Err(Error::RenditionOutOfRange {
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(width: u32, height: u32, bitrate: u64) -> EngineLevel {
        EngineLevel {
            width,
            height,
            bitrate,
        }
    }

    #[test]
    fn test_map_levels_display_names() {
        let levels = vec![
            level(1920, 1080, 5_000_000),
            level(1280, 720, 2_500_000),
            level(0, 0, 800_000),
        ];
        let renditions = map_levels(&levels);

        assert_eq!(renditions.len(), 3);
        assert_eq!(renditions[0].display_name, "1080p");
        assert_eq!(renditions[1].display_name, "720p");
        // No reported height falls back to the 1-based level number
        assert_eq!(renditions[2].display_name, "Level 3");
    }

    #[test]
    fn test_map_levels_ids_are_indices() {
        let levels = vec![level(640, 360, 500_000), level(1280, 720, 2_000_000)];
        let renditions = map_levels(&levels);
        assert_eq!(renditions[0].id, 0);
        assert_eq!(renditions[1].id, 1);
        assert_eq!(renditions[1].bitrate, 2_000_000);
    }

    #[test]
    fn test_validate_selection() {
        assert!(validate_selection(AUTO_LEVEL, 0).is_ok());
        assert!(validate_selection(AUTO_LEVEL, 3).is_ok());
        assert!(validate_selection(0, 3).is_ok());
        assert!(validate_selection(2, 3).is_ok());
        assert!(validate_selection(3, 3).is_err());
        assert!(validate_selection(-2, 3).is_err());
        assert!(validate_selection(0, 0).is_err());
    }
}
