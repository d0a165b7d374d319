use serde::{Deserialize, Serialize};
use std::fmt;

/// Which independent solid of a box build a plan or handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SolidRole {
    /// The card-holding body.
    Tray,
    /// The friction-fit cap.
    Lid,
    /// Loose divider plate. `index` is 1-based, back to front.
    Divider { index: usize },
}

impl SolidRole {
    /// Name used in exported file names ("tray", "lid", "divider_01").
    pub fn part_name(&self) -> String {
        match self {
            SolidRole::Tray => "tray".to_string(),
            SolidRole::Lid => "lid".to_string(),
            SolidRole::Divider { index } => format!("divider_{:02}", index),
        }
    }
}

impl fmt::Display for SolidRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.part_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_names_are_distinct() {
        let names: Vec<String> = [
            SolidRole::Tray,
            SolidRole::Lid,
            SolidRole::Divider { index: 1 },
            SolidRole::Divider { index: 12 },
        ]
        .iter()
        .map(SolidRole::part_name)
        .collect();
        assert_eq!(names, vec!["tray", "lid", "divider_01", "divider_12"]);
    }
}
