pub mod collaps;
pub mod rezka;
pub mod videohub;

use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Rezka,
    Collaps,
    VideoHub,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rezka => "rezka",
            SourceType::Collaps => "collaps",
            SourceType::VideoHub => "videohub",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rezka" => Ok(SourceType::Rezka),
            "collaps" => Ok(SourceType::Collaps),
            "videohub" => Ok(SourceType::VideoHub),
            _ => Err(format!("Invalid source type: {s}")),
        }
    }
}

impl Hash for SourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
    }
}
