use serde::{Deserialize, Serialize};

/// Named shortcut for a preset list of preferred genres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Relaxing,
    Action,
    Story,
    Strategy,
}

impl Mood {
    pub fn as_str(&self) -> &str {
        match self {
            Mood::Relaxing => "relaxing",
            Mood::Action => "action",
            Mood::Story => "story",
            Mood::Strategy => "strategy",
        }
    }

    pub fn genres(&self) -> &'static [&'static str] {
        match self {
            Mood::Relaxing => &["Casual", "Puzzle", "Simulation", "Indie"],
            Mood::Action => &["Action", "Shooter", "Fighting", "Platformer"],
            Mood::Story => &["Adventure", "RPG"],
            Mood::Strategy => &["Strategy", "Puzzle", "Board Games"],
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relaxing" => Ok(Mood::Relaxing),
            "action" => Ok(Mood::Action),
            "story" => Ok(Mood::Story),
            "strategy" => Ok(Mood::Strategy),
            _ => Err(format!("Unknown mood: {}", s)),
        }
    }
}

/// Preferred genres for a mood name; unknown moods mean no preference.
pub fn resolve_mood(name: &str) -> Vec<String> {
    match name.parse::<Mood>() {
        Ok(mood) => mood.genres().iter().map(|g| g.to_string()).collect(),
        Err(e) => {
            log::debug!("{}, ignoring", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_names_are_case_insensitive() {
        assert_eq!(" Relaxing ".parse::<Mood>(), Ok(Mood::Relaxing));
        assert_eq!("STORY".parse::<Mood>(), Ok(Mood::Story));
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        assert_eq!(resolve_mood("story"), vec!["Adventure", "RPG"]);
        assert!(resolve_mood("melancholic").is_empty());
    }
}
