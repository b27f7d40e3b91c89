//! Exercise catalog types and the selection filter

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Muscle groups known to the workout API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Legs,
    Glutes,
    Abs,
    Calves,
    Cardio,
}

impl MuscleGroup {
    /// Key sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Abs => "abs",
            MuscleGroup::Calves => "calves",
            MuscleGroup::Cardio => "cardio",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Legs => "Legs",
            MuscleGroup::Glutes => "Glutes",
            MuscleGroup::Abs => "Abs",
            MuscleGroup::Calves => "Calves",
            MuscleGroup::Cardio => "Cardio",
        }
    }

    /// All muscle groups for iteration
    pub fn all() -> &'static [MuscleGroup] {
        &[
            MuscleGroup::Chest,
            MuscleGroup::Back,
            MuscleGroup::Shoulders,
            MuscleGroup::Biceps,
            MuscleGroup::Triceps,
            MuscleGroup::Legs,
            MuscleGroup::Glutes,
            MuscleGroup::Abs,
            MuscleGroup::Calves,
            MuscleGroup::Cardio,
        ]
    }
}

impl FromStr for MuscleGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        MuscleGroup::all()
            .iter()
            .copied()
            .find(|g| g.as_str() == key)
            .ok_or_else(|| ValidationError::UnknownMuscleGroup(s.to_string()))
    }
}

impl std::fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog exercise as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Payload for creating or updating a catalog exercise
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
    pub name: String,
    pub muscle_groups: Vec<MuscleGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl NewExercise {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().chars().count() < 3 {
            return Err(ValidationError::ExerciseNameTooShort);
        }
        if self.muscle_groups.is_empty() {
            return Err(ValidationError::NoMuscleGroups);
        }
        Ok(())
    }
}

/// Search term plus an optional muscle-group constraint.
///
/// Both parts are conjunctive. The search matches the exercise name or any
/// of its muscle groups as a case-insensitive substring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseFilter {
    pub search: String,
    pub muscle_group: Option<String>,
}

impl ExerciseFilter {
    pub fn new(search: impl Into<String>, muscle_group: Option<String>) -> Self {
        Self {
            search: search.into(),
            muscle_group,
        }
    }

    pub fn matches(&self, exercise: &Exercise) -> bool {
        let term = self.search.to_lowercase();
        if !term.is_empty() {
            let hit = exercise.name.to_lowercase().contains(&term)
                || exercise
                    .muscle_groups
                    .iter()
                    .any(|g| g.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        match &self.muscle_group {
            Some(group) if !group.is_empty() => exercise.muscle_groups.iter().any(|g| g == group),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, exercises: &'a [Exercise]) -> Vec<&'a Exercise> {
        exercises.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Distinct muscle groups present in a catalog, in first-seen order
pub fn muscle_groups_in(exercises: &[Exercise]) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for group in exercises.iter().flat_map(|e| e.muscle_groups.iter()) {
        if !groups.contains(group) {
            groups.push(group.clone());
        }
    }
    groups
}

/// Exercise ids picked by the user, kept in click order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id.to_string());
        }
    }

    /// Clears when the selection is as large as the filtered view, otherwise
    /// selects every exercise currently visible.
    pub fn toggle_all(&mut self, filtered: &[&Exercise]) {
        if self.ids.len() == filtered.len() {
            self.ids.clear();
        } else {
            self.ids = filtered.iter().map(|e| e.id.clone()).collect();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(id: &str, name: &str, groups: &[&str]) -> Exercise {
        Exercise {
            id: id.to_string(),
            name: name.to_string(),
            muscle_groups: groups.iter().map(|g| g.to_string()).collect(),
            equipment: None,
            instructions: None,
        }
    }

    fn catalog() -> Vec<Exercise> {
        vec![
            exercise("1", "Bench Press", &["chest"]),
            exercise("2", "Squat", &["legs"]),
        ]
    }

    fn names(filtered: &[&Exercise]) -> Vec<String> {
        filtered.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_search_matches_name_case_insensitive() {
        let exercises = catalog();
        let filter = ExerciseFilter::new("press", None);
        assert_eq!(names(&filter.apply(&exercises)), vec!["Bench Press"]);
    }

    #[test]
    fn test_muscle_group_constraint() {
        let exercises = catalog();
        let filter = ExerciseFilter::new("", Some("legs".to_string()));
        assert_eq!(names(&filter.apply(&exercises)), vec!["Squat"]);
    }

    #[test]
    fn test_search_and_group_are_conjunctive() {
        let exercises = catalog();
        let filter = ExerciseFilter::new("e", Some("legs".to_string()));
        assert_eq!(names(&filter.apply(&exercises)), vec!["Squat"]);
    }

    #[test]
    fn test_search_matches_muscle_group() {
        let exercises = catalog();
        let filter = ExerciseFilter::new("CHE", None);
        assert_eq!(names(&filter.apply(&exercises)), vec!["Bench Press"]);
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let exercises = catalog();
        assert_eq!(ExerciseFilter::default().apply(&exercises).len(), 2);
    }

    #[test]
    fn test_toggle_all_clears_full_selection() {
        let exercises = catalog();
        let filtered = ExerciseFilter::default().apply(&exercises);
        let mut selection = Selection::new();
        selection.toggle("1");
        selection.toggle("2");

        selection.toggle_all(&filtered);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_all_selects_filtered_view() {
        let exercises = catalog();
        let filtered = ExerciseFilter::default().apply(&exercises);
        let mut selection = Selection::new();

        selection.toggle_all(&filtered);
        assert_eq!(selection.ids(), &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_toggle_all_uses_current_view_not_catalog() {
        let exercises = catalog();
        let filtered = ExerciseFilter::new("squat", None).apply(&exercises);
        let mut selection = Selection::new();
        selection.toggle("1");

        // sizes are equal (1 == 1), so the selection is cleared
        selection.toggle_all(&filtered);
        assert!(selection.is_empty());

        selection.toggle_all(&filtered);
        assert_eq!(selection.ids(), &["2".to_string()]);
    }

    #[test]
    fn test_toggle_keeps_click_order() {
        let mut selection = Selection::new();
        selection.toggle("2");
        selection.toggle("1");
        assert_eq!(selection.ids(), &["2".to_string(), "1".to_string()]);
        selection.toggle("2");
        assert_eq!(selection.ids(), &["1".to_string()]);
    }

    #[test]
    fn test_muscle_group_parse() {
        assert_eq!("Chest".parse::<MuscleGroup>(), Ok(MuscleGroup::Chest));
        assert!("wings".parse::<MuscleGroup>().is_err());
    }

    #[test]
    fn test_muscle_groups_in_catalog() {
        let mut exercises = catalog();
        exercises.push(exercise("3", "Incline Press", &["chest", "shoulders"]));
        assert_eq!(muscle_groups_in(&exercises), vec!["chest", "legs", "shoulders"]);
    }

    #[test]
    fn test_new_exercise_validation() {
        let mut new = NewExercise {
            name: "Ro".to_string(),
            muscle_groups: vec![MuscleGroup::Back],
            equipment: None,
            instructions: None,
        };
        assert_eq!(new.validate(), Err(ValidationError::ExerciseNameTooShort));

        new.name = "Row".to_string();
        assert!(new.validate().is_ok());

        new.muscle_groups.clear();
        assert_eq!(new.validate(), Err(ValidationError::NoMuscleGroups));
    }
}
