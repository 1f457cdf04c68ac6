use crate::domain::model::NeighborhoodType;

/// Pick the neighborhood label mentioned in a model answer.
///
/// Matching is a case-insensitive substring test against each label in
/// [`NeighborhoodType::ALL`] order; the first label found wins regardless of
/// where it appears in the text.
pub fn classify_label(text: &str) -> Option<NeighborhoodType> {
    let lowered = text.to_lowercase();
    NeighborhoodType::ALL
        .into_iter()
        .find(|label| lowered.contains(&label.name().to_lowercase()))
}
