use crate::models::{AmbianceCategory, Interaction, PreferenceVector};

/// Computes a user's preference vector from their interaction history
///
/// Each interaction is weighted by its action (view 1, share 3, try 5) times
/// its count. The vector is built as follows:
/// - `price` is the weight-averaged price tier of the places interacted with
/// - each ambiance field is the summed count of interactions whose place
///   carries that tag, divided by the total weight and capped at 1
///
/// Note the ambiance numerator uses raw counts while the denominator uses
/// weights, so heavier actions dilute ambiance scores. Stored vectors depend
/// on this scale.
///
/// When the total weight is zero (no history, or only unknown/zero-count
/// actions) the neutral vector is returned. Every field of the result lies
/// in `[0, 1]`.
pub fn compute_preference_vector(interactions: &[Interaction]) -> PreferenceVector {
    let mut total_weight = 0.0;
    let mut price_sum = 0.0;
    let mut tag_counts = [0.0; AmbianceCategory::ALL.len()];

    for interaction in interactions {
        let weight = interaction.weight();
        total_weight += weight;
        price_sum += interaction.price * weight;

        // An interaction counts once per category even if tagged twice
        let mut seen = [false; AmbianceCategory::ALL.len()];
        for category in interaction
            .ambiance
            .iter()
            .filter_map(|tag| AmbianceCategory::from_tag(tag))
        {
            seen[category.index()] = true;
        }

        let count = interaction.effective_count();
        for (slot, present) in tag_counts.iter_mut().zip(seen) {
            if present {
                *slot += count;
            }
        }
    }

    if total_weight <= 0.0 {
        return PreferenceVector::neutral();
    }

    let mut vector = PreferenceVector::zeroed();
    vector.price = price_sum / total_weight;
    for category in AmbianceCategory::ALL {
        *vector.ambiance_mut(category) = (tag_counts[category.index()] / total_weight).min(1.0);
    }

    vector.clamped()
}
