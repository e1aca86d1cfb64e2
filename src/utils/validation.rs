use crate::error::RecommendError;
use crate::models::{FeedbackRequest, UserProfile};

/// Feedback writes are strict: reject malformed input rather than coerce it,
/// since stored garbage would feed straight back into training.
pub fn validate_feedback(request: &FeedbackRequest) -> Result<(), RecommendError> {
    if !request.rating.is_finite() {
        return Err(RecommendError::InvalidFeedback(
            "rating must be a number".to_string(),
        ));
    }

    if request.rating < 1.0 || request.rating > 5.0 {
        return Err(RecommendError::InvalidFeedback(format!(
            "rating must be between 1 and 5, got {}",
            request.rating
        )));
    }

    if request.activity_id <= 0 {
        return Err(RecommendError::InvalidFeedback(format!(
            "activity_id must be positive, got {}",
            request.activity_id
        )));
    }

    if let Some(user_id) = request.user_id {
        if user_id <= 0 {
            return Err(RecommendError::InvalidFeedback(format!(
                "user_id must be positive, got {user_id}"
            )));
        }
    }

    validate_profile(&request.profile())
}

pub fn validate_profile(profile: &UserProfile) -> Result<(), RecommendError> {
    let signals = [
        ("Stress_Level", profile.stress, 0.0, 10.0),
        ("Anxiety_Score", profile.anxiety, 0.0, 10.0),
        ("Depression_Score", profile.depression, 0.0, 10.0),
        ("Sleep_Hours", profile.sleep_hours, 0.0, 24.0),
        ("Steps_Per_Day", profile.steps_per_day, 0.0, f32::MAX),
    ];

    for (name, value, low, high) in signals {
        if !value.is_finite() {
            return Err(RecommendError::InvalidFeedback(format!(
                "{name} must be a finite number"
            )));
        }
        if value < low || value > high {
            return Err(RecommendError::InvalidFeedback(format!(
                "{name} out of range: {value}"
            )));
        }
    }

    Ok(())
}

pub fn validate_top_n(top_n: usize) -> Result<(), RecommendError> {
    if top_n == 0 {
        return Err(RecommendError::InvalidFeedback(
            "top_n must be greater than 0".to_string(),
        ));
    }
    if top_n > 100 {
        return Err(RecommendError::InvalidFeedback(format!(
            "top_n too large: {top_n} (max 100)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: f32) -> FeedbackRequest {
        FeedbackRequest {
            user_id: Some(1),
            activity_id: 2,
            rating,
            stress: Some(5.0),
            anxiety: Some(5.0),
            depression: Some(5.0),
            sleep_hours: Some(7.0),
            steps_per_day: Some(5000.0),
            mood_description: None,
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_feedback(&request(1.0)).is_ok());
        assert!(validate_feedback(&request(5.0)).is_ok());
        assert!(validate_feedback(&request(0.5)).is_err());
        assert!(validate_feedback(&request(5.5)).is_err());
        assert!(validate_feedback(&request(f32::NAN)).is_err());
    }

    #[test]
    fn test_profile_signal_ranges() {
        let mut req = request(4.0);
        req.stress = Some(11.0);
        assert!(validate_feedback(&req).is_err());

        let mut req = request(4.0);
        req.sleep_hours = Some(-1.0);
        assert!(validate_feedback(&req).is_err());
    }

    #[test]
    fn test_top_n_bounds() {
        assert!(validate_top_n(1).is_ok());
        assert!(validate_top_n(0).is_err());
        assert!(validate_top_n(500).is_err());
    }
}
