use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurveyType {
    Farmshop,
    Experience,
}

impl SurveyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyType::Farmshop => "farmshop",
            SurveyType::Experience => "experience",
        }
    }
}

impl fmt::Display for SurveyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurveyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmshop" => Ok(SurveyType::Farmshop),
            "experience" => Ok(SurveyType::Experience),
            other => Err(CoreError::ValidationError(format!("unknown survey type '{}'", other))),
        }
    }
}

/// A survey response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub survey_type: SurveyType,
    pub rating: i32,
    pub experience: String,
    pub highlight: String,
    pub improvement: String,
    pub would_recommend: bool,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub survey_type: SurveyType,
    pub rating: i32,
    pub experience: String,
    pub highlight: String,
    pub improvement: String,
    pub would_recommend: bool,
    pub email: String,
}

impl NewFeedback {
    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(CoreError::ValidationError(format!(
                "rating must be between 1 and 5, got {}",
                self.rating
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_farmshop: i64,
    pub total_experience: i64,
    pub avg_farmshop: f64,
    pub avg_experience: f64,
}

impl FeedbackStats {
    pub fn from_feedback(feedback: &[Feedback]) -> Self {
        let summarize = |kind: SurveyType| {
            let ratings: Vec<i32> = feedback
                .iter()
                .filter(|f| f.survey_type == kind)
                .map(|f| f.rating)
                .collect();
            let avg = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().sum::<i32>() as f64 / ratings.len() as f64
            };
            (ratings.len() as i64, avg)
        };

        let (total_farmshop, avg_farmshop) = summarize(SurveyType::Farmshop);
        let (total_experience, avg_experience) = summarize(SurveyType::Experience);

        Self {
            total_farmshop,
            total_experience,
            avg_farmshop,
            avg_experience,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(survey_type: SurveyType, rating: i32) -> Feedback {
        Feedback {
            id: 0,
            survey_type,
            rating,
            experience: String::new(),
            highlight: String::new(),
            improvement: String::new(),
            would_recommend: true,
            email: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_stats_average_per_survey() {
        let stats = FeedbackStats::from_feedback(&[
            response(SurveyType::Farmshop, 5),
            response(SurveyType::Farmshop, 4),
            response(SurveyType::Experience, 3),
        ]);
        assert_eq!(stats.total_farmshop, 2);
        assert_eq!(stats.total_experience, 1);
        assert!((stats.avg_farmshop - 4.5).abs() < f64::EPSILON);
        assert!((stats.avg_experience - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rating_bounds() {
        let mut feedback = NewFeedback {
            survey_type: SurveyType::Experience,
            rating: 0,
            experience: "safari".to_string(),
            highlight: String::new(),
            improvement: String::new(),
            would_recommend: false,
            email: String::new(),
        };
        assert!(feedback.validate().is_err());
        feedback.rating = 5;
        assert!(feedback.validate().is_ok());
    }
}
