//! Per-lesson scoring

use serde::{Deserialize, Serialize};

use repit_common::AttendanceStatus;
use repit_persistence::LessonRecord;

/// Yes/no outcome checks for a single lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessIndicators {
    pub on_time_start: bool,
    pub full_duration: bool,
    pub high_engagement: bool,
    pub objectives_met: bool,
    pub positive_rating: bool,
    pub no_technical_issues: bool,
}

/// Derived quality metrics of a recorded lesson
pub trait LessonScoring {
    /// Mean of the tutor, student and parent ratings that were given
    fn overall_rating(&self) -> f64;

    /// Weighted lesson score in 0..=100
    fn performance_score(&self) -> f64;

    fn success_indicators(&self) -> SuccessIndicators;
}

fn given(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl LessonScoring for LessonRecord {
    fn overall_rating(&self) -> f64 {
        let ratings: Vec<f64> = [self.tutor_rating, self.student_rating, self.parent_rating]
            .into_iter()
            .filter_map(given)
            .collect();
        if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        }
    }

    fn performance_score(&self) -> f64 {
        let mut score = 0.0;

        // Attendance and punctuality, 20 points
        if self.attendance_status == AttendanceStatus::Present {
            score += 15.0;
            if given(self.punctuality_score).is_some_and(|p| p >= 4.0) {
                score += 5.0;
            }
        }

        // Duration, 15 points
        if self.duration_minutes > 0 && self.planned_duration > 0 {
            let ratio = (self.duration_minutes as f64 / self.planned_duration as f64).min(1.0);
            score += ratio * 15.0;
        }

        // Engagement, 25 points
        if let Some(engagement) = given(self.engagement_score) {
            score += engagement / 5.0 * 25.0;
        }

        // Plan completion, 20 points
        score += self.completion_rate * 20.0;

        // Ratings, 20 points
        let rating = self.overall_rating();
        if rating > 0.0 {
            score += rating / 5.0 * 20.0;
        }

        score
    }

    fn success_indicators(&self) -> SuccessIndicators {
        SuccessIndicators {
            on_time_start: given(self.punctuality_score).is_some_and(|p| p >= 4.0),
            full_duration: self.duration_minutes as f64 >= self.planned_duration as f64 * 0.9,
            high_engagement: given(self.engagement_score).is_some_and(|e| e >= 4.0),
            objectives_met: !self.learning_objectives_met.is_empty(),
            positive_rating: self.overall_rating() >= 4.0,
            no_technical_issues: self.technical_issues.is_empty(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use repit_common::{AttendanceStatus, LessonStatus};
    use repit_persistence::LessonRecord;

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    /// A strong completed lesson: full duration, ratings 5, engagement 5
    pub fn lesson(id: i64, date: DateTime<Utc>, subject: &str) -> LessonRecord {
        LessonRecord {
            id,
            lesson_id: id,
            tutor_id: 10,
            student_id: 20,
            date,
            subject: subject.to_string(),
            duration_minutes: 60,
            planned_duration: 60,
            status: LessonStatus::Completed,
            attendance_status: AttendanceStatus::Present,
            completion_rate: 1.0,
            tutor_rating: Some(5.0),
            student_rating: Some(5.0),
            parent_rating: None,
            difficulty_rating: Some(3.0),
            engagement_score: Some(5.0),
            punctuality_score: Some(5.0),
            student_questions: 3,
            was_rescheduled: false,
            technical_issues: Vec::new(),
            learning_objectives_met: vec!["fractions".to_string()],
            topics_covered: vec!["fractions".to_string()],
            homework_completion_previous: Some(true),
        }
    }
}
