// Lesson statistics
// Pure aggregations over lesson records; the service layer loads the records

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};

use repit_common::{AttendanceStatus, LessonStatus};
use repit_persistence::LessonRecord;

use crate::model::{
    AreaPerformance, CurriculumEffectiveness, DifficultyAnalysis, DifficultyFit, EngagementPoint,
    LessonSummary, LessonTrends, MonthlyTutorTrend, PeakHours, RetentionIndicators,
    SkillImprovement, StudentProgress, SubjectCount, SubjectPerformance, TrendPeriod, TrendPoint,
    TutorPerformance,
};
use crate::scoring::LessonScoring;

const TOP_SUBJECTS: usize = 10;
const BEST_SUBJECTS: usize = 5;
const WEAK_AREA_BELOW: f64 = 70.0;
const STRONG_AREA_FROM: f64 = 85.0;
/// Objectives a lesson is expected to cover
const OBJECTIVES_PER_LESSON: usize = 3;
const LOW_TOPIC_ENGAGEMENT: f64 = 3.0;
const FLAGGED_TOPICS: usize = 3;

// ============================================================================
// Numeric helpers
// ============================================================================

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the values, `None` when there are none
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of the recorded, non-zero values
pub fn mean_given(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    mean(values.into_iter().flatten().filter(|v| *v != 0.0))
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values.iter().copied()) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Least-squares slope of `values` against their index
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den == 0.0 { 0.0 } else { num / den }
}

/// Percentage of lessons satisfying `pred`
fn rate(lessons: &[LessonRecord], pred: impl Fn(&LessonRecord) -> bool) -> f64 {
    if lessons.is_empty() {
        return 0.0;
    }
    lessons.iter().filter(|l| pred(l)).count() as f64 / lessons.len() as f64 * 100.0
}

pub fn attendance_rate(lessons: &[LessonRecord]) -> f64 {
    rate(lessons, |l| l.attendance_status == AttendanceStatus::Present)
}

fn month_key(lesson: &LessonRecord) -> String {
    TrendPeriod::Month.key(lesson.date)
}

/// Lessons grouped by non-empty subject
fn by_subject(lessons: &[LessonRecord]) -> BTreeMap<&str, Vec<&LessonRecord>> {
    let mut groups: BTreeMap<&str, Vec<&LessonRecord>> = BTreeMap::new();
    for lesson in lessons.iter().filter(|l| !l.subject.is_empty()) {
        groups.entry(lesson.subject.as_str()).or_default().push(lesson);
    }
    groups
}

// ============================================================================
// Summary
// ============================================================================

pub fn lesson_summary(lessons: &[LessonRecord]) -> LessonSummary {
    if lessons.is_empty() {
        return LessonSummary::default();
    }
    let status_count = |status: LessonStatus| lessons.iter().filter(|l| l.status == status).count();

    LessonSummary {
        total_lessons: lessons.len(),
        completed_lessons: status_count(LessonStatus::Completed),
        cancelled_lessons: status_count(LessonStatus::Cancelled),
        missed_lessons: status_count(LessonStatus::Missed),
        average_duration: round2(
            mean_given(lessons.iter().map(|l| Some(l.duration_minutes as f64))).unwrap_or(0.0),
        ),
        average_completion_rate: round2(
            mean_given(lessons.iter().map(|l| Some(l.completion_rate))).unwrap_or(0.0),
        ),
        average_engagement: round2(
            mean_given(lessons.iter().map(|l| l.engagement_score)).unwrap_or(0.0),
        ),
        total_study_time: lessons.iter().map(|l| l.duration_minutes.max(0)).sum(),
        attendance_rate: round2(attendance_rate(lessons)),
        punctuality_score: round2(
            mean_given(lessons.iter().map(|l| l.punctuality_score)).unwrap_or(0.0),
        ),
        satisfaction_score: round2(
            mean_given(lessons.iter().map(|l| Some(l.overall_rating()))).unwrap_or(0.0),
        ),
        top_subjects: top_subjects(lessons),
        performance_trend: performance_trend(lessons),
        peak_learning_hours: peak_learning_hours(lessons),
    }
}

fn top_subjects(lessons: &[LessonRecord]) -> Vec<SubjectCount> {
    let mut subjects: Vec<SubjectCount> = by_subject(lessons)
        .into_iter()
        .map(|(subject, group)| SubjectCount {
            subject: subject.to_string(),
            count: group.len(),
            avg_rating: round2(
                mean_given(group.iter().map(|l| Some(l.overall_rating()))).unwrap_or(0.0),
            ),
        })
        .collect();
    // Stable sort keeps subjects with equal counts alphabetical
    subjects.sort_by(|a, b| b.count.cmp(&a.count));
    subjects.truncate(TOP_SUBJECTS);
    subjects
}

fn performance_trend(lessons: &[LessonRecord]) -> Vec<TrendPoint> {
    let mut months: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for lesson in lessons {
        months
            .entry(month_key(lesson))
            .or_default()
            .push(lesson.performance_score());
    }
    months
        .into_iter()
        .map(|(period, scores)| TrendPoint {
            average_performance: round2(mean(scores.iter().copied()).unwrap_or(0.0)),
            lesson_count: scores.len(),
            period,
        })
        .collect()
}

fn peak_learning_hours(lessons: &[LessonRecord]) -> Option<PeakHours> {
    let mut hourly_distribution: BTreeMap<u32, usize> = BTreeMap::new();
    for lesson in lessons {
        *hourly_distribution.entry(lesson.date.hour()).or_default() += 1;
    }

    // Earliest hour wins a tie
    let (peak_hour, lessons_at_peak) = hourly_distribution
        .iter()
        .fold(None, |best: Option<(u32, usize)>, (&hour, &count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((hour, count)),
        })?;

    Some(PeakHours {
        peak_hour,
        lessons_at_peak,
        hourly_distribution,
    })
}

// ============================================================================
// Tutor performance
// ============================================================================

pub fn tutor_performance(tutor_id: i64, lessons: &[LessonRecord]) -> Option<TutorPerformance> {
    if lessons.is_empty() {
        return None;
    }

    let unique_students: HashSet<i64> = lessons.iter().map(|l| l.student_id).collect();
    let subjects_taught: BTreeSet<String> = lessons
        .iter()
        .filter(|l| !l.subject.is_empty())
        .map(|l| l.subject.clone())
        .collect();

    Some(TutorPerformance {
        tutor_id,
        total_lessons: lessons.len(),
        unique_students: unique_students.len(),
        average_student_rating: round2(
            mean_given(lessons.iter().map(|l| l.student_rating)).unwrap_or(0.0),
        ),
        average_parent_rating: round2(
            mean_given(lessons.iter().map(|l| l.parent_rating)).unwrap_or(0.0),
        ),
        lesson_completion_rate: round2(rate(lessons, |l| l.status == LessonStatus::Completed)),
        average_engagement_score: round2(
            mean_given(lessons.iter().map(|l| l.engagement_score)).unwrap_or(0.0),
        ),
        punctuality_score: round2(
            mean_given(lessons.iter().map(|l| l.punctuality_score)).unwrap_or(0.0),
        ),
        technical_issues_rate: round2(rate(lessons, |l| !l.technical_issues.is_empty())),
        student_questions_average: round2(
            mean(lessons.iter().map(|l| l.student_questions as f64)).unwrap_or(0.0),
        ),
        rescheduling_rate: round2(rate(lessons, |l| l.was_rescheduled)),
        subjects_taught: subjects_taught.into_iter().collect(),
        best_performing_subjects: best_subjects(lessons),
        improvement_areas: improvement_areas(lessons),
        monthly_trend: tutor_monthly_trend(lessons),
    })
}

fn best_subjects(lessons: &[LessonRecord]) -> Vec<SubjectPerformance> {
    let mut subjects: Vec<SubjectPerformance> = by_subject(lessons)
        .into_iter()
        .map(|(subject, group)| {
            let avg_rating = mean_given(group.iter().map(|l| l.student_rating)).unwrap_or(0.0);
            let avg_engagement =
                mean_given(group.iter().map(|l| l.engagement_score)).unwrap_or(0.0);
            let avg_completion =
                mean_given(group.iter().map(|l| Some(l.completion_rate))).unwrap_or(0.0);
            SubjectPerformance {
                subject: subject.to_string(),
                overall_score: round2(avg_rating * 0.4 + avg_engagement * 0.4 + avg_completion * 0.2),
                avg_rating: round2(avg_rating),
                avg_engagement: round2(avg_engagement),
                avg_completion: round2(avg_completion),
                lesson_count: group.len(),
            }
        })
        .collect();
    subjects.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    subjects.truncate(BEST_SUBJECTS);
    subjects
}

/// Areas flagged when their average falls on the wrong side of a threshold;
/// metrics with no recorded values are not flagged
fn improvement_areas(lessons: &[LessonRecord]) -> Vec<String> {
    let punctuality = mean_given(lessons.iter().map(|l| l.punctuality_score));
    let engagement = mean_given(lessons.iter().map(|l| l.engagement_score));
    let rating = mean_given(lessons.iter().map(|l| l.student_rating));
    let technical = rate(lessons, |l| !l.technical_issues.is_empty());
    let rescheduled = rate(lessons, |l| l.was_rescheduled);

    [
        (punctuality.is_some_and(|v| v < 4.0), "punctuality"),
        (engagement.is_some_and(|v| v < 3.5), "student_engagement"),
        (rating.is_some_and(|v| v < 4.0), "lesson_quality"),
        (technical > 20.0, "technical_preparation"),
        (rescheduled > 15.0, "schedule_reliability"),
    ]
    .into_iter()
    .filter(|(flagged, _)| *flagged)
    .map(|(_, area)| area.to_string())
    .collect()
}

fn tutor_monthly_trend(lessons: &[LessonRecord]) -> Vec<MonthlyTutorTrend> {
    let mut months: BTreeMap<String, Vec<&LessonRecord>> = BTreeMap::new();
    for lesson in lessons {
        months.entry(month_key(lesson)).or_default().push(lesson);
    }
    months
        .into_iter()
        .map(|(month, group)| MonthlyTutorTrend {
            lesson_count: group.len(),
            avg_rating: round2(mean_given(group.iter().map(|l| l.student_rating)).unwrap_or(0.0)),
            avg_engagement: round2(
                mean_given(group.iter().map(|l| l.engagement_score)).unwrap_or(0.0),
            ),
            month,
        })
        .collect()
}

// ============================================================================
// Student progress
// ============================================================================

/// Progress over lessons ordered by date
pub fn student_progress(
    student_id: i64,
    subject: Option<&str>,
    lessons: &[LessonRecord],
) -> Option<StudentProgress> {
    if lessons.is_empty() {
        return None;
    }

    let mut ordered: Vec<&LessonRecord> = lessons.iter().collect();
    ordered.sort_by_key(|l| l.date);
    let scores: Vec<f64> = ordered.iter().map(|l| l.performance_score()).collect();

    let consistency = consistency_score(&scores);
    let attendance = attendance_rate(lessons);
    let (weak_areas, strong_areas) = subject_areas(lessons);
    let avg_engagement = mean_given(lessons.iter().map(|l| l.engagement_score));

    Some(StudentProgress {
        student_id,
        subject: subject.map(str::to_string),
        total_lessons: lessons.len(),
        attendance_rate: round2(attendance),
        average_performance: round2(mean(scores.iter().copied()).unwrap_or(0.0)),
        learning_velocity: round2(linear_slope(&scores)),
        consistency_score: round2(consistency),
        engagement_trend: ordered
            .iter()
            .map(|l| EngagementPoint {
                date: l.date,
                engagement_score: l.engagement_score.unwrap_or(0.0),
                questions_asked: l.student_questions,
            })
            .collect(),
        recommended_focus: recommendations(&weak_areas, consistency, attendance, avg_engagement),
        weak_areas,
        strong_areas,
        skill_improvements: skill_improvements(&ordered),
    })
}

/// `100 - coefficient of variation`, floored at 0
pub fn consistency_score(scores: &[f64]) -> f64 {
    match mean(scores.iter().copied()) {
        Some(m) if m > 0.0 => (100.0 - std_dev(scores) / m * 100.0).max(0.0),
        _ => 0.0,
    }
}

fn subject_areas(lessons: &[LessonRecord]) -> (Vec<AreaPerformance>, Vec<AreaPerformance>) {
    let mut weak = Vec::new();
    let mut strong = Vec::new();
    for (subject, group) in by_subject(lessons) {
        let avg = mean(group.iter().map(|l| l.performance_score())).unwrap_or(0.0);
        let area = AreaPerformance {
            area: subject.to_string(),
            avg_performance: round2(avg),
            lesson_count: group.len(),
        };
        if avg < WEAK_AREA_BELOW {
            weak.push(area);
        } else if avg >= STRONG_AREA_FROM {
            strong.push(area);
        }
    }
    weak.sort_by(|a, b| a.avg_performance.total_cmp(&b.avg_performance));
    (weak, strong)
}

fn recommendations(
    weak_areas: &[AreaPerformance],
    consistency: f64,
    attendance: f64,
    avg_engagement: Option<f64>,
) -> Vec<String> {
    let mut focus = Vec::new();
    if let Some(weakest) = weak_areas.first() {
        focus.push(format!(
            "Focus on improving {} - consider additional practice",
            weakest.area
        ));
    }
    if consistency < 70.0 {
        focus.push("Work on maintaining consistent performance across lessons".to_string());
    }
    if attendance < 90.0 {
        focus.push("Improve attendance rate to maximize learning opportunities".to_string());
    }
    if avg_engagement.is_some_and(|e| e < 4.0) {
        focus.push("Increase engagement through interactive activities and questions".to_string());
    }
    focus
}

fn skill_improvements(ordered: &[&LessonRecord]) -> BTreeMap<String, SkillImprovement> {
    let mut dates: BTreeMap<String, Vec<DateTime<Utc>>> = BTreeMap::new();
    for lesson in ordered {
        for objective in &lesson.learning_objectives_met {
            dates.entry(objective.clone()).or_default().push(lesson.date);
        }
    }

    dates
        .into_iter()
        .map(|(objective, dates)| {
            let gaps = dates.windows(2).map(|w| (w[1] - w[0]).num_days() as f64);
            let improvement = SkillImprovement {
                count: dates.len(),
                avg_days_between: mean(gaps).map(round2),
            };
            (objective, improvement)
        })
        .collect()
}

// ============================================================================
// Curriculum effectiveness
// ============================================================================

pub fn curriculum_effectiveness(
    subject: Option<&str>,
    lessons: &[LessonRecord],
) -> Option<CurriculumEffectiveness> {
    if lessons.is_empty() {
        return None;
    }

    let engagement_by_topic = topic_engagement(lessons);
    Some(CurriculumEffectiveness {
        subject: subject.map(str::to_string),
        total_lessons_analyzed: lessons.len(),
        average_completion_rate: round2(
            mean_given(lessons.iter().map(|l| Some(l.completion_rate))).unwrap_or(0.0),
        ),
        learning_objective_success_rate: round2(objective_success_rate(lessons)),
        student_satisfaction: round2(
            mean_given(lessons.iter().map(|l| l.student_rating)).unwrap_or(0.0),
        ),
        difficulty_appropriateness: difficulty_analysis(lessons),
        retention_indicators: retention_indicators(lessons),
        improvement_recommendations: curriculum_recommendations(lessons, &engagement_by_topic),
        engagement_by_topic,
    })
}

/// Met objectives against the expected count per lesson, capped at 100
fn objective_success_rate(lessons: &[LessonRecord]) -> f64 {
    let expected = lessons.len() * OBJECTIVES_PER_LESSON;
    let met: usize = lessons.iter().map(|l| l.learning_objectives_met.len()).sum();
    (met as f64 / expected as f64 * 100.0).min(100.0)
}

fn difficulty_analysis(lessons: &[LessonRecord]) -> Option<DifficultyAnalysis> {
    let ratings: Vec<f64> = lessons
        .iter()
        .filter_map(|l| l.difficulty_rating)
        .filter(|r| *r != 0.0)
        .collect();
    let average = mean(ratings.iter().copied())?;

    let mut distribution = BTreeMap::new();
    for rating in &ratings {
        *distribution.entry(DifficultyFit::of(*rating)).or_insert(0) += 1;
    }
    let appropriate = distribution
        .get(&DifficultyFit::Appropriate)
        .copied()
        .unwrap_or(0);

    let recommendation = if average < 2.5 {
        "Consider increasing difficulty level"
    } else if average > 3.5 {
        "Consider reducing difficulty level"
    } else if (appropriate as f64) < ratings.len() as f64 * 0.6 {
        "Review and adjust difficulty for individual lessons"
    } else {
        "Difficulty level is well-balanced"
    };

    Some(DifficultyAnalysis {
        average_difficulty: round2(average),
        distribution,
        recommendation: recommendation.to_string(),
    })
}

/// Mean engagement of the lessons covering each topic
fn topic_engagement(lessons: &[LessonRecord]) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for lesson in lessons {
        let Some(engagement) = lesson.engagement_score.filter(|e| *e != 0.0) else {
            continue;
        };
        for topic in &lesson.topics_covered {
            scores.entry(topic.as_str()).or_default().push(engagement);
        }
    }
    scores
        .into_iter()
        .filter_map(|(topic, values)| mean(values).map(|m| (topic.to_string(), round2(m))))
        .collect()
}

fn retention_indicators(lessons: &[LessonRecord]) -> RetentionIndicators {
    let tracked: Vec<bool> = lessons
        .iter()
        .filter_map(|l| l.homework_completion_previous)
        .collect();
    let done = tracked.iter().filter(|d| **d).count();

    let mut coverage: BTreeMap<String, usize> = BTreeMap::new();
    for lesson in lessons {
        let topics: BTreeSet<&String> = lesson.topics_covered.iter().collect();
        for topic in topics {
            *coverage.entry(topic.clone()).or_insert(0) += 1;
        }
    }
    coverage.retain(|_, count| *count > 1);

    RetentionIndicators {
        homework_completion_rate: if tracked.is_empty() {
            0.0
        } else {
            round2(done as f64 / tracked.len() as f64 * 100.0)
        },
        homework_tracked_lessons: tracked.len(),
        revisited_topics: coverage,
    }
}

fn curriculum_recommendations(
    lessons: &[LessonRecord],
    engagement_by_topic: &BTreeMap<String, f64>,
) -> Vec<String> {
    let completion = mean_given(lessons.iter().map(|l| Some(l.completion_rate)));
    let engagement = mean_given(lessons.iter().map(|l| l.engagement_score));
    let rating = mean_given(lessons.iter().map(|l| Some(l.overall_rating())));

    let mut recommendations = Vec::new();
    if completion.is_none_or(|c| c < 0.8) {
        recommendations
            .push("Review lesson pacing - completion rates are below optimal".to_string());
    }
    if engagement.is_some_and(|e| e < 3.5) {
        recommendations
            .push("Incorporate more interactive elements to boost engagement".to_string());
    }
    if rating.is_some_and(|r| r < 4.0) {
        recommendations.push("Review lesson content quality and teaching methods".to_string());
    }

    let low: Vec<&str> = engagement_by_topic
        .iter()
        .filter(|(_, score)| **score < LOW_TOPIC_ENGAGEMENT)
        .map(|(topic, _)| topic.as_str())
        .take(FLAGGED_TOPICS)
        .collect();
    if !low.is_empty() {
        recommendations.push(format!(
            "Review content for topics with low engagement: {}",
            low.join(", ")
        ));
    }
    recommendations
}

// ============================================================================
// Trends
// ============================================================================

pub fn lesson_trends(period: TrendPeriod, lessons: &[LessonRecord]) -> LessonTrends {
    let mut buckets: BTreeMap<String, Vec<&LessonRecord>> = BTreeMap::new();
    let mut weekdays: BTreeMap<u32, (String, usize)> = BTreeMap::new();
    for lesson in lessons {
        buckets.entry(period.key(lesson.date)).or_default().push(lesson);
        let weekday = lesson.date.weekday();
        weekdays
            .entry(weekday.num_days_from_monday())
            .or_insert_with(|| (weekday.to_string(), 0))
            .1 += 1;
    }

    let lessons_per_period: BTreeMap<String, usize> =
        buckets.iter().map(|(k, v)| (k.clone(), v.len())).collect();

    let completion_rate_trend = buckets
        .iter()
        .map(|(k, group)| {
            let completed = group
                .iter()
                .filter(|l| l.status == LessonStatus::Completed)
                .count();
            (k.clone(), round2(completed as f64 / group.len() as f64 * 100.0))
        })
        .collect();

    let engagement_trend = buckets
        .iter()
        .filter_map(|(k, group)| {
            mean_given(group.iter().map(|l| l.engagement_score)).map(|e| (k.clone(), round2(e)))
        })
        .collect();

    let growth_rate = match (
        lessons_per_period.values().next(),
        lessons_per_period.values().next_back(),
    ) {
        (Some(&first), Some(&last)) if lessons_per_period.len() > 1 && first > 0 => {
            round2((last as f64 - first as f64) / first as f64 * 100.0)
        }
        _ => 0.0,
    };

    // Monday first on ties
    let most_active_weekday = weekdays
        .into_values()
        .fold(None, |best: Option<(String, usize)>, (day, count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((day, count)),
        })
        .map(|(day, _)| day);

    LessonTrends {
        period_type: period,
        total_periods: lessons_per_period.len(),
        lessons_per_period,
        completion_rate_trend,
        engagement_trend,
        growth_rate,
        most_active_weekday,
    }
}
