// Shared application state handed to every request handler

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use moka::future::Cache;
use tracing::{info, warn};

use repit_analytics::{AnalyticsService, ReportRenderer};
use repit_common::LeaderboardPeriod;
use repit_gamification::{
    AchievementService, ChallengeService, GamificationService, LeaderboardEntry, ProgressService,
    StudentService,
};
use repit_persistence::PersistenceService;

pub use super::config::Configuration;

/// Leaderboards keyed by period and limit
pub type LeaderboardCache = Cache<(LeaderboardPeriod, usize), Arc<Vec<LeaderboardEntry>>>;

const LEADERBOARD_CACHE_CAPACITY: u64 = 64;

pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn PersistenceService>,
    pub students: StudentService,
    pub achievements: AchievementService,
    pub gamification: Arc<GamificationService>,
    pub challenges: ChallengeService,
    pub progress: ProgressService,
    pub analytics: AnalyticsService,
    pub leaderboards: LeaderboardCache,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(configuration: Configuration, persistence: Arc<dyn PersistenceService>) -> Self {
        let curve = configuration.leveling_curve();
        let gamification = Arc::new(GamificationService::new(persistence.clone(), curve));

        let mut renderer = ReportRenderer::new();
        if let Some(path) = configuration.report_layout_path() {
            match std::fs::read_to_string(&path) {
                Ok(layout) => {
                    info!(path = %path, "Using custom report layout");
                    renderer = renderer.with_layout(layout);
                }
                Err(e) => warn!(path = %path, "Report layout unreadable, using default: {}", e),
            }
        }

        let leaderboards = Cache::builder()
            .max_capacity(LEADERBOARD_CACHE_CAPACITY)
            .time_to_live(configuration.leaderboard_cache_ttl())
            .build();

        Self {
            students: StudentService::new(persistence.clone(), curve),
            achievements: AchievementService::new(persistence.clone()),
            challenges: ChallengeService::new(persistence.clone(), gamification.clone()),
            progress: ProgressService::new(persistence.clone(), curve),
            analytics: AnalyticsService::new(persistence.clone()).with_renderer(renderer),
            gamification,
            leaderboards,
            persistence,
            configuration,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Insert the default achievement catalogue and badges where missing
    pub async fn seed_defaults(&self) -> anyhow::Result<()> {
        let achievements = self.achievements.initialize_default_achievements().await?;
        let badges = self.gamification.initialize_default_badges().await?;
        info!(achievements, badges, "Default gamification data seeded");
        Ok(())
    }

    /// Drop cached leaderboards after XP changes
    pub fn invalidate_leaderboards(&self) {
        self.leaderboards.invalidate_all();
    }
}
