mod common;

use common::{at, date, go_live, settings, user};
use commission_analytics::domain::gamification::badges::{BadgeEvaluator, BadgeHistory};
use commission_analytics::domain::gamification::challenge::{
    Challenge, ChallengeMetric, ChallengeProgressEngine, ChallengeStatus, ChallengeType, RewardType,
};
use commission_analytics::domain::gamification::rewards::RewardScorer;
use commission_analytics::domain::gamification::streak::{StreakAnchor, StreakPolicy};
use commission_analytics::domain::sales::{QuotaSettings, SalesEvent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn challenge(challenge_type: ChallengeType, metric: ChallengeMetric, target: Decimal) -> Challenge {
    Challenge {
        id: Uuid::from_u128(77),
        name: "June push".to_string(),
        icon: "🚀".to_string(),
        challenge_type,
        metric,
        target_value: target,
        start_date: date(6, 1),
        end_date: date(6, 30),
        reward_type: RewardType::Points,
        reward_value: dec!(100),
        is_active: true,
        streak_min_per_day: 1,
    }
}

/// `count` go-lives for user `u` on consecutive June days starting at `first_day`
fn june_go_lives(u: u128, first_day: u32, count: u32) -> Vec<SalesEvent> {
    (0..count)
        .map(|i| go_live(u, 6, first_day + i, dec!(100), Decimal::ZERO))
        .collect()
}

fn no_settings() -> Vec<QuotaSettings> {
    Vec::new()
}

#[test]
fn test_team_challenge_three_contributors() {
    let events: Vec<SalesEvent> =
        [june_go_lives(1, 1, 3), june_go_lives(2, 5, 4), june_go_lives(3, 10, 5)].concat();
    let team = challenge(ChallengeType::Team, ChallengeMetric::GoLives, dec!(10));

    let progress =
        ChallengeProgressEngine::default().evaluate(&team, &events, &no_settings(), at(6, 20, 12));

    assert_eq!(progress.current_value, dec!(12));
    assert_eq!(progress.progress_percent, dec!(120));
    assert!(progress.is_completed);
    assert_eq!(progress.status, ChallengeStatus::Completed);
    assert_eq!(progress.user_progress.values().copied().sum::<Decimal>(), dec!(12));
    assert_eq!(progress.leaderboard()[0].user_id, user(3));
    assert!(progress.completed_by(&user(1)));
}

#[test]
fn test_individual_challenge_uses_best_user() {
    let events: Vec<SalesEvent> = [june_go_lives(1, 1, 2), june_go_lives(2, 1, 6)].concat();
    let race = challenge(ChallengeType::Individual, ChallengeMetric::SubsArr, dec!(500));

    let progress =
        ChallengeProgressEngine::default().evaluate(&race, &events, &no_settings(), at(6, 15, 0));

    assert_eq!(progress.current_value, dec!(600));
    assert!(progress.is_completed);
    assert!(progress.completed_by(&user(2)));
    assert!(!progress.completed_by(&user(1)));
    assert_eq!(progress.days_remaining, 16);
}

#[test]
fn test_achievement_challenge_against_targets() {
    // 1000 a month in June, one month in the window
    let plans = vec![settings(1, dec!(1000)), settings(2, dec!(1000))];
    let events: Vec<SalesEvent> = [june_go_lives(1, 1, 8), june_go_lives(2, 1, 4)].concat();
    let team = challenge(ChallengeType::Team, ChallengeMetric::Achievement, dec!(100));

    let progress =
        ChallengeProgressEngine::default().evaluate(&team, &events, &plans, at(6, 15, 0));

    // 1200 of a pooled 2000
    assert_eq!(progress.current_value, dec!(60));
    assert!(!progress.is_completed);
    assert_eq!(progress.status, ChallengeStatus::Active);
}

#[test]
fn test_frozen_challenge_is_idempotent() {
    let events: Vec<SalesEvent> = [june_go_lives(1, 3, 4), june_go_lives(2, 20, 2)].concat();
    let streak = challenge(ChallengeType::Streak, ChallengeMetric::DailyGoLive, dec!(5));
    let engine = ChallengeProgressEngine::default();

    let first = engine.evaluate(&streak, &events, &no_settings(), at(7, 2, 0));
    let again = engine.evaluate(&streak, &events, &no_settings(), at(7, 2, 0));
    let later = engine.evaluate(&streak, &events, &no_settings(), at(9, 30, 0));

    assert_eq!(first, again);
    assert_eq!(first, later);
    assert_eq!(first.status, ChallengeStatus::Expired);
    assert_eq!(first.days_remaining, 0);
}

#[test]
fn test_streak_challenge_window_stops_at_as_of() {
    let events = june_go_lives(1, 1, 6);
    let streak = challenge(ChallengeType::Streak, ChallengeMetric::DailyGoLive, dec!(5));

    let lenient =
        ChallengeProgressEngine::default().evaluate(&streak, &events, &no_settings(), at(6, 8, 12));
    let strict = ChallengeProgressEngine::new(StreakPolicy {
        anchor: StreakAnchor::EvaluationDay,
    })
    .evaluate(&streak, &events, &no_settings(), at(6, 8, 12));

    let lenient_streak = lenient.streak.unwrap();
    assert_eq!(lenient_streak.day_flags.len(), 8);
    assert_eq!(lenient_streak.best_streak, 6);
    assert_eq!(lenient_streak.current_streak, 6);
    assert!(lenient.is_completed);

    let strict_streak = strict.streak.unwrap();
    assert_eq!(strict_streak.current_streak, 0);
    assert_eq!(strict_streak.best_streak, 6);
}

#[test]
fn test_badges_feed_reward_level() {
    let events: Vec<SalesEvent> = (1..=10)
        .map(|day| go_live(1, 3, day, dec!(100), Decimal::ZERO))
        .collect();

    let badges = BadgeEvaluator::default().evaluate(&BadgeHistory {
        events: &events,
        summaries: &[],
        completed_challenges: 0,
    });
    let ids: Vec<&str> = badges.iter().map(|b| b.badge_id.as_str()).collect();
    assert_eq!(ids, vec!["first_go_live", "ten_go_lives", "on_fire"]);
    assert_eq!(badges[1].earned_on, Some(date(3, 10)));
    assert_eq!(badges[2].earned_on, Some(date(3, 5)));

    let scorer = RewardScorer::default();
    let totals = scorer.calculate_points(user(1), &events, &badges, &[]);
    assert_eq!(totals.breakdown.go_lives, 100);
    assert_eq!(totals.breakdown.badges, 85);
    assert_eq!(totals.total, 185);

    let level = scorer.reward_level(totals.total);
    assert_eq!(level.current.name, "Rising Star");
    assert_eq!(level.points_to_next, 115);
    assert_eq!(level.progress_percent, dec!(42.5));
}
