// Gamification domain
pub mod badges;
pub mod challenge;
pub mod rewards;
pub mod streak;
